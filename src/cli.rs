use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify taxa with outlying relative evolutionary divergence
    Outliers {
        /// Input tree in newick format with taxon-decorated nodes
        tree_file: String,
        /// Taxonomy file (leaf id, tab, semicolon-separated lineage)
        taxonomy_file: String,
        /// Output directory for tables, dumps and the scaled tree
        output_dir: String,

        /// File with trusted taxa to use for inferring distributions
        #[arg(long)]
        trusted_taxa: Option<String>,
        /// Minimum named children for a taxon to be trusted (default: 2)
        #[arg(long, default_value = "2")]
        min_children: usize,
        /// Minimum support for a taxon to be trusted (default: 0)
        #[arg(long, default_value = "0")]
        min_support: f64,
        /// Table with per-taxon F-measure scores
        #[arg(long)]
        fmeasure_table: Option<String>,
        /// Minimum F-measure for a taxon to be trusted (default: 0.95)
        #[arg(long, default_value = "0.95")]
        min_fmeasure: f64,

        /// Infer distributions over the current rooting instead of a
        /// consensus over all phylum-level rootings
        #[arg(long)]
        fixed_root: bool,
        /// Use mean branch length to extant taxa instead of relative
        /// divergence (implies a fixed rooting)
        #[arg(long)]
        mblet: bool,
        /// Report additional columns in the outlier table
        #[arg(long)]
        verbose_table: bool,
        /// Seed for the randomized rerooting (default: random)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rescale a tree's branch lengths to divergence deltas
    Scale {
        /// Input tree in newick format
        tree_file: String,
        /// Output file for the scaled tree
        output_tree: String,
        /// Use mean branch length to extant taxa instead of relative
        /// divergence
        #[arg(long)]
        mblet: bool,
    },
}
