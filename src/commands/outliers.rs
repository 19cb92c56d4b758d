use crate::config::Config;
use crate::red::classify::{classify, rank_statistics_table, taxa_median_table};
use crate::red::{
    apply_consensus, median_red_over_phyla, rel_dist_to_named_clades, rescale_to_deltas,
    ConsensusOptions, ScaleMode, Warning,
};
use crate::taxonomy::filter::{read_fmeasure, read_taxa_file, taxa_for_dist_inference, FilterOptions};
use crate::taxonomy::{phyla_lineages, Taxonomy};
use crate::tree::newick;
use crate::report;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub struct OutlierOptions {
    pub tree_file: String,
    pub taxonomy_file: String,
    pub output_dir: String,
    pub trusted_taxa: Option<String>,
    pub min_children: usize,
    pub min_support: f64,
    pub fmeasure_table: Option<String>,
    pub min_fmeasure: f64,
    pub fixed_root: bool,
    pub mblet: bool,
    pub verbose_table: bool,
    pub seed: Option<u64>,
}

pub fn run(options: OutlierOptions) -> Result<()> {
    let config = Config::load();

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );

    progress.set_message("Reading tree...");
    let mut tree = newick::read_tree(&options.tree_file)
        .with_context(|| format!("failed to read tree {}", options.tree_file))?;

    progress.set_message("Reading taxonomy...");
    let taxonomy = Taxonomy::read(&options.taxonomy_file)?;
    let parent_lineages = taxonomy.parents();

    let trusted = options
        .trusted_taxa
        .as_ref()
        .map(read_taxa_file)
        .transpose()?;
    let fmeasure = options
        .fmeasure_table
        .as_ref()
        .map(read_fmeasure)
        .transpose()?;

    let inference_taxa = taxa_for_dist_inference(
        &tree,
        &taxonomy,
        trusted.as_ref(),
        fmeasure.as_ref(),
        &FilterOptions {
            min_children: options.min_children,
            min_support: options.min_support,
            min_fmeasure: options.min_fmeasure,
        },
    );
    progress.finish_and_clear();

    let tree_name = Path::new(&options.tree_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tree".to_string());
    let output_dir = Path::new(&options.output_dir);

    let mut warnings: Vec<Warning> = Vec::new();

    if options.fixed_root || options.mblet {
        let mode = if options.mblet {
            ScaleMode::MeanBranchLength
        } else {
            ScaleMode::RelativeDivergence
        };
        println!("Using single fixed rooting for inferring distributions.");

        let distributions = rel_dist_to_named_clades(&mut tree, mode);
        let negative = rescale_to_deltas(&mut tree);
        if negative > 0 {
            warnings.push(Warning::NegativeScaledBranches { count: negative });
        }

        fs::create_dir_all(output_dir)?;

        let (statistics, rank_warnings) = rank_statistics_table(&distributions, &inference_taxa);
        warnings.extend(rank_warnings);
        report::write_rank_distribution(
            &distributions,
            &statistics,
            output_dir.join(format!("{}.rank_distribution.tsv", tree_name)),
        )?;

        let (records, _) = classify(&distributions, &inference_taxa, &parent_lineages);
        report::write_outlier_table(
            &records,
            output_dir.join(format!("{}.tsv", tree_name)),
            options.verbose_table,
        )?;
    } else {
        let all_phyla = phyla_lineages(&tree);
        println!("Identified {} phyla.", all_phyla.len());

        let phyla: Vec<String> = all_phyla
            .into_iter()
            .filter(|p| inference_taxa.contains(p))
            .collect();
        println!(
            "Using {} phyla as rootings for inferring distributions.",
            phyla.len()
        );

        let consensus_options = ConsensusOptions {
            max_reroot_attempts: config.max_reroot_attempts,
            threads: config.threads,
            seed: options.seed,
        };
        // fails before any output file is created; a consensus over too
        // few rootings is worse than none
        let consensus = median_red_over_phyla(&mut tree, &taxonomy, &phyla, &consensus_options)?;
        warnings.extend(consensus.warnings.iter().cloned());

        let negative = apply_consensus(&mut tree, &consensus.node_medians);
        if negative > 0 {
            warnings.push(Warning::NegativeScaledBranches { count: negative });
        }

        fs::create_dir_all(output_dir)?;

        // per-rooting tables and classifications
        for (phylum, distributions) in &consensus.phylum_tables {
            let phylum_dir = output_dir.join(phylum);
            fs::create_dir_all(&phylum_dir)?;

            let (statistics, _) = rank_statistics_table(distributions, &inference_taxa);
            report::write_rank_distribution(
                distributions,
                &statistics,
                phylum_dir.join(format!("{}.rank_distribution.tsv", phylum)),
            )?;

            let (records, _) = classify(distributions, &inference_taxa, &parent_lineages);
            report::write_outlier_table(
                &records,
                phylum_dir.join(format!("{}.median_outlier.tsv", phylum)),
                options.verbose_table,
            )?;
        }

        // consensus classification over the per-taxon medians
        let median_table = taxa_median_table(&consensus.phylum_tables);
        let (statistics, rank_warnings) = rank_statistics_table(&median_table, &inference_taxa);
        warnings.extend(rank_warnings);

        let rank_medians: BTreeMap<usize, f64> = statistics
            .iter()
            .map(|(&rank, s)| (rank, s.median))
            .collect();
        report::write_rank_medians(
            &rank_medians,
            output_dir.join(format!("{}.rank_medians.json", tree_name)),
        )?;

        let (records, _) = classify(&median_table, &inference_taxa, &parent_lineages);
        report::write_outlier_table(
            &records,
            output_dir.join(format!("{}.tsv", tree_name)),
            options.verbose_table,
        )?;
    }

    report::write_node_red(&tree, output_dir.join(format!("{}.node_rd.tsv", tree_name)))?;
    report::write_scaled_tree(&tree, output_dir.join(format!("{}.scaled.tree", tree_name)))?;

    for warning in &warnings {
        eprintln!("Warning: {}", warning);
    }
    println!("Results written to {}", output_dir.display());

    Ok(())
}
