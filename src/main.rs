use clap::Parser;
use reldiv::cli;
use reldiv::commands;

fn main() {
    let args = cli::Args::parse();

    let result = match args.command {
        cli::Commands::Outliers {
            tree_file,
            taxonomy_file,
            output_dir,
            trusted_taxa,
            min_children,
            min_support,
            fmeasure_table,
            min_fmeasure,
            fixed_root,
            mblet,
            verbose_table,
            seed,
        } => commands::outliers::run(commands::outliers::OutlierOptions {
            tree_file,
            taxonomy_file,
            output_dir,
            trusted_taxa,
            min_children,
            min_support,
            fmeasure_table,
            min_fmeasure,
            fixed_root,
            mblet,
            verbose_table,
            seed,
        }),
        cli::Commands::Scale {
            tree_file,
            output_tree,
            mblet,
        } => commands::scale::run(tree_file, output_tree, mblet),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
