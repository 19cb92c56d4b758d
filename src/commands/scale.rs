use crate::red::{decorate_rel_dist, rescale_to_deltas, ScaleMode};
use crate::tree::newick;
use anyhow::{Context, Result};

pub fn run(tree_file: String, output_tree: String, mblet: bool) -> Result<()> {
    let mut tree = newick::read_tree(&tree_file)
        .with_context(|| format!("failed to read tree {}", tree_file))?;

    let mode = if mblet {
        ScaleMode::MeanBranchLength
    } else {
        ScaleMode::RelativeDivergence
    };
    decorate_rel_dist(&mut tree, mode);
    let negative = rescale_to_deltas(&mut tree);
    if negative > 0 {
        eprintln!(
            "Warning: {} branches are negative after divergence scaling",
            negative
        );
    }

    newick::write_tree(&tree, &output_tree)?;
    println!("Scaled tree written to {}", output_tree);
    Ok(())
}
