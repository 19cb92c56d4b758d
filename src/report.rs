use crate::red::{ClassificationRecord, RankDistributions, RankStatistics};
use crate::taxonomy::rank_label;
use crate::tree::{newick, Tree};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Rank distribution table: one row per named clade with the rank's
/// percentile envelope and whether the clade falls outside it.
pub fn write_rank_distribution<P: AsRef<Path>>(
    distributions: &RankDistributions,
    statistics: &BTreeMap<usize, RankStatistics>,
    path: P,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "Taxa\tRelative Distance\tP10\tMedian\tP90\tPercentile outlier"
    )?;

    for (rank, taxa) in distributions {
        for (taxon, &red) in taxa {
            match statistics.get(rank) {
                Some(s) => {
                    let outlier = red < s.p10 || red > s.p90;
                    writeln!(
                        writer,
                        "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
                        taxon, red, s.p10, s.median, s.p90, outlier
                    )?;
                }
                None => {
                    writeln!(
                        writer,
                        "{}\t{:.2}\t-1\t-1\t-1\tinsufficient data to calculate percentiles",
                        taxon, red
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Outlier table: classification of every named clade against its
/// rank's median.
pub fn write_outlier_table<P: AsRef<Path>>(
    records: &[ClassificationRecord],
    path: P,
    verbose: bool,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    if verbose {
        writeln!(
            writer,
            "Taxa\tTaxonomy\tMedian distance\tMedian of rank\tMedian difference\tClosest rank\tClassification"
        )?;
    } else {
        writeln!(
            writer,
            "Taxa\tTaxonomy\tMedian distance\tMedian difference\tClosest rank\tClassification"
        )?;
    }

    for record in records {
        let delta = record
            .delta
            .map(|d| format!("{:.3}", d))
            .unwrap_or_else(|| "-1".to_string());
        let closest = record.closest_rank.unwrap_or("NA");
        if verbose {
            let rank_median = record
                .rank_median
                .map(|m| format!("{:.3}", m))
                .unwrap_or_else(|| "-1".to_string());
            writeln!(
                writer,
                "{}\t{}\t{:.2}\t{}\t{}\t{}\t{}",
                record.taxon,
                record.parent_lineage,
                record.red,
                rank_median,
                delta,
                closest,
                record.classification
            )?;
        } else {
            writeln!(
                writer,
                "{}\t{}\t{:.3}\t{}\t{}\t{}",
                record.taxon, record.parent_lineage, record.red, delta, closest, record.classification
            )?;
        }
    }
    Ok(())
}

/// Per-rank consensus medians as a JSON object keyed by rank label.
pub fn write_rank_medians<P: AsRef<Path>>(
    medians: &BTreeMap<usize, f64>,
    path: P,
) -> Result<()> {
    let labeled: BTreeMap<&str, f64> = medians
        .iter()
        .map(|(&rank, &median)| (rank_label(rank), median))
        .collect();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &labeled)?;
    writeln!(writer)?;
    Ok(())
}

/// Per-node divergence dump. Leaves are identified by their label,
/// internal nodes by the first and last leaf of their subtree.
pub fn write_node_red<P: AsRef<Path>>(tree: &Tree, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for id in tree.preorder() {
        let Some(red) = tree.node(id).rel_dist else {
            continue;
        };
        if tree.is_leaf(id) {
            writeln!(writer, "{}\t{:.6}", tree.label(id).unwrap_or(""), red)?;
        } else {
            let leaves: Vec<&str> = tree
                .leaves_under(id)
                .filter_map(|leaf| tree.label(leaf))
                .collect();
            let first = leaves.first().copied().unwrap_or("");
            let last = leaves.last().copied().unwrap_or("");
            writeln!(writer, "{}|{}\t{:.6}", first, last, red)?;
        }
    }
    Ok(())
}

/// Divergence-scaled tree in newick format.
pub fn write_scaled_tree<P: AsRef<Path>>(tree: &Tree, path: P) -> Result<()> {
    newick::write_tree(tree, path)
}
