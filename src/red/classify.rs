use super::stats;
use super::types::{
    Classification, ClassificationRecord, RankDistributions, RankStatistics, Warning,
};
use crate::error::RedError;
use crate::taxonomy::{rank_label, RANK_LABELS};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Distribution statistics for one rank. Fewer than two trusted taxa
/// cannot anchor a distribution.
pub fn rank_statistics(values: &[f64], rank: usize) -> Result<RankStatistics, RedError> {
    if values.len() < 2 {
        return Err(RedError::InsufficientRankData {
            rank: rank_label(rank).to_string(),
        });
    }
    Ok(RankStatistics {
        p10: stats::percentile(values, 10.0).expect("values are non-empty"),
        median: stats::median(values).expect("values are non-empty"),
        p90: stats::percentile(values, 90.0).expect("values are non-empty"),
        taxa: values.len(),
    })
}

/// Per-rank statistics over the trusted taxa of a distribution table.
/// Ranks without enough trusted taxa are excluded and reported as
/// warnings; other ranks are unaffected.
pub fn rank_statistics_table(
    distributions: &RankDistributions,
    trusted_taxa: &HashSet<String>,
) -> (BTreeMap<usize, RankStatistics>, Vec<Warning>) {
    let mut table = BTreeMap::new();
    let mut warnings = Vec::new();

    for (&rank, taxa) in distributions {
        let values: Vec<f64> = taxa
            .iter()
            .filter(|(taxon, _)| trusted_taxa.contains(*taxon))
            .map(|(_, &red)| red)
            .collect();
        match rank_statistics(&values, rank) {
            Ok(statistics) => {
                table.insert(rank, statistics);
            }
            Err(RedError::InsufficientRankData { .. }) => {
                warnings.push(Warning::InsufficientRankData {
                    rank: rank_label(rank),
                    taxa: values.len(),
                });
            }
            Err(_) => unreachable!("rank_statistics only reports insufficient data"),
        }
    }

    (table, warnings)
}

/// Signed-deviation bands, applied in precedence order.
pub fn classify_delta(delta: f64) -> Classification {
    if delta < -0.2 {
        Classification::VeryOverclassified
    } else if delta < -0.1 {
        Classification::Overclassified
    } else if delta > 0.2 {
        Classification::VeryUnderclassified
    } else if delta > 0.1 {
        Classification::Underclassified
    } else {
        Classification::Ok
    }
}

/// Classify every clade of a distribution table against its rank's
/// median among trusted taxa. Clades at ranks without a defined median
/// get an insufficient-data record. The closest rank is a diagnostic
/// independent of the clade's nominal rank.
pub fn classify(
    distributions: &RankDistributions,
    trusted_taxa: &HashSet<String>,
    parent_lineages: &HashMap<String, String>,
) -> (Vec<ClassificationRecord>, Vec<Warning>) {
    let (statistics, warnings) = rank_statistics_table(distributions, trusted_taxa);
    let medians: BTreeMap<usize, f64> = statistics
        .iter()
        .map(|(&rank, s)| (rank, s.median))
        .collect();

    let mut records = Vec::new();
    for (&rank, taxa) in distributions {
        for (taxon, &red) in taxa {
            let parent_lineage = parent_lineages.get(taxon).cloned().unwrap_or_default();
            let record = match medians.get(&rank) {
                Some(&rank_median) => {
                    let delta = red - rank_median;
                    ClassificationRecord {
                        taxon: taxon.clone(),
                        parent_lineage,
                        red,
                        rank_median: Some(rank_median),
                        delta: Some(delta),
                        closest_rank: closest_rank(red, &medians),
                        classification: classify_delta(delta),
                    }
                }
                None => ClassificationRecord {
                    taxon: taxon.clone(),
                    parent_lineage,
                    red,
                    rank_median: None,
                    delta: None,
                    closest_rank: None,
                    classification: Classification::InsufficientData,
                },
            };
            records.push(record);
        }
    }

    (records, warnings)
}

/// The rank whose median is numerically closest to the given divergence.
fn closest_rank(red: f64, medians: &BTreeMap<usize, f64>) -> Option<&'static str> {
    medians
        .iter()
        .min_by(|(_, a), (_, b)| {
            (red - **a)
                .abs()
                .partial_cmp(&(red - **b).abs())
                .expect("medians are finite")
        })
        .map(|(&rank, _)| RANK_LABELS[rank])
}

/// Per-taxon median table over all phylum rootings: for each rank and
/// taxon, the median of the RED values observed across rootings.
pub fn taxa_median_table(
    phylum_tables: &BTreeMap<String, RankDistributions>,
) -> RankDistributions {
    let mut observations: BTreeMap<usize, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    for distributions in phylum_tables.values() {
        for (&rank, taxa) in distributions {
            for (taxon, &red) in taxa {
                observations
                    .entry(rank)
                    .or_default()
                    .entry(taxon.clone())
                    .or_default()
                    .push(red);
            }
        }
    }

    observations
        .into_iter()
        .map(|(rank, taxa)| {
            let medians = taxa
                .into_iter()
                .filter_map(|(taxon, reds)| stats::median(&reds).map(|m| (taxon, m)))
                .collect();
            (rank, medians)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_bands() {
        assert_eq!(classify_delta(-0.25), Classification::VeryOverclassified);
        assert_eq!(classify_delta(-0.15), Classification::Overclassified);
        assert_eq!(classify_delta(0.0), Classification::Ok);
        assert_eq!(classify_delta(0.15), Classification::Underclassified);
        assert_eq!(classify_delta(0.25), Classification::VeryUnderclassified);
    }

    #[test]
    fn test_band_boundaries_partition_delta_space() {
        // boundary values belong to the inner band
        assert_eq!(classify_delta(-0.2), Classification::Overclassified);
        assert_eq!(classify_delta(-0.1), Classification::Ok);
        assert_eq!(classify_delta(0.1), Classification::Ok);
        assert_eq!(classify_delta(0.2), Classification::Underclassified);
    }

    #[test]
    fn test_rank_statistics_requires_two_taxa() {
        assert!(matches!(
            rank_statistics(&[0.5], 1),
            Err(RedError::InsufficientRankData { .. })
        ));
        let stats = rank_statistics(&[0.4, 0.6], 1).unwrap();
        assert_eq!(stats.median, 0.5);
        assert_eq!(stats.taxa, 2);
    }

    #[test]
    fn test_closest_rank_diagnostic() {
        let medians: BTreeMap<usize, f64> = [(1, 0.3), (2, 0.5), (3, 0.7)].into_iter().collect();
        assert_eq!(closest_rank(0.32, &medians), Some("phylum"));
        assert_eq!(closest_rank(0.69, &medians), Some("order"));
    }
}
