use crate::tree::Tree;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Per-rank table of named-clade divergence values:
/// rank index -> clade name -> RED. Within one table a clade name never
/// repeats for the same rank.
pub type RankDistributions = BTreeMap<usize, BTreeMap<String, f64>>;

/// Advisory conditions surfaced alongside results instead of being
/// logged. None of these halt computation.
#[derive(Debug, Clone)]
pub enum Warning {
    NonMonophyleticOutgroup {
        outgroup: String,
        outgroup_taxa: usize,
        mrca_leaves: usize,
    },
    RootingSkipped {
        phylum: String,
        reason: String,
    },
    NegativeScaledBranches {
        count: usize,
    },
    InsufficientRankData {
        rank: &'static str,
        taxa: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NonMonophyleticOutgroup {
                outgroup,
                outgroup_taxa,
                mrca_leaves,
            } => write!(
                f,
                "outgroup '{}' is not monophyletic: {} outgroup taxa, {} leaves under their MRCA",
                outgroup, outgroup_taxa, mrca_leaves
            ),
            Warning::RootingSkipped { phylum, reason } => {
                write!(f, "rooting on '{}' skipped: {}", phylum, reason)
            }
            Warning::NegativeScaledBranches { count } => {
                write!(f, "{} branches are negative after divergence scaling", count)
            }
            Warning::InsufficientRankData { rank, taxa } => write!(
                f,
                "rank '{}' has only {} trusted taxa; excluded from distribution inference",
                rank, taxa
            ),
        }
    }
}

/// Result of rerooting a tree on an outgroup.
#[derive(Debug)]
pub struct RootedTree {
    pub tree: Tree,
    pub monophyletic: bool,
    pub warnings: Vec<Warning>,
}

/// Divergence results for a single phylum-level rooting. Created fresh
/// per phylum and discarded once folded into the consensus accumulators.
#[derive(Debug)]
pub struct PhylumRooting {
    /// Display name of the phylum used as the rooting outgroup.
    pub phylum: String,
    /// Named-clade RED table with domain-rank and outgroup results
    /// already stripped.
    pub rank_distributions: RankDistributions,
    /// RED per stable node id, for every node in the ingroup subtree.
    pub node_red: Vec<(usize, f64)>,
    pub warnings: Vec<Warning>,
}

/// Consensus over all phylum-level rootings.
#[derive(Debug)]
pub struct ConsensusRed {
    /// Per-phylum named-clade tables, keyed by phylum display name.
    pub phylum_tables: BTreeMap<String, RankDistributions>,
    /// Median RED per stable node id. Nodes never visited under any
    /// rooting are absent, not zero.
    pub node_medians: HashMap<usize, f64>,
    pub warnings: Vec<Warning>,
}

/// Per-rank central tendency over trusted taxa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankStatistics {
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
    pub taxa: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    VeryOverclassified,
    Overclassified,
    Ok,
    Underclassified,
    VeryUnderclassified,
    InsufficientData,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::VeryOverclassified => "very overclassified",
            Classification::Overclassified => "overclassified",
            Classification::Ok => "OK",
            Classification::Underclassified => "underclassified",
            Classification::VeryUnderclassified => "very underclassified",
            Classification::InsufficientData => "insufficient data to calculate median for rank",
        };
        f.write_str(label)
    }
}

/// One row of the outlier report. Output-only.
#[derive(Debug, Clone)]
pub struct ClassificationRecord {
    pub taxon: String,
    pub parent_lineage: String,
    pub red: f64,
    pub rank_median: Option<f64>,
    pub delta: Option<f64>,
    pub closest_rank: Option<&'static str>,
    pub classification: Classification,
}
