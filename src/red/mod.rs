pub mod classify;
pub mod consensus;
pub mod divergence;
pub mod reroot;
pub mod stats;
pub mod types;

pub use consensus::{apply_consensus, median_red_over_phyla, ConsensusOptions};
pub use divergence::{decorate_rel_dist, rel_dist_to_named_clades, rescale_to_deltas, ScaleMode};
pub use reroot::root_with_outgroup;
pub use types::{
    Classification, ClassificationRecord, ConsensusRed, PhylumRooting, RankDistributions,
    RankStatistics, RootedTree, Warning,
};
