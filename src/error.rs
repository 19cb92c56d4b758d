use thiserror::Error;

/// Errors raised by the divergence core.
///
/// Structural/input errors (`EmptyOutgroup`, `InsufficientPhyla`,
/// `RetryBoundExceeded`) abort the whole run. `DegenerateRooting` is
/// recoverable: the consensus driver skips the offending phylum.
/// `InsufficientRankData` is local to a single rank.
#[derive(Debug, Error)]
pub enum RedError {
    #[error("no leaves in the tree belong to the outgroup '{outgroup}'")]
    EmptyOutgroup { outgroup: String },

    #[error("MRCA cannot be resolved: {0}")]
    AmbiguousRoot(String),

    #[error("the MRCA of outgroup '{outgroup}' spans every leaf; the outgroup is unsuitable for rooting")]
    DegenerateRooting { outgroup: String },

    #[error("consensus rerooting requires at least 2 usable phyla, found {found}")]
    InsufficientPhyla { found: usize },

    #[error("rank '{rank}' has fewer than 2 trusted taxa; no distribution can be inferred")]
    InsufficientRankData { rank: String },

    #[error("rerooting failed to escape the outgroup clade after {attempts} attempts")]
    RetryBoundExceeded { attempts: usize },
}
