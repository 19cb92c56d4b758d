pub mod label;
pub mod model;
pub mod newick;

pub use label::{is_compound, most_specific_taxon, parse_label, NodeLabel};
pub use model::{Node, NodeId, Tree};
