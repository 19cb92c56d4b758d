use super::types::RankDistributions;
use crate::taxonomy::rank_index;
use crate::tree::{is_compound, parse_label, NodeId, Tree};

/// How node divergence is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Relative evolutionary divergence, normalized to [0, 1].
    RelativeDivergence,
    /// Cumulative branch length from the root, unnormalized.
    MeanBranchLength,
}

/// Decorate every node with its divergence value.
///
/// The root gets 0. Every other node, visited parent before child, gets
/// `RED(n) = RED(p) + (a / (a + b)) * (1 - RED(p))` where `a` is the
/// node's edge length and `b` the mean distance from the node to the
/// leaves of its subtree; `a + b = 0` collapses to the parent's value.
/// In `MeanBranchLength` mode the step is simply the edge length.
pub fn decorate_rel_dist(tree: &mut Tree, mode: ScaleMode) {
    let order: Vec<NodeId> = tree.preorder().collect();
    let mean_dists = average_leaf_distances(tree, &order);

    for &id in &order {
        let value = match tree.parent(id) {
            None => 0.0,
            Some(parent) => {
                let x = tree
                    .node(parent)
                    .rel_dist
                    .expect("pre-order guarantees the parent is decorated");
                let a = tree.length(id).unwrap_or(0.0);
                match mode {
                    ScaleMode::RelativeDivergence => {
                        let b = mean_dists[id];
                        if a + b != 0.0 {
                            x + (a / (a + b)) * (1.0 - x)
                        } else {
                            x
                        }
                    }
                    ScaleMode::MeanBranchLength => x + a,
                }
            }
        };
        tree.node_mut(id).rel_dist = Some(value);
    }
}

/// Mean distance from each node down to the leaves of its subtree,
/// weighted by leaf count. Indexed by node id; unreachable arena slots
/// stay zero.
fn average_leaf_distances(tree: &Tree, preorder: &[NodeId]) -> Vec<f64> {
    let slots = preorder.iter().max().map(|&m| m + 1).unwrap_or(0);
    let mut leaf_counts = vec![0usize; slots];
    let mut mean_dists = vec![0f64; slots];

    // children precede parents in reversed pre-order
    for &id in preorder.iter().rev() {
        if tree.is_leaf(id) {
            leaf_counts[id] = 1;
            mean_dists[id] = 0.0;
            continue;
        }
        let mut total = 0usize;
        let mut weighted = 0f64;
        for &child in tree.children(id) {
            let count = leaf_counts[child];
            total += count;
            weighted += (mean_dists[child] + tree.length(child).unwrap_or(0.0)) * count as f64;
        }
        leaf_counts[id] = total;
        mean_dists[id] = weighted / total as f64;
    }

    mean_dists
}

/// Decorate the tree and collect the divergence of every named internal
/// clade, keyed by rank index. Compound labels (naming several ranks at
/// one node) are not attributable to a single clade and are skipped.
pub fn rel_dist_to_named_clades(tree: &mut Tree, mode: ScaleMode) -> RankDistributions {
    decorate_rel_dist(tree, mode);

    let mut distributions = RankDistributions::new();
    let ids: Vec<NodeId> = tree.preorder().collect();
    for id in ids {
        if id == tree.root() || tree.is_leaf(id) {
            continue;
        }
        let Some(raw) = tree.label(id) else { continue };
        let Some(taxon) = parse_label(raw).taxon else {
            continue;
        };
        if is_compound(&taxon) {
            continue;
        }
        let Some(rank) = rank_index(&taxon) else {
            continue;
        };
        let red = tree
            .node(id)
            .rel_dist
            .expect("decorate_rel_dist visits every node");
        distributions.entry(rank).or_default().insert(taxon, red);
    }
    distributions
}

/// Rewrite every edge length to the divergence delta from the parent,
/// producing a divergence-scaled tree. Returns the number of branches
/// that came out negative.
pub fn rescale_to_deltas(tree: &mut Tree) -> usize {
    let mut negative = 0usize;
    let ids: Vec<NodeId> = tree.preorder().collect();
    for id in ids {
        let Some(parent) = tree.parent(id) else { continue };
        let (Some(own), Some(parent_rd)) = (tree.node(id).rel_dist, tree.node(parent).rel_dist)
        else {
            continue;
        };
        let delta = own - parent_rd;
        if delta < 0.0 {
            negative += 1;
        }
        tree.node_mut(id).length = Some(delta);
    }
    negative
}
