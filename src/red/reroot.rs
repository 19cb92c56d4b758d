use super::types::{RootedTree, Warning};
use crate::error::RedError;
use crate::taxonomy::Taxonomy;
use crate::tree::{NodeId, Tree};
use rand::seq::SliceRandom;
use rand::Rng;

/// Reroot `tree` so the MRCA of the leaves belonging to
/// `outgroup_taxon` becomes a direct child of a new root. The input
/// tree is left untouched; the returned tree is a rerooted deep copy.
///
/// Finding the MRCA requires a rooted tree, and the input may currently
/// be rooted inside the outgroup clade, in which case the outgroup MRCA
/// appears to span every leaf. There is no way to pick a node guaranteed
/// to sit outside the outgroup, so the tree is rerooted on random
/// ingroup leaves until the MRCA no longer spans the whole tree.
/// Termination is almost sure but unbounded, so attempts are capped and
/// exhaustion becomes `RetryBoundExceeded`.
pub fn root_with_outgroup<R: Rng + ?Sized>(
    tree: &Tree,
    taxonomy: &Taxonomy,
    outgroup_taxon: &str,
    rng: &mut R,
    max_attempts: usize,
) -> Result<RootedTree, RedError> {
    let mut outgroup = Vec::new();
    let mut ingroup = Vec::new();
    for leaf in tree.leaves() {
        let in_outgroup = tree
            .label(leaf)
            .map(|id| taxonomy.leaf_in_taxon(id, outgroup_taxon))
            .unwrap_or(false);
        if in_outgroup {
            outgroup.push(leaf);
        } else {
            ingroup.push(leaf);
        }
    }

    if outgroup.is_empty() {
        return Err(RedError::EmptyOutgroup {
            outgroup: outgroup_taxon.to_string(),
        });
    }
    if ingroup.is_empty() {
        // every leaf is in the outgroup; nothing to root against
        return Err(RedError::DegenerateRooting {
            outgroup: outgroup_taxon.to_string(),
        });
    }

    let mut work = tree.clone();
    let total_leaves = outgroup.len() + ingroup.len();

    let mut resolved: Option<(NodeId, usize)> = None;
    for _ in 0..max_attempts {
        let &trial_leaf = ingroup
            .choose(&mut *rng)
            .expect("ingroup is non-empty");
        let half = 0.5 * work.length(trial_leaf).unwrap_or(0.0);
        work.reroot_at_edge(trial_leaf, half, half);

        let mrca = work.mrca(&outgroup)?;
        let mrca_leaves = work.leaf_count_under(mrca);
        if mrca_leaves != total_leaves {
            resolved = Some((mrca, mrca_leaves));
            break;
        }
    }
    let Some((mrca, mrca_leaves)) = resolved else {
        return Err(RedError::RetryBoundExceeded {
            attempts: max_attempts,
        });
    };

    let mut warnings = Vec::new();
    let monophyletic = mrca_leaves == outgroup.len();
    if !monophyletic {
        warnings.push(Warning::NonMonophyleticOutgroup {
            outgroup: outgroup_taxon.to_string(),
            outgroup_taxa: outgroup.len(),
            mrca_leaves,
        });
    }

    // a missing edge length means the tree is already rooted on this
    // outgroup boundary
    if let Some(length) = work.length(mrca) {
        work.reroot_at_edge(mrca, 0.5 * length, 0.5 * length);
    }

    Ok(RootedTree {
        tree: work,
        monophyletic,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::newick;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn taxonomy() -> Taxonomy {
        let mut m = HashMap::new();
        for (id, phylum) in [
            ("a1", "p__Alpha"),
            ("a2", "p__Alpha"),
            ("b1", "p__Beta"),
            ("b2", "p__Beta"),
            ("c1", "p__Gamma"),
        ] {
            m.insert(
                id.to_string(),
                vec!["d__Bacteria".to_string(), phylum.to_string()],
            );
        }
        Taxonomy::new(m)
    }

    #[test]
    fn test_monophyletic_outgroup() {
        let tree = newick::parse("(((a1:1,a2:1):1,(b1:1,b2:1):1):1,c1:3);").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let rooted = root_with_outgroup(&tree, &taxonomy(), "p__Alpha", &mut rng, 100).unwrap();
        assert!(rooted.monophyletic);
        assert!(rooted.warnings.is_empty());

        // the outgroup clade hangs directly off the new root
        let root = rooted.tree.root();
        let outgroup_child = rooted
            .tree
            .children(root)
            .iter()
            .copied()
            .find(|&c| {
                rooted
                    .tree
                    .leaves_under(c)
                    .all(|l| matches!(rooted.tree.label(l), Some("a1") | Some("a2")))
            });
        assert!(outgroup_child.is_some());
    }

    #[test]
    fn test_empty_outgroup_is_fatal() {
        let tree = newick::parse("((a1:1,a2:1):1,(b1:1,b2:1):1);").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let err = root_with_outgroup(&tree, &taxonomy(), "p__Missing", &mut rng, 100)
            .err()
            .unwrap();
        assert!(matches!(err, RedError::EmptyOutgroup { .. }));
    }

    #[test]
    fn test_outgroup_spanning_all_leaves_is_degenerate() {
        let tree = newick::parse("(a1:1,a2:1);").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let err = root_with_outgroup(&tree, &taxonomy(), "p__Alpha", &mut rng, 100)
            .err()
            .unwrap();
        assert!(matches!(err, RedError::DegenerateRooting { .. }));
    }

    #[test]
    fn test_non_monophyletic_outgroup_warns() {
        // Beta leaves split across the two sides of the Alpha cherry
        let tree = newick::parse("((a1:1,b1:1):1,(a2:1,b2:1):1,c1:2);").unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let rooted = root_with_outgroup(&tree, &taxonomy(), "p__Beta", &mut rng, 100).unwrap();
        assert!(!rooted.monophyletic);
        assert!(matches!(
            rooted.warnings[0],
            Warning::NonMonophyleticOutgroup { .. }
        ));
    }
}
