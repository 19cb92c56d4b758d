use rand::rngs::StdRng;
use rand::SeedableRng;
use reldiv::red::{decorate_rel_dist, rescale_to_deltas, root_with_outgroup, ScaleMode};
use reldiv::taxonomy::Taxonomy;
use reldiv::tree::newick;
use std::collections::HashMap;

fn taxonomy() -> Taxonomy {
    let mut lineages = HashMap::new();
    for (leaf, phylum) in [
        ("A", "p__Alpha"),
        ("B", "p__Beta"),
        ("C", "p__Gamma"),
        ("D", "p__Gamma"),
    ] {
        lineages.insert(
            leaf.to_string(),
            vec!["d__Bacteria".to_string(), phylum.to_string()],
        );
    }
    Taxonomy::new(lineages)
}

// Balanced 4-leaf scenario: RED(root) = 0, the inner node above A/B sits
// at 1/(1+1) = 0.5 (edge 1, mean leaf distance 1), and leaf B at
// 0.5 + (1/(1+0)) * (1 - 0.5) = 1.0.
#[test]
fn balanced_tree_red_values() {
    let mut tree = newick::parse("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
    decorate_rel_dist(&mut tree, ScaleMode::RelativeDivergence);

    let root = tree.root();
    assert_eq!(tree.node(root).rel_dist, Some(0.0));

    let ab = tree.children(root)[0];
    assert!((tree.node(ab).rel_dist.unwrap() - 0.5).abs() < 1e-12);

    let b = tree
        .leaves()
        .find(|&id| tree.label(id) == Some("B"))
        .unwrap();
    assert!((tree.node(b).rel_dist.unwrap() - 1.0).abs() < 1e-12);
}

// Rooting the balanced tree on {A}: the MRCA of a single leaf is the
// leaf itself, so the outgroup is trivially monophyletic.
#[test]
fn single_leaf_outgroup_is_trivially_monophyletic() {
    let tree = newick::parse("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let rooted = root_with_outgroup(&tree, &taxonomy(), "p__Alpha", &mut rng, 100).unwrap();
    assert!(rooted.monophyletic);
    assert!(rooted.warnings.is_empty());

    // A hangs directly off the new root
    let root = rooted.tree.root();
    let a_side = rooted
        .tree
        .children(root)
        .iter()
        .copied()
        .find(|&c| rooted.tree.label(c) == Some("A"));
    assert!(a_side.is_some());
}

// With positive edge lengths RED never decreases from root to leaf, and
// summing the rescaled edge lengths down to any leaf reproduces that
// leaf's RED.
#[test]
fn red_monotonic_and_deltas_round_trip() {
    let text = "(((t1:0.31,t2:0.72):0.25,(t3:0.4,t4:0.9):0.61):0.2,((t5:1.1,t6:0.3):0.4,t7:1.6):0.3);";
    let mut tree = newick::parse(text).unwrap();
    decorate_rel_dist(&mut tree, ScaleMode::RelativeDivergence);

    for id in tree.preorder() {
        let red = tree.node(id).rel_dist.unwrap();
        assert!((0.0..=1.0).contains(&red));
        if let Some(parent) = tree.parent(id) {
            assert!(red >= tree.node(parent).rel_dist.unwrap());
        }
    }

    let negative = rescale_to_deltas(&mut tree);
    assert_eq!(negative, 0);

    let leaves: Vec<_> = tree.leaves().collect();
    for leaf in leaves {
        let red = tree.node(leaf).rel_dist.unwrap();
        let mut sum = 0.0;
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            sum += tree.length(id).unwrap_or(0.0);
            cur = tree.parent(id);
        }
        assert!((sum - red).abs() < 1e-9, "leaf RED {} vs delta sum {}", red, sum);
    }
}

// Rerooting only moves the root; the multiset of leaf-to-leaf path
// lengths is unchanged.
#[test]
fn rerooting_preserves_path_length_multiset() {
    let tree = newick::parse("(((A:1,B:1):1,(C:1,D:1):1):1,(E:2,F:1):3);").unwrap();
    let before = pairwise_path_lengths(&tree);

    let mut rerooted = tree.clone();
    let c = rerooted
        .leaves()
        .find(|&id| rerooted.label(id) == Some("C"))
        .unwrap();
    let len = rerooted.length(c).unwrap();
    rerooted.reroot_at_edge(c, 0.25 * len, 0.75 * len);

    let after = pairwise_path_lengths(&rerooted);
    assert_eq!(before.len(), after.len());
    for (x, y) in before.iter().zip(after.iter()) {
        assert!((x - y).abs() < 1e-9);
    }
}

fn pairwise_path_lengths(tree: &reldiv::tree::Tree) -> Vec<f64> {
    let leaves: Vec<_> = tree.leaves().collect();
    let mut sums = Vec::new();
    for (i, &x) in leaves.iter().enumerate() {
        for &y in leaves.iter().skip(i + 1) {
            let mrca = tree.mrca(&[x, y]).unwrap();
            sums.push(climb(tree, x, mrca) + climb(tree, y, mrca));
        }
    }
    sums.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sums
}

fn climb(tree: &reldiv::tree::Tree, mut id: reldiv::tree::NodeId, ancestor: reldiv::tree::NodeId) -> f64 {
    let mut total = 0.0;
    while id != ancestor {
        total += tree.length(id).unwrap_or(0.0);
        id = tree.parent(id).unwrap();
    }
    total
}
