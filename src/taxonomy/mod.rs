pub mod filter;

use crate::tree::{most_specific_taxon, parse_label, Tree};
use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub const RANK_PREFIXES: [&str; 7] = ["d__", "p__", "c__", "o__", "f__", "g__", "s__"];
pub const RANK_LABELS: [&str; 7] = [
    "domain", "phylum", "class", "order", "family", "genus", "species",
];

pub const DOMAIN_RANK: usize = 0;
pub const PHYLUM_RANK: usize = 1;
pub const SPECIES_RANK: usize = 6;

/// Rank index for a rank-prefixed taxon name (`p__Firmicutes` -> 1).
pub fn rank_index(taxon: &str) -> Option<usize> {
    let prefix = taxon.get(0..3)?;
    RANK_PREFIXES.iter().position(|&p| p == prefix)
}

pub fn rank_label(rank: usize) -> &'static str {
    RANK_LABELS[rank]
}

/// Mapping from leaf identifier to its ordered, rank-prefixed lineage
/// (domain first). Read-only input to the divergence core.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    lineages: HashMap<String, Vec<String>>,
}

impl Taxonomy {
    pub fn new(lineages: HashMap<String, Vec<String>>) -> Self {
        Taxonomy { lineages }
    }

    /// Read a taxonomy file: `leaf_id<TAB>d__...;p__...;...` per line.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read taxonomy file {}", path.as_ref().display()))?;

        let mut lineages = HashMap::new();
        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((leaf_id, lineage)) = line.split_once('\t') else {
                bail!("taxonomy line {} has no tab separator", line_num + 1);
            };
            let taxa: Vec<String> = lineage
                .split(';')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            lineages.insert(leaf_id.trim().to_string(), taxa);
        }
        Ok(Taxonomy { lineages })
    }

    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    pub fn lineage(&self, leaf_id: &str) -> Option<&[String]> {
        self.lineages.get(leaf_id).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.lineages.iter()
    }

    /// Whether the leaf's lineage contains the given taxon.
    pub fn leaf_in_taxon(&self, leaf_id: &str, taxon: &str) -> bool {
        self.lineages
            .get(leaf_id)
            .map(|taxa| taxa.iter().any(|t| t == taxon))
            .unwrap_or(false)
    }

    /// All named taxa appearing in any lineage, bare rank prefixes
    /// excluded.
    pub fn named_taxa(&self) -> HashSet<String> {
        let mut taxa = HashSet::new();
        for lineage in self.lineages.values() {
            for taxon in lineage {
                if taxon.len() > 3 {
                    taxa.insert(taxon.clone());
                }
            }
        }
        taxa
    }

    /// Parent lineage string for every named taxon (taxa above it, in
    /// rank order, joined with ';').
    pub fn parents(&self) -> HashMap<String, String> {
        let mut parents: HashMap<String, String> = HashMap::new();
        for lineage in self.lineages.values() {
            for (i, taxon) in lineage.iter().enumerate() {
                if taxon.len() <= 3 {
                    continue;
                }
                parents
                    .entry(taxon.clone())
                    .or_insert_with(|| lineage[..i].join(";"));
            }
        }
        parents
    }

    /// Every named taxon below `taxon` in any lineage that contains it.
    pub fn children(&self, taxon: &str) -> HashSet<String> {
        let mut children = HashSet::new();
        for lineage in self.lineages.values() {
            if let Some(pos) = lineage.iter().position(|t| t == taxon) {
                for child in &lineage[pos + 1..] {
                    if child.len() > 3 {
                        children.insert(child.clone());
                    }
                }
            }
        }
        children
    }

    /// Named taxa at the rank immediately below each named taxon.
    pub fn taxon_children(&self) -> HashMap<String, HashSet<String>> {
        let mut children: HashMap<String, HashSet<String>> = HashMap::new();
        for lineage in self.lineages.values() {
            for pair in lineage.windows(2) {
                if pair[0].len() > 3 && pair[1].len() > 3 {
                    children
                        .entry(pair[0].clone())
                        .or_default()
                        .insert(pair[1].clone());
                }
            }
        }
        children
    }
}

/// Phylum-level lineages named on internal nodes of the tree, in
/// pre-order. Compound labels contribute their most specific component.
pub fn phyla_lineages(tree: &Tree) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phyla = Vec::new();
    for id in tree.preorder() {
        if tree.is_leaf(id) {
            continue;
        }
        let Some(raw) = tree.label(id) else { continue };
        let Some(taxon) = parse_label(raw).taxon else {
            continue;
        };
        let specific = most_specific_taxon(&taxon);
        if specific.starts_with(RANK_PREFIXES[PHYLUM_RANK]) && seen.insert(specific.to_string()) {
            phyla.push(specific.to_string());
        }
    }
    phyla
}
