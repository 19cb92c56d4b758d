use super::{rank_index, Taxonomy, SPECIES_RANK};
use crate::tree::{most_specific_taxon, parse_label, Tree};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Thresholds applied before a taxon is eligible for distribution
/// inference.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub min_children: usize,
    pub min_support: f64,
    pub min_fmeasure: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            min_children: 2,
            min_support: 0.0,
            min_fmeasure: 0.95,
        }
    }
}

/// Determine the taxa eligible for inferring rank distributions.
///
/// Starts from every named taxon in the taxonomy and removes taxa with
/// too few named children, insufficient support on their tree node, an
/// F-measure below the threshold, or absence from the trusted set.
pub fn taxa_for_dist_inference(
    tree: &Tree,
    taxonomy: &Taxonomy,
    trusted_taxa: Option<&HashSet<String>>,
    fmeasure: Option<&HashMap<String, f64>>,
    options: &FilterOptions,
) -> HashSet<String> {
    let mut eligible = taxonomy.named_taxa();

    if options.min_children > 0 {
        let children = taxonomy.taxon_children();
        eligible.retain(|taxon| {
            // species have no named children to count
            if rank_index(taxon) == Some(SPECIES_RANK) {
                return true;
            }
            children
                .get(taxon)
                .map(|c| c.len() >= options.min_children)
                .unwrap_or(false)
        });
    }

    if options.min_support > 0.0 {
        for id in tree.preorder() {
            if tree.is_leaf(id) {
                continue;
            }
            let Some(raw) = tree.label(id) else { continue };
            let label = parse_label(raw);
            if let (Some(support), Some(taxon)) = (label.support, label.taxon) {
                if support < options.min_support {
                    eligible.remove(most_specific_taxon(&taxon));
                }
            }
        }
    }

    if let Some(fmeasure) = fmeasure {
        eligible.retain(|taxon| {
            fmeasure
                .get(taxon)
                .map(|&f| f >= options.min_fmeasure)
                .unwrap_or(true)
        });
    }

    if let Some(trusted) = trusted_taxa {
        eligible.retain(|taxon| trusted.contains(taxon));
    }

    eligible
}

/// Read a file listing taxa (first tab-separated column of each line).
pub fn read_taxa_file<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read taxa file {}", path.as_ref().display()))?;
    Ok(text
        .lines()
        .map(|l| l.split('\t').next().unwrap_or(l).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Read a table with per-taxon F-measure scores (taxon in the first
/// column, F-measure in the third; one header line).
pub fn read_fmeasure<P: AsRef<Path>>(path: P) -> Result<HashMap<String, f64>> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read F-measure table {}", path.as_ref().display()))?;

    let mut fmeasure = HashMap::new();
    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }
        let value: f64 = fields[2]
            .trim()
            .parse()
            .with_context(|| format!("invalid F-measure for taxon {}", fields[0]))?;
        fmeasure.insert(fields[0].trim().to_string(), value);
    }
    Ok(fmeasure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::newick;
    use std::collections::HashMap;

    fn taxonomy() -> Taxonomy {
        let mut m = HashMap::new();
        for (id, lineage) in [
            ("a1", vec!["d__Bacteria", "p__Alpha", "c__A1"]),
            ("a2", vec!["d__Bacteria", "p__Alpha", "c__A2"]),
            ("b1", vec!["d__Bacteria", "p__Beta", "c__B1"]),
        ] {
            m.insert(
                id.to_string(),
                lineage.into_iter().map(String::from).collect(),
            );
        }
        Taxonomy::new(m)
    }

    #[test]
    fn test_min_children_filter() {
        let tree = newick::parse("((a1:1,a2:1)p__Alpha:1,b1:2);").unwrap();
        let eligible = taxa_for_dist_inference(
            &tree,
            &taxonomy(),
            None,
            None,
            &FilterOptions {
                min_children: 2,
                min_support: 0.0,
                min_fmeasure: 0.95,
            },
        );
        // Alpha has two named classes, Beta only one
        assert!(eligible.contains("p__Alpha"));
        assert!(!eligible.contains("p__Beta"));
    }

    #[test]
    fn test_min_support_filter() {
        let tree = newick::parse("((a1:1,a2:1)'40:p__Alpha':1,b1:2);").unwrap();
        let eligible = taxa_for_dist_inference(
            &tree,
            &taxonomy(),
            None,
            None,
            &FilterOptions {
                min_children: 0,
                min_support: 70.0,
                min_fmeasure: 0.95,
            },
        );
        assert!(!eligible.contains("p__Alpha"));
        assert!(eligible.contains("p__Beta"));
    }

    #[test]
    fn test_trusted_taxa_filter() {
        let tree = newick::parse("((a1:1,a2:1):1,b1:2);").unwrap();
        let trusted: HashSet<String> = ["p__Alpha".to_string()].into_iter().collect();
        let eligible = taxa_for_dist_inference(
            &tree,
            &taxonomy(),
            Some(&trusted),
            None,
            &FilterOptions {
                min_children: 0,
                min_support: 0.0,
                min_fmeasure: 0.95,
            },
        );
        assert_eq!(eligible.len(), 1);
        assert!(eligible.contains("p__Alpha"));
    }
}
