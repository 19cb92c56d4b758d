use super::divergence::{rel_dist_to_named_clades, ScaleMode};
use super::reroot::root_with_outgroup;
use super::stats;
use super::types::{ConsensusRed, PhylumRooting, Warning};
use crate::error::RedError;
use crate::taxonomy::{Taxonomy, DOMAIN_RANK};
use crate::tree::{parse_label, NodeId, Tree};
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::thread;

#[derive(Debug, Clone)]
pub struct ConsensusOptions {
    /// Cap on the randomized rerooting retry loop.
    pub max_reroot_attempts: usize,
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Base seed for the rooting randomization. None draws one at random.
    pub seed: Option<u64>,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        ConsensusOptions {
            max_reroot_attempts: 100,
            threads: 0,
            seed: None,
        }
    }
}

/// Compute the median RED of every node over rootings on each candidate
/// phylum.
///
/// Stable ids are assigned to `tree` in one pre-order pass before any
/// rerooting, so the same clade can be tracked across rootings. Each
/// phylum's reroot/decorate/extract pipeline runs on its own deep copy,
/// fanned out over worker threads; partial per-node observations are
/// merged after a join barrier and reduced to medians.
///
/// A phylum whose outgroup turns out to be degenerate is skipped with a
/// warning; any other rerooting failure aborts the whole aggregation,
/// since silently dropping a rooting would change the consensus.
pub fn median_red_over_phyla(
    tree: &mut Tree,
    taxonomy: &Taxonomy,
    phyla: &[String],
    options: &ConsensusOptions,
) -> Result<ConsensusRed, RedError> {
    if phyla.len() < 2 {
        return Err(RedError::InsufficientPhyla { found: phyla.len() });
    }

    let ids: Vec<NodeId> = tree.preorder().collect();
    for (index, &id) in ids.iter().enumerate() {
        tree.node_mut(id).stable_id = Some(index);
    }

    let base = tree.clone();
    let base_seed = options.seed.unwrap_or_else(rand::random);
    let threads = if options.threads == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        options.threads
    };
    let workers = threads.min(phyla.len());

    let progress = ProgressBar::new(phyla.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap(),
    );
    progress.set_message("Rooting on candidate phyla...");

    let (job_tx, job_rx) = bounded::<String>(workers * 2);
    let (result_tx, result_rx) = bounded::<Result<PhylumRooting, RedError>>(workers * 2);

    let mut accumulator: HashMap<usize, Vec<f64>> = HashMap::new();
    let mut phylum_tables = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut fatal = None;

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let base = &base;
            scope.spawn(move || {
                for phylum in job_rx.iter() {
                    let seed = base_seed ^ phylum_seed(&phylum);
                    let result = process_phylum(base, taxonomy, &phylum, seed, options);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let sender = scope.spawn(move || {
            for phylum in phyla {
                if job_tx.send(phylum.clone()).is_err() {
                    break;
                }
            }
        });

        for result in result_rx.iter() {
            progress.inc(1);
            match result {
                Ok(rooting) => {
                    progress.set_message(format!("Rooted on {}", rooting.phylum));
                    warnings.extend(rooting.warnings);
                    for (stable_id, red) in rooting.node_red {
                        accumulator.entry(stable_id).or_default().push(red);
                    }
                    phylum_tables.insert(rooting.phylum, rooting.rank_distributions);
                }
                Err(RedError::DegenerateRooting { outgroup }) => {
                    warnings.push(Warning::RootingSkipped {
                        phylum: outgroup,
                        reason: "outgroup MRCA spans every leaf".to_string(),
                    });
                }
                Err(e) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }

        sender.join().expect("job sender thread panicked");
    });
    progress.finish_and_clear();

    if let Some(e) = fatal {
        return Err(e);
    }
    if phylum_tables.len() < 2 {
        return Err(RedError::InsufficientPhyla {
            found: phylum_tables.len(),
        });
    }

    let node_medians = accumulator
        .into_iter()
        .filter_map(|(id, reds)| stats::median(&reds).map(|m| (id, m)))
        .collect();

    Ok(ConsensusRed {
        phylum_tables,
        node_medians,
        warnings,
    })
}

/// One phylum's pipeline: reroot a fresh copy on the phylum, decorate it,
/// and extract the cleaned named-clade table plus the per-node RED of the
/// ingroup subtree.
fn process_phylum(
    base: &Tree,
    taxonomy: &Taxonomy,
    phylum: &str,
    seed: u64,
    options: &ConsensusOptions,
) -> Result<PhylumRooting, RedError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rooted = root_with_outgroup(base, taxonomy, phylum, &mut rng, options.max_reroot_attempts)?;
    let mut tree = rooted.tree;
    let warnings = rooted.warnings;

    let mut distributions = rel_dist_to_named_clades(&mut tree, ScaleMode::RelativeDivergence);

    // domain-rank results and taxa inside the outgroup's own subtree are
    // artifacts of the rooting device, not ingroup signal
    distributions.remove(&DOMAIN_RANK);
    let outgroup_taxa = taxonomy.children(phylum);
    for table in distributions.values_mut() {
        table.retain(|taxon, _| taxon != phylum && !outgroup_taxa.contains(taxon));
    }

    let Some(ingroup) = ingroup_child(&tree, phylum) else {
        // every root child carries the outgroup label; nothing to walk
        return Err(RedError::DegenerateRooting {
            outgroup: phylum.to_string(),
        });
    };

    let mut node_red = Vec::new();
    for id in tree.preorder_from(ingroup) {
        if let (Some(stable_id), Some(red)) = (tree.node(id).stable_id, tree.node(id).rel_dist) {
            node_red.push((stable_id, red));
        }
    }

    Ok(PhylumRooting {
        phylum: display_name(phylum),
        rank_distributions: distributions,
        node_red,
        warnings,
    })
}

/// The top-level child of the root whose subtree is not the outgroup,
/// identified by the absence of the outgroup's label.
fn ingroup_child(tree: &Tree, phylum: &str) -> Option<NodeId> {
    for &child in tree.children(tree.root()) {
        let taxon = tree.label(child).and_then(|raw| parse_label(raw).taxon);
        match taxon {
            Some(name) if name.contains(phylum) => continue,
            _ => return Some(child),
        }
    }
    None
}

fn display_name(phylum: &str) -> String {
    phylum
        .trim_start_matches("p__")
        .replace(' ', "_")
        .to_lowercase()
}

/// Order-independent per-phylum seed so consensus does not depend on
/// the processing order of candidate phyla.
fn phylum_seed(phylum: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    phylum.hash(&mut hasher);
    hasher.finish()
}

/// Write the consensus back onto the original tree: the root gets 0,
/// every other node its median RED, and edge lengths become the
/// divergence deltas. Nodes with no consensus value stay undecorated and
/// keep their original edge length. Returns the number of negative
/// scaled branches.
pub fn apply_consensus(tree: &mut Tree, node_medians: &HashMap<usize, f64>) -> usize {
    let ids: Vec<NodeId> = tree.preorder().collect();
    let root = tree.root();
    tree.node_mut(root).rel_dist = Some(0.0);

    let mut negative = 0usize;
    for &id in &ids {
        if id == root {
            continue;
        }
        let median = tree
            .node(id)
            .stable_id
            .and_then(|sid| node_medians.get(&sid))
            .copied();
        tree.node_mut(id).rel_dist = median;

        let parent_red = tree
            .parent(id)
            .and_then(|parent| tree.node(parent).rel_dist);
        if let (Some(red), Some(parent_red)) = (median, parent_red) {
            let delta = red - parent_red;
            if delta < 0.0 {
                negative += 1;
            }
            tree.node_mut(id).length = Some(delta);
        }
    }
    negative
}
