//! Event deduplication.
//!
//! Facts from different documents (or different tags) that describe the same
//! event are grouped into clusters with a union-find over candidate pairs.
//! Everything is keyed on the canonical fact order (`FactId`), so the
//! partition, the canonical choice and the cluster ids do not depend on the
//! order facts arrive in.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::pipeline::terms::{token_set, ClaimTerms};
use crate::types::config::DedupConfig;
use crate::types::fact::{ClusterId, EventCluster, Fact, FactId};

/// Clustered facts.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// Every input fact, `cluster_id` set, in canonical order
    pub facts: Vec<Fact>,

    /// Clusters ordered by id
    pub clusters: Vec<EventCluster>,
}

impl DedupOutcome {
    pub fn fact(&self, id: &FactId) -> Option<&Fact> {
        self.facts
            .binary_search_by(|f| f.id.cmp(id))
            .ok()
            .map(|i| &self.facts[i])
    }

    pub fn canonical_facts(&self) -> impl Iterator<Item = &Fact> {
        self.clusters.iter().filter_map(|c| self.fact(&c.canonical_fact_id))
    }
}

/// Overlap coefficient `|A∩B| / min(|A|,|B|)`; 0 when either set is empty.
pub fn overlap_coefficient(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f32 / smaller as f32
}

/// Union-find where the smaller index is always the root.
#[derive(Debug, Clone)]
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        match ra.cmp(&rb) {
            Ordering::Less => self.parent[rb] = ra,
            Ordering::Greater => self.parent[ra] = rb,
            Ordering::Equal => {}
        }
    }
}

struct Profile {
    tokens: BTreeSet<String>,
    salient: BTreeSet<String>,
}

impl Profile {
    fn new(fact: &Fact) -> Self {
        Self {
            tokens: token_set(&fact.summary),
            salient: ClaimTerms::extract(&fact.summary).salient(),
        }
    }
}

/// Cluster facts describing the same event.
///
/// Two facts are candidates when they share a salient term (unless that
/// requirement is switched off) and their token sets overlap at or above
/// the threshold. Candidates are unioned transitively.
pub fn deduplicate(mut facts: Vec<Fact>, config: &DedupConfig) -> Result<DedupOutcome> {
    facts.sort_by(|a, b| a.id.cmp(&b.id));
    let profiles: Vec<Profile> = facts.iter().map(Profile::new).collect();

    let mut sets = DisjointSets::new(facts.len());
    let mut merges = 0;
    for (i, j) in candidate_pairs(&profiles, config) {
        let overlap = overlap_coefficient(&profiles[i].tokens, &profiles[j].tokens);
        if overlap >= config.overlap_threshold {
            sets.union(i, j);
            merges += 1;
        }
    }

    // Roots are the smallest member index, so BTreeMap order is cluster order
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..facts.len() {
        let root = sets.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut clusters = Vec::with_capacity(groups.len());
    for (n, members) in groups.into_values().enumerate() {
        let cluster_id = ClusterId(n);
        let canonical = members
            .iter()
            .copied()
            .min_by(|&a, &b| prefer(&facts[a], &profiles[a], &facts[b], &profiles[b]))
            .ok_or_else(|| EngineError::ClusterContradiction {
                cluster_id: n,
                reason: "cluster has no members".to_string(),
            })?;

        for &i in &members {
            facts[i].cluster_id = Some(cluster_id);
        }

        clusters.push(EventCluster {
            cluster_id,
            canonical_fact_id: facts[canonical].id.clone(),
            member_fact_ids: members.iter().map(|&i| facts[i].id.clone()).collect(),
        });
    }

    verify_partition(&facts, &clusters)?;

    debug!(
        facts = facts.len(),
        clusters = clusters.len(),
        merges,
        "Deduplicated facts"
    );

    Ok(DedupOutcome { facts, clusters })
}

/// Index pairs `(i, j)`, `i < j`, worth comparing, in ascending order.
fn candidate_pairs(profiles: &[Profile], config: &DedupConfig) -> BTreeSet<(usize, usize)> {
    let mut pairs = BTreeSet::new();

    if !config.require_shared_salient {
        for i in 0..profiles.len() {
            for j in (i + 1)..profiles.len() {
                pairs.insert((i, j));
            }
        }
        return pairs;
    }

    let mut by_term: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, profile) in profiles.iter().enumerate() {
        for term in &profile.salient {
            by_term.entry(term.as_str()).or_default().push(i);
        }
    }
    for holders in by_term.values() {
        for (k, &i) in holders.iter().enumerate() {
            for &j in &holders[k + 1..] {
                pairs.insert((i, j));
            }
        }
    }
    pairs
}

/// Order two facts by preference as a cluster's representative.
///
/// Grounded first, then more salient terms, then the longer summary, then
/// the earliest document id, then the earliest ordinal.
fn prefer(a: &Fact, pa: &Profile, b: &Fact, pb: &Profile) -> Ordering {
    b.grounded
        .cmp(&a.grounded)
        .then_with(|| pb.salient.len().cmp(&pa.salient.len()))
        .then_with(|| b.summary.chars().count().cmp(&a.summary.chars().count()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Check that clusters partition the facts.
///
/// Every fact must be in exactly one non-empty cluster that contains its
/// canonical fact and matches the fact's `cluster_id`.
pub fn verify_partition(facts: &[Fact], clusters: &[EventCluster]) -> Result<()> {
    let contradiction = |cluster: &EventCluster, reason: String| EngineError::ClusterContradiction {
        cluster_id: cluster.cluster_id.0,
        reason,
    };

    let mut seen: HashSet<&FactId> = HashSet::new();
    for cluster in clusters {
        if cluster.is_empty() {
            return Err(contradiction(cluster, "cluster has no members".to_string()));
        }
        if !cluster.contains(&cluster.canonical_fact_id) {
            return Err(contradiction(
                cluster,
                format!("canonical fact {} is not a member", cluster.canonical_fact_id),
            ));
        }
        for id in &cluster.member_fact_ids {
            if !seen.insert(id) {
                return Err(contradiction(cluster, format!("fact {} is in two clusters", id)));
            }
        }
    }

    let member_total: usize = clusters.iter().map(EventCluster::len).sum();
    if member_total != facts.len() {
        return Err(EngineError::ClusterContradiction {
            cluster_id: clusters.last().map_or(0, |c| c.cluster_id.0),
            reason: format!(
                "{} facts but {} cluster members (duplicate fact ids?)",
                facts.len(),
                member_total
            ),
        });
    }

    for fact in facts {
        let consistent = match fact.cluster_id {
            Some(id) => clusters
                .get(id.0)
                .is_some_and(|c| c.cluster_id == id && c.contains(&fact.id)),
            None => false,
        };
        if !consistent {
            return Err(EngineError::ClusterContradiction {
                cluster_id: fact.cluster_id.map_or(0, |c| c.0),
                reason: format!("fact {} is not in its assigned cluster", fact.id),
            });
        }
    }

    Ok(())
}
