//! Interaction Analyzer: pairwise facilitation/interference between demands.
//!
//! Strength is symmetric and lies in `[-1, 1]`:
//!
//! - resource overlap `Σ_d min(a[d], b[d])`, normalized by the maximum
//!   possible overlap (4.0), interferes proportionally;
//! - an explicit `conflicts_with` in either direction adds a fixed,
//!   dominating interference term;
//! - shared subgoals, a parent/subgoal link, or `facilitates` in either
//!   direction each add one facilitation signal.

use std::collections::BTreeMap;
use std::sync::Arc;

use cortex_types::{Demand, DemandId, ResourceDimension};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::InteractionWeights;

/// Maximum possible overlap between two resource vectors.
const MAX_OVERLAP: f64 = ResourceDimension::COUNT as f64;

/// Content fingerprint of a demand set.
pub type Fingerprint = blake3::Hash;

/// Symmetric pairwise interaction strengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMatrix {
    strengths: BTreeMap<(DemandId, DemandId), f64>,
}

impl InteractionMatrix {
    fn key(a: &DemandId, b: &DemandId) -> (DemandId, DemandId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    fn insert(&mut self, a: &DemandId, b: &DemandId, strength: f64) {
        self.strengths.insert(Self::key(a, b), strength);
    }

    /// Strength between two demands; `0.0` for unknown pairs and self-pairs.
    pub fn strength(&self, a: &DemandId, b: &DemandId) -> f64 {
        if a == b {
            return 0.0;
        }
        self.strengths.get(&Self::key(a, b)).copied().unwrap_or(0.0)
    }

    /// Pairs in canonical `(lower id, higher id)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&DemandId, &DemandId, f64)> {
        self.strengths.iter().map(|((a, b), s)| (a, b, *s))
    }

    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }
}

/// Computes and caches interaction matrices.
///
/// The cache holds the matrix for the most recently analyzed demand set,
/// keyed by its fingerprint. Callers invalidate it explicitly when they
/// know the set changed materially.
pub struct InteractionAnalyzer {
    weights: InteractionWeights,
    cache: Mutex<Option<(Fingerprint, Arc<InteractionMatrix>)>>,
}

impl InteractionAnalyzer {
    pub fn new(weights: InteractionWeights) -> Self {
        Self {
            weights,
            cache: Mutex::new(None),
        }
    }

    pub fn weights(&self) -> &InteractionWeights {
        &self.weights
    }

    /// Interaction strengths for every unordered pair in `demands`.
    pub fn compute_interactions(&self, demands: &[Demand]) -> Arc<InteractionMatrix> {
        let fingerprint = fingerprint(demands);

        let mut cache = self.cache.lock();
        if let Some((cached, matrix)) = cache.as_ref() {
            if *cached == fingerprint {
                trace!(demands = demands.len(), "Interaction cache hit");
                return matrix.clone();
            }
        }

        let mut matrix = InteractionMatrix::default();
        for (i, a) in demands.iter().enumerate() {
            for b in &demands[i + 1..] {
                if a.id() == b.id() {
                    continue;
                }
                let s = pair_strength(a, b, &self.weights);
                if s != 0.0 {
                    matrix.insert(a.id(), b.id(), s);
                }
            }
        }

        debug!(
            demands = demands.len(),
            nonzero_pairs = matrix.len(),
            "Interaction matrix computed"
        );

        let matrix = Arc::new(matrix);
        *cache = Some((fingerprint, matrix.clone()));
        matrix
    }

    /// Drop the cached matrix.
    pub fn invalidate(&self) {
        if self.cache.lock().take().is_some() {
            debug!("Interaction cache invalidated");
        }
    }

    pub fn is_cached(&self, demands: &[Demand]) -> bool {
        let fp = fingerprint(demands);
        matches!(self.cache.lock().as_ref(), Some((cached, _)) if *cached == fp)
    }
}

impl Default for InteractionAnalyzer {
    fn default() -> Self {
        Self::new(InteractionWeights::default())
    }
}

/// Strength between two demands, clamped to `[-1, 1]`.
pub fn pair_strength(a: &Demand, b: &Demand, weights: &InteractionWeights) -> f64 {
    let overlap = a.resource_needs().overlap(b.resource_needs());
    let mut interference = weights.resource_overlap * overlap / MAX_OVERLAP;
    if a.conflicts_with(b.id()) || b.conflicts_with(a.id()) {
        interference += weights.conflict;
    }

    let facilitation = weights.facilitation_per_signal * facilitation_signals(a, b) as f64;

    (facilitation - interference).clamp(-1.0, 1.0)
}

fn facilitation_signals(a: &Demand, b: &Demand) -> usize {
    let ra = a.relationships();
    let rb = b.relationships();

    let shared_subgoals = ra.subgoal_ids.intersection(&rb.subgoal_ids).count();
    let parent_link = ra.subgoal_ids.contains(b.id()) || rb.subgoal_ids.contains(a.id());
    let explicit = [a.facilitates(b.id()), b.facilitates(a.id())]
        .into_iter()
        .filter(|f| *f)
        .count();

    shared_subgoals + usize::from(parent_link) + explicit
}

/// Fingerprint over ids, needs and relationships, independent of input order.
pub fn fingerprint(demands: &[Demand]) -> Fingerprint {
    let mut sorted: Vec<&Demand> = demands.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));

    let mut hasher = blake3::Hasher::new();
    hasher.update(&(sorted.len() as u64).to_le_bytes());
    for d in sorted {
        hash_id(&mut hasher, d.id());
        for v in d.resource_needs().to_array() {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        let rel = d.relationships();
        for set in [&rel.conflicts_with, &rel.facilitates, &rel.subgoal_ids] {
            hasher.update(&(set.len() as u64).to_le_bytes());
            for id in set {
                hash_id(&mut hasher, id);
            }
        }
    }
    hasher.finalize()
}

fn hash_id(hasher: &mut blake3::Hasher, id: &DemandId) {
    hasher.update(&(id.as_str().len() as u64).to_le_bytes());
    hasher.update(id.as_str().as_bytes());
}
