use std::collections::BTreeMap;

use cortex_types::{CognitiveResources, DemandId, ResourceDimension};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

type Vector = [f64; ResourceDimension::COUNT];

/// Per-dimension totals of `grants`, each summed in ascending order.
///
/// The result depends only on the multiset of grants, so the total checked
/// before a grant is exactly the total committed after it, and removing a
/// grant never raises a total.
fn totals<'a>(grants: impl IntoIterator<Item = &'a CognitiveResources>) -> Vector {
    let mut columns: [Vec<f64>; ResourceDimension::COUNT] = Default::default();
    for grant in grants {
        for (column, v) in columns.iter_mut().zip(grant.to_array()) {
            column.push(v);
        }
    }
    columns.map(|mut column| {
        column.sort_by(f64::total_cmp);
        column.into_iter().fold(0.0, |acc, v| acc + v)
    })
}

/// Resource Pool: finite capacity along four independent dimensions.
///
/// For every dimension `d`, the sum of granted needs never exceeds
/// `capacity[d]`. Grants are all-or-nothing across all dimensions at once.
///
/// The pool serializes every operation through one internal lock, so
/// grants and releases issued from other execution contexts (goal
/// completions, cancellations) never expose a partially applied state.
#[derive(Debug)]
pub struct ResourcePool {
    inner: Mutex<PoolState>,
}

#[derive(Debug, Clone)]
struct PoolState {
    capacity: CognitiveResources,
    allocated: BTreeMap<DemandId, CognitiveResources>,
}

impl PoolState {
    fn others<'a>(&'a self, exclude: Option<&'a DemandId>) -> impl Iterator<Item = &'a CognitiveResources> {
        self.allocated
            .iter()
            .filter(move |(id, _)| Some(*id) != exclude)
            .map(|(_, needs)| needs)
    }

    fn committed(&self) -> Vector {
        totals(self.allocated.values())
    }

    /// Whether the totals after granting `needs` stay within capacity.
    fn fits(&self, needs: &CognitiveResources, exclude: Option<&DemandId>) -> bool {
        let after = totals(self.others(exclude).chain(std::iter::once(needs)));
        let capacity = self.capacity.to_array();
        after.iter().zip(capacity).all(|(total, cap)| *total <= cap)
    }

    fn dimension_utilization(&self, committed: &Vector, dimension: ResourceDimension) -> f64 {
        let cap = self.capacity.get(dimension);
        if cap <= 0.0 {
            return 0.0;
        }
        (committed[dimension.index()] / cap).clamp(0.0, 1.0)
    }

    fn utilization(&self) -> f64 {
        let committed = self.committed();
        let total: f64 = ResourceDimension::ALL
            .iter()
            .map(|d| self.dimension_utilization(&committed, *d))
            .sum();
        total / ResourceDimension::COUNT as f64
    }
}

/// Consistent point-in-time view of the pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub capacity: CognitiveResources,
    pub allocated: BTreeMap<DemandId, CognitiveResources>,
    pub utilization: f64,
}

impl ResourcePool {
    /// Create a pool with the given capacity.
    pub fn new(capacity: CognitiveResources) -> Self {
        Self {
            inner: Mutex::new(PoolState {
                capacity,
                allocated: BTreeMap::new(),
            }),
        }
    }

    /// Create a pool with full capacity along every dimension.
    pub fn with_full_capacity() -> Self {
        Self::new(CognitiveResources::full())
    }

    /// Atomically check and commit a grant.
    ///
    /// Granted iff for every dimension the remaining capacity, not counting
    /// any existing grant held by `demand_id`, covers `needs`. A granted
    /// demand's previous allocation is replaced.
    pub fn allocate(&self, demand_id: &DemandId, needs: &CognitiveResources) -> bool {
        let mut state = self.inner.lock();

        if !state.fits(needs, Some(demand_id)) {
            debug!(
                demand = %demand_id,
                needs = ?needs.to_array(),
                "Allocation refused, insufficient capacity"
            );
            return false;
        }

        state.allocated.insert(demand_id.clone(), *needs);
        debug!(
            demand = %demand_id,
            needs = ?needs.to_array(),
            utilization = state.utilization(),
            "Resources allocated"
        );
        true
    }

    /// Release a demand's grant. Idempotent.
    ///
    /// Returns the released needs, if the demand held a grant.
    pub fn release(&self, demand_id: &DemandId) -> Option<CognitiveResources> {
        let mut state = self.inner.lock();
        let released = state.allocated.remove(demand_id);
        match &released {
            Some(_) => debug!(
                demand = %demand_id,
                utilization = state.utilization(),
                "Resources released"
            ),
            None => trace!(demand = %demand_id, "Release of unallocated demand ignored"),
        }
        released
    }

    /// Release every grant in one atomic step.
    pub fn release_all(&self) -> usize {
        let mut state = self.inner.lock();
        let count = state.allocated.len();
        state.allocated.clear();
        if count > 0 {
            debug!(released = count, "All resources released");
        }
        count
    }

    /// Whether `needs` would be granted right now. Never commits.
    pub fn can_allocate(&self, needs: &CognitiveResources) -> bool {
        self.inner.lock().fits(needs, None)
    }

    /// Mean over the four dimensions of `Σ allocated[d] / capacity[d]`.
    ///
    /// Dimensions with zero capacity contribute zero.
    pub fn utilization(&self) -> f64 {
        self.inner.lock().utilization()
    }

    /// Utilization of a single dimension.
    pub fn dimension_utilization(&self, dimension: ResourceDimension) -> f64 {
        let state = self.inner.lock();
        let committed = state.committed();
        state.dimension_utilization(&committed, dimension)
    }

    /// Remaining capacity per dimension, ordered as [`ResourceDimension::ALL`].
    pub fn available(&self) -> [f64; ResourceDimension::COUNT] {
        let state = self.inner.lock();
        let committed = state.committed();
        let capacity = state.capacity.to_array();
        let mut out = [0.0; ResourceDimension::COUNT];
        for d in 0..ResourceDimension::COUNT {
            out[d] = (capacity[d] - committed[d]).max(0.0);
        }
        out
    }

    /// Current grant for a demand.
    pub fn allocation(&self, demand_id: &DemandId) -> Option<CognitiveResources> {
        self.inner.lock().allocated.get(demand_id).copied()
    }

    pub fn is_allocated(&self, demand_id: &DemandId) -> bool {
        self.inner.lock().allocated.contains_key(demand_id)
    }

    /// Demands currently holding a grant, in id order.
    pub fn allocated_ids(&self) -> Vec<DemandId> {
        self.inner.lock().allocated.keys().cloned().collect()
    }

    /// Number of demands currently holding a grant.
    pub fn active_count(&self) -> usize {
        self.inner.lock().allocated.len()
    }

    pub fn capacity(&self) -> CognitiveResources {
        self.inner.lock().capacity
    }

    /// Total committed per dimension.
    pub fn committed(&self) -> [f64; ResourceDimension::COUNT] {
        self.inner.lock().committed()
    }

    /// Capture capacity, grants and utilization under a single lock.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.inner.lock();
        PoolSnapshot {
            capacity: state.capacity,
            allocated: state.allocated.clone(),
            utilization: state.utilization(),
        }
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::with_full_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn uniform(v: f64) -> CognitiveResources {
        CognitiveResources::uniform(v).unwrap()
    }

    fn id(s: &str) -> DemandId {
        DemandId::new(s)
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = ResourcePool::default();
        assert_eq!(pool.utilization(), 0.0);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.can_allocate(&uniform(1.0)));
    }

    #[test]
    fn allocate_reduces_available() {
        let pool = ResourcePool::default();
        assert!(pool.allocate(&id("x"), &uniform(0.6)));
        let available = pool.available();
        for v in available {
            assert!((v - 0.4).abs() < 1e-12);
        }
        assert!((pool.utilization() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn allocation_is_all_or_nothing() {
        let pool = ResourcePool::default();
        let a = CognitiveResources::new(0.9, 0.1, 0.1, 0.1).unwrap();
        let b = CognitiveResources::new(0.2, 0.1, 0.1, 0.1).unwrap();

        assert!(pool.allocate(&id("a"), &a));
        // Attention alone overflows: nothing is granted
        assert!(!pool.allocate(&id("b"), &b));
        assert!(pool.allocation(&id("b")).is_none());
        assert!((pool.committed()[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn exact_fit_is_granted() {
        let pool = ResourcePool::default();
        assert!(pool.allocate(&id("a"), &uniform(0.4)));
        assert!(pool.allocate(&id("b"), &uniform(0.6)));
        assert!((pool.utilization() - 1.0).abs() < 1e-9);
        assert!(!pool.can_allocate(&uniform(0.01)));
    }

    #[test]
    fn reallocation_excludes_own_grant() {
        let pool = ResourcePool::default();
        assert!(pool.allocate(&id("a"), &uniform(0.8)));
        // Re-granting the same demand replaces its grant instead of stacking
        assert!(pool.allocate(&id("a"), &uniform(0.9)));
        assert_eq!(pool.allocation(&id("a")), Some(uniform(0.9)));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let pool = ResourcePool::default();
        pool.allocate(&id("a"), &uniform(0.5));

        assert_eq!(pool.release(&id("a")), Some(uniform(0.5)));
        assert_eq!(pool.release(&id("a")), None);
        assert_eq!(pool.release(&id("never")), None);
        assert_eq!(pool.utilization(), 0.0);
    }

    #[test]
    fn can_allocate_does_not_commit() {
        let pool = ResourcePool::default();
        assert!(pool.can_allocate(&uniform(0.7)));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.utilization(), 0.0);
    }

    #[test]
    fn needs_beyond_capacity_never_fit() {
        let pool = ResourcePool::new(uniform(0.5));
        assert!(!pool.allocate(&id("big"), &uniform(0.6)));
        assert!(!pool.can_allocate(&uniform(0.6)));
    }

    #[test]
    fn zero_capacity_dimension_contributes_zero_utilization() {
        let capacity = CognitiveResources::new(1.0, 1.0, 1.0, 0.0).unwrap();
        let pool = ResourcePool::new(capacity);
        let needs = CognitiveResources::new(1.0, 1.0, 1.0, 0.0).unwrap();
        assert!(pool.allocate(&id("a"), &needs));
        assert!((pool.utilization() - 0.75).abs() < 1e-12);
        assert_eq!(pool.dimension_utilization(ResourceDimension::Time), 0.0);
    }

    #[test]
    fn snapshot_is_consistent() {
        let pool = ResourcePool::default();
        pool.allocate(&id("a"), &uniform(0.25));
        pool.allocate(&id("b"), &uniform(0.25));

        let snap = pool.snapshot();
        assert_eq!(snap.allocated.len(), 2);
        assert!((snap.utilization - 0.5).abs() < 1e-12);
    }

    #[test]
    fn release_all_clears_grants() {
        let pool = ResourcePool::default();
        pool.allocate(&id("a"), &uniform(0.25));
        pool.allocate(&id("b"), &uniform(0.25));
        assert_eq!(pool.release_all(), 2);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn concurrent_grants_respect_capacity() {
        let pool = Arc::new(ResourcePool::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let demand = id(&format!("t{t}-{i}"));
                        if pool.allocate(&demand, &uniform(0.15)) && i % 2 == 0 {
                            pool.release(&demand);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        for committed in pool.committed() {
            assert!(committed <= 1.0);
        }
    }

    #[test]
    fn full_pool_refuses_tiny_needs() {
        let pool = ResourcePool::default();
        assert!(pool.allocate(&id("a"), &CognitiveResources::full()));
        assert!(!pool.can_allocate(&uniform(5e-10)));
        assert!(!pool.allocate(&id("b"), &uniform(5e-10)));
        assert_eq!(pool.committed(), [1.0; ResourceDimension::COUNT]);
    }

    #[test]
    fn exact_fill_survives_release_in_any_order() {
        let pool = ResourcePool::default();
        assert!(pool.allocate(&id("c"), &uniform(0.7)));
        assert!(pool.allocate(&id("a"), &uniform(0.1)));
        assert!(pool.allocate(&id("b"), &uniform(0.2)));
        assert_eq!(pool.committed(), [1.0; ResourceDimension::COUNT]);
        assert!(!pool.can_allocate(&uniform(f64::EPSILON)));

        pool.release(&id("b"));
        for committed in pool.committed() {
            assert!(committed <= 1.0);
        }
        assert!(pool.allocate(&id("b"), &uniform(0.2)));
    }
}
