//! Property tests: the pool never over-commits and arbitration is reproducible.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cortex_arbitration::{CompetitionConfig, CompetitionEngine, ResourcePool};
use cortex_types::{CognitiveResources, Demand, DemandId};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum PoolOp {
    Allocate(usize, CognitiveResources),
    Release(usize),
}

fn arb_resources() -> impl Strategy<Value = CognitiveResources> {
    (0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64)
        .prop_map(|(a, p, ac, t)| CognitiveResources::new(a, p, ac, t).unwrap())
}

fn arb_pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => (0usize..8, arb_resources()).prop_map(|(i, r)| PoolOp::Allocate(i, r)),
        1 => (0usize..8).prop_map(PoolOp::Release),
    ]
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Demands `d0..dN` with random scalars, needs and relationships.
fn arb_demands() -> impl Strategy<Value = Vec<Demand>> {
    prop::collection::vec(
        (
            0.0..=1.0f64,
            0.0..=1.0f64,
            arb_resources(),
            prop::option::of(1i64..600),
            prop::collection::vec(0usize..6, 0..3),
            prop::collection::vec(0usize..6, 0..3),
        ),
        0..6,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (importance, progress, needs, deadline, conflicts, facilitates))| {
                let mut builder = Demand::builder(format!("d{i}"))
                    .importance(importance)
                    .progress(progress)
                    .needs(needs)
                    .created_at(base_time());
                if let Some(secs) = deadline {
                    builder = builder.deadline(base_time() + Duration::seconds(secs));
                }
                for j in conflicts.into_iter().filter(|j| *j != i) {
                    builder = builder.conflicts_with(format!("d{j}"));
                }
                for j in facilitates.into_iter().filter(|j| *j != i) {
                    builder = builder.facilitates(format!("d{j}"));
                }
                builder.build().unwrap()
            })
            .collect()
    })
}

fn assert_within_capacity(pool: &ResourcePool) {
    let capacity = pool.capacity().to_array();
    for (d, committed) in pool.committed().iter().enumerate() {
        assert!(
            *committed <= capacity[d],
            "dimension {d} over-committed: {committed} > {}",
            capacity[d]
        );
    }
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Any sequence of allocate/release calls keeps every dimension within capacity.
    #[test]
    fn pool_never_exceeds_capacity(
        capacity in arb_resources(),
        ops in prop::collection::vec(arb_pool_op(), 1..64),
    ) {
        let pool = ResourcePool::new(capacity);
        for op in ops {
            match op {
                PoolOp::Allocate(i, needs) => {
                    let id = DemandId::new(format!("d{i}"));
                    let predicted = pool.can_allocate(&needs) || pool.is_allocated(&id);
                    let granted = pool.allocate(&id, &needs);
                    if granted {
                        prop_assert_eq!(pool.allocation(&id), Some(needs));
                    } else {
                        prop_assert!(!pool.can_allocate(&needs));
                    }
                    // A fresh demand is granted exactly when can_allocate said so
                    if !predicted {
                        prop_assert!(!granted);
                    }
                }
                PoolOp::Release(i) => {
                    let id = DemandId::new(format!("d{i}"));
                    pool.release(&id);
                    prop_assert!(!pool.is_allocated(&id));
                }
            }
            assert_within_capacity(&pool);
            let u = pool.utilization();
            prop_assert!((0.0..=1.0).contains(&u));
        }
    }

    /// Repeated runs over the same set produce identical activations and selections.
    #[test]
    fn arbitration_is_deterministic(demands in arb_demands()) {
        let now = base_time() + Duration::seconds(120);
        let engine = CompetitionEngine::new(CompetitionConfig::default()).unwrap();

        let first = engine.compete_at(&demands, now).unwrap();
        let first_pool = ResourcePool::default();
        let first_sel = engine.select_active(&demands, &first, &first_pool);

        let fresh = CompetitionEngine::new(CompetitionConfig::default()).unwrap();
        let mut shuffled = demands.clone();
        shuffled.reverse();
        let second = fresh.compete_at(&shuffled, now).unwrap();
        let second_pool = ResourcePool::default();
        let second_sel = fresh.select_active(&shuffled, &second, &second_pool);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first_sel.active_ids(), second_sel.active_ids());
        prop_assert_eq!(first_sel.waiting_ids(), second_sel.waiting_ids());
        prop_assert_eq!(first_pool.snapshot().allocated, second_pool.snapshot().allocated);
    }

    /// Every activation lies in [0, 1] and every demand is either active or waiting.
    #[test]
    fn selection_partitions_demands(demands in arb_demands()) {
        let engine = CompetitionEngine::with_defaults();
        let pool = ResourcePool::default();
        let activation = engine.compete_at(&demands, base_time()).unwrap();
        for (_, a) in activation.iter() {
            prop_assert!((0.0..=1.0).contains(&a));
        }

        let selection = engine.select_active(&demands, &activation, &pool);
        prop_assert_eq!(selection.active.len() + selection.waiting.len(), demands.len());
        prop_assert_eq!(pool.active_count(), selection.active.len());
        assert_within_capacity(&pool);

        // Active demands appear in non-increasing activation order
        for pair in selection.active.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
        }
    }
}
