//! Demand Ledger: lifecycle bookkeeping across arbitration rounds.
//!
//! Demands enter as `Waiting`, move between `Waiting` and `Active` as
//! selection grants or drops them, and leave through `Completed` or
//! `Cancelled`. Terminal demands no longer compete and hold no grant.

use std::collections::BTreeMap;

use cortex_types::{Demand, DemandId, DemandState};
use serde::Serialize;
use tracing::{debug, info};

use crate::competition::Selection;
use crate::error::{ArbitrationError, ArbitrationResult};
use crate::pool::ResourcePool;

#[derive(Debug, Clone, Serialize)]
struct LedgerEntry {
    demand: Demand,
    state: DemandState,
}

/// Registry of submitted demands and their lifecycle state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DemandLedger {
    entries: BTreeMap<DemandId, LedgerEntry>,
}

impl DemandLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new demand in the `Waiting` state.
    pub fn submit(&mut self, demand: Demand) -> ArbitrationResult<()> {
        if self.entries.contains_key(demand.id()) {
            return Err(ArbitrationError::DuplicateDemand(demand.id().clone()));
        }
        debug!(demand = %demand.id(), importance = demand.importance(), "Demand submitted");
        self.entries.insert(
            demand.id().clone(),
            LedgerEntry {
                demand,
                state: DemandState::Waiting,
            },
        );
        Ok(())
    }

    /// Replace a live demand's record, e.g. after progress changed.
    pub fn update(&mut self, demand: Demand) -> ArbitrationResult<()> {
        let entry = self
            .entries
            .get_mut(demand.id())
            .ok_or_else(|| ArbitrationError::DemandNotFound(demand.id().clone()))?;
        if entry.state.is_terminal() {
            return Err(ArbitrationError::InvalidTransition {
                demand: demand.id().clone(),
                from: entry.state,
                to: entry.state,
            });
        }
        entry.demand = demand;
        Ok(())
    }

    pub fn get(&self, id: &DemandId) -> Option<&Demand> {
        self.entries.get(id).map(|e| &e.demand)
    }

    pub fn state(&self, id: &DemandId) -> Option<DemandState> {
        self.entries.get(id).map(|e| e.state)
    }

    /// Move a demand to `next`, enforcing the lifecycle.
    pub fn transition(&mut self, id: &DemandId, next: DemandState) -> ArbitrationResult<DemandState> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ArbitrationError::DemandNotFound(id.clone()))?;

        let from = entry.state;
        if !from.can_transition_to(next) {
            return Err(ArbitrationError::InvalidTransition {
                demand: id.clone(),
                from,
                to: next,
            });
        }

        entry.state = next;
        if from != next {
            debug!(demand = %id, %from, to = %next, "Demand state changed");
        }
        Ok(from)
    }

    /// Demands still competing (`Waiting` or `Active`), in id order.
    pub fn live_demands(&self) -> Vec<Demand> {
        self.entries
            .values()
            .filter(|e| !e.state.is_terminal())
            .map(|e| e.demand.clone())
            .collect()
    }

    pub fn ids_in(&self, state: DemandState) -> Vec<DemandId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn active_ids(&self) -> Vec<DemandId> {
        self.ids_in(DemandState::Active)
    }

    pub fn waiting_ids(&self) -> Vec<DemandId> {
        self.ids_in(DemandState::Waiting)
    }

    /// Release the grants of every active demand ahead of a new round.
    ///
    /// States are left untouched; the next [`apply_selection`] decides who
    /// stays active.
    ///
    /// [`apply_selection`]: DemandLedger::apply_selection
    pub fn release_active(&self, pool: &ResourcePool) -> usize {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == DemandState::Active)
            .filter(|(id, _)| pool.release(id).is_some())
            .count()
    }

    /// Apply a selection's outcome: granted demands become `Active`,
    /// refused ones `Waiting`. Demands unknown to the ledger are ignored.
    pub fn apply_selection(&mut self, selection: &Selection) -> ArbitrationResult<()> {
        for (demand, _) in &selection.active {
            if self.entries.contains_key(demand.id()) {
                self.transition(demand.id(), DemandState::Active)?;
            }
        }
        for demand in &selection.waiting {
            if self.entries.contains_key(demand.id()) {
                self.transition(demand.id(), DemandState::Waiting)?;
            }
        }
        Ok(())
    }

    /// Mark a demand completed and release its grant.
    pub fn complete(&mut self, id: &DemandId, pool: &ResourcePool) -> ArbitrationResult<()> {
        self.finish(id, DemandState::Completed, pool)
    }

    /// Mark a demand cancelled and release its grant.
    pub fn cancel(&mut self, id: &DemandId, pool: &ResourcePool) -> ArbitrationResult<()> {
        self.finish(id, DemandState::Cancelled, pool)
    }

    fn finish(&mut self, id: &DemandId, terminal: DemandState, pool: &ResourcePool) -> ArbitrationResult<()> {
        let from = self.transition(id, terminal)?;
        let released = pool.release(id);
        info!(
            demand = %id,
            %from,
            to = %terminal,
            released = released.is_some(),
            "Demand finished"
        );
        Ok(())
    }

    /// Drop terminal entries. Returns the removed ids.
    pub fn prune_terminal(&mut self) -> Vec<DemandId> {
        let terminal: Vec<DemandId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.state.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &terminal {
            self.entries.remove(id);
        }
        terminal
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_types::CognitiveResources;

    fn demand(id: &str, needs: f64) -> Demand {
        Demand::builder(id)
            .needs(CognitiveResources::uniform(needs).unwrap())
            .build()
            .unwrap()
    }

    fn id(s: &str) -> DemandId {
        DemandId::new(s)
    }

    #[test]
    fn submit_starts_waiting() {
        let mut ledger = DemandLedger::new();
        ledger.submit(demand("a", 0.1)).unwrap();
        assert_eq!(ledger.state(&id("a")), Some(DemandState::Waiting));
        assert!(matches!(
            ledger.submit(demand("a", 0.2)),
            Err(ArbitrationError::DuplicateDemand(_))
        ));
    }

    #[test]
    fn selection_moves_states() {
        let mut ledger = DemandLedger::new();
        ledger.submit(demand("a", 0.1)).unwrap();
        ledger.submit(demand("b", 0.1)).unwrap();

        let selection = Selection {
            active: vec![(demand("a", 0.1), 0.8)],
            waiting: vec![demand("b", 0.1)],
        };
        ledger.apply_selection(&selection).unwrap();
        assert_eq!(ledger.active_ids(), vec![id("a")]);
        assert_eq!(ledger.waiting_ids(), vec![id("b")]);

        let flipped = Selection {
            active: vec![(demand("b", 0.1), 0.8)],
            waiting: vec![demand("a", 0.1)],
        };
        ledger.apply_selection(&flipped).unwrap();
        assert_eq!(ledger.active_ids(), vec![id("b")]);
    }

    #[test]
    fn complete_releases_grant() {
        let mut ledger = DemandLedger::new();
        let pool = ResourcePool::default();
        ledger.submit(demand("a", 0.4)).unwrap();
        pool.allocate(&id("a"), &CognitiveResources::uniform(0.4).unwrap());
        ledger.transition(&id("a"), DemandState::Active).unwrap();

        ledger.complete(&id("a"), &pool).unwrap();
        assert_eq!(ledger.state(&id("a")), Some(DemandState::Completed));
        assert!(!pool.is_allocated(&id("a")));
        assert!(ledger.live_demands().is_empty());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut ledger = DemandLedger::new();
        let pool = ResourcePool::default();
        ledger.submit(demand("a", 0.1)).unwrap();
        ledger.cancel(&id("a"), &pool).unwrap();

        assert!(matches!(
            ledger.transition(&id("a"), DemandState::Active),
            Err(ArbitrationError::InvalidTransition { .. })
        ));
        assert!(ledger.complete(&id("a"), &pool).is_err());
        assert!(ledger.update(demand("a", 0.2)).is_err());
    }

    #[test]
    fn unknown_demand_is_reported() {
        let mut ledger = DemandLedger::new();
        let pool = ResourcePool::default();
        assert!(matches!(
            ledger.complete(&id("ghost"), &pool),
            Err(ArbitrationError::DemandNotFound(_))
        ));
    }

    #[test]
    fn release_active_frees_pool_but_keeps_state() {
        let mut ledger = DemandLedger::new();
        let pool = ResourcePool::default();
        ledger.submit(demand("a", 0.3)).unwrap();
        ledger.submit(demand("b", 0.3)).unwrap();
        pool.allocate(&id("a"), &CognitiveResources::uniform(0.3).unwrap());
        ledger.transition(&id("a"), DemandState::Active).unwrap();

        assert_eq!(ledger.release_active(&pool), 1);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(ledger.state(&id("a")), Some(DemandState::Active));
    }

    #[test]
    fn prune_removes_terminal_only() {
        let mut ledger = DemandLedger::new();
        let pool = ResourcePool::default();
        ledger.submit(demand("a", 0.1)).unwrap();
        ledger.submit(demand("b", 0.1)).unwrap();
        ledger.complete(&id("a"), &pool).unwrap();

        assert_eq!(ledger.prune_terminal(), vec![id("a")]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(&id("b")).is_some());
    }
}
