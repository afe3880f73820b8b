//! Competition-side metrics: per-round snapshots, goal switches and
//! starvation/exhaustion diagnosis.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cortex_metrics::{MetricsTracker, Snapshot};
use cortex_types::DemandId;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::competition::Selection;
use crate::config::CompetitionConfig;

/// One arbitration round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionSnapshot {
    pub round: u64,
    pub active_count: usize,
    pub waiting_count: usize,
    pub utilization: f64,
    pub top_demand_id: Option<DemandId>,
    pub timestamp: DateTime<Utc>,
}

/// Numeric fields of [`CompetitionSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionField {
    ActiveCount,
    WaitingCount,
    Utilization,
}

impl Snapshot for CompetitionSnapshot {
    type Field = CompetitionField;

    fn value(&self, field: CompetitionField) -> f64 {
        match field {
            CompetitionField::ActiveCount => self.active_count as f64,
            CompetitionField::WaitingCount => self.waiting_count as f64,
            CompetitionField::Utilization => self.utilization,
        }
    }
}

/// Rolling competition history plus diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CompetitionTracker {
    history: MetricsTracker<CompetitionSnapshot>,
    rounds: u64,
    goal_switches: u64,
    last_top: Option<DemandId>,
    /// Consecutive rounds each demand has spent waiting.
    waiting_streaks: BTreeMap<DemandId, u64>,
    exhaustion_threshold: f64,
}

impl CompetitionTracker {
    pub fn new(max_history: usize, exhaustion_threshold: f64) -> Self {
        Self {
            history: MetricsTracker::new(max_history),
            rounds: 0,
            goal_switches: 0,
            last_top: None,
            waiting_streaks: BTreeMap::new(),
            exhaustion_threshold,
        }
    }

    pub fn from_config(config: &CompetitionConfig) -> Self {
        Self::new(config.max_history, config.exhaustion_threshold)
    }

    /// Record a snapshot for a finished selection and update waiting streaks.
    ///
    /// `top` is the highest-activation demand of the round, granted or not.
    pub fn record_round(
        &mut self,
        selection: &Selection,
        top: Option<&DemandId>,
        utilization: f64,
    ) -> CompetitionSnapshot {
        self.rounds += 1;

        for (demand, _) in &selection.active {
            self.waiting_streaks.remove(demand.id());
        }
        for demand in &selection.waiting {
            *self.waiting_streaks.entry(demand.id().clone()).or_insert(0) += 1;
        }

        let snapshot = CompetitionSnapshot {
            round: self.rounds,
            active_count: selection.active.len(),
            waiting_count: selection.waiting.len(),
            utilization,
            top_demand_id: top.cloned(),
            timestamp: Utc::now(),
        };

        debug!(
            round = snapshot.round,
            active = snapshot.active_count,
            waiting = snapshot.waiting_count,
            utilization,
            "Competition round recorded"
        );

        self.history.record(snapshot.clone());
        if self.is_resource_exhausted() {
            warn!(
                threshold = self.exhaustion_threshold,
                average_utilization = ?self.history.average(CompetitionField::Utilization),
                waiting = selection.waiting.len(),
                "Cognitive resources exhausted"
            );
        }

        snapshot
    }

    /// Count a goal switch when the top demand differs from the previous call's.
    ///
    /// The first observed top is not a switch. Returns whether a switch
    /// was counted.
    pub fn track_top_change(&mut self, top: Option<&DemandId>) -> bool {
        let switched = match (&self.last_top, top) {
            (Some(prev), Some(now)) => prev != now,
            _ => false,
        };

        if switched {
            self.goal_switches += 1;
            info!(
                from = ?self.last_top.as_ref().map(|id| id.to_string()),
                to = ?top.map(|id| id.to_string()),
                switches = self.goal_switches,
                "Goal switch"
            );
        }

        if let Some(id) = top {
            self.last_top = Some(id.clone());
        }
        switched
    }

    pub fn goal_switches(&self) -> u64 {
        self.goal_switches
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn last_top(&self) -> Option<&DemandId> {
        self.last_top.as_ref()
    }

    pub fn history(&self) -> &MetricsTracker<CompetitionSnapshot> {
        &self.history
    }

    pub fn average(&self, field: CompetitionField) -> Option<f64> {
        self.history.average(field)
    }

    /// Demands waiting for at least `min_rounds` consecutive rounds, in id order.
    pub fn starved(&self, min_rounds: u64) -> Vec<(DemandId, u64)> {
        self.waiting_streaks
            .iter()
            .filter(|(_, rounds)| **rounds >= min_rounds)
            .map(|(id, rounds)| (id.clone(), *rounds))
            .collect()
    }

    pub fn waiting_streak(&self, id: &DemandId) -> u64 {
        self.waiting_streaks.get(id).copied().unwrap_or(0)
    }

    /// Rolling mean utilization at or above the threshold while something waits.
    pub fn is_resource_exhausted(&self) -> bool {
        let waiting = self
            .history
            .latest()
            .map(|s| s.waiting_count > 0)
            .unwrap_or(false);
        let utilization = self
            .history
            .average(CompetitionField::Utilization)
            .unwrap_or(0.0);
        waiting && utilization >= self.exhaustion_threshold
    }

    /// Drop diagnostics for a demand that left the competition.
    pub fn forget(&mut self, id: &DemandId) {
        self.waiting_streaks.remove(id);
    }
}

impl Default for CompetitionTracker {
    fn default() -> Self {
        Self::from_config(&CompetitionConfig::default())
    }
}
