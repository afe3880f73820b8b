//! Competition Engine: activation relaxation and winner-take-all selection.
//!
//! Relaxation is Jacobi-style: every update in round `t + 1` reads only the
//! full activation vector of round `t`. Demands are processed in id order
//! so summation order, and therefore every floating-point result, is
//! reproducible. The iteration count is fixed; there is no convergence
//! check.
//!
//! Selection walks demands by `(activation desc, id asc)` exactly once and
//! asks the pool for each in turn. There is no backtracking: a refused
//! demand stays waiting and later, lower-activation demands still get
//! their turn.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use cortex_types::{ActivationState, Demand, DemandId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::CompetitionConfig;
use crate::error::{ArbitrationError, ArbitrationResult};
use crate::interaction::InteractionAnalyzer;
use crate::pool::ResourcePool;

/// Outcome of one selection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    /// Granted demands with their activation, in selection order.
    pub active: Vec<(Demand, f64)>,
    /// Refused demands, in selection order.
    pub waiting: Vec<Demand>,
}

impl Selection {
    pub fn active_ids(&self) -> Vec<DemandId> {
        self.active.iter().map(|(d, _)| d.id().clone()).collect()
    }

    pub fn waiting_ids(&self) -> Vec<DemandId> {
        self.waiting.iter().map(|d| d.id().clone()).collect()
    }

    pub fn is_active(&self, id: &DemandId) -> bool {
        self.active.iter().any(|(d, _)| d.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.waiting.is_empty()
    }
}

/// Runs competition rounds over a demand set.
pub struct CompetitionEngine {
    config: CompetitionConfig,
    analyzer: InteractionAnalyzer,
}

impl CompetitionEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: CompetitionConfig) -> ArbitrationResult<Self> {
        config.validate()?;
        let analyzer = InteractionAnalyzer::new(config.interaction);
        Ok(Self { config, analyzer })
    }

    pub fn with_defaults() -> Self {
        let config = CompetitionConfig::default();
        let analyzer = InteractionAnalyzer::new(config.interaction);
        Self { config, analyzer }
    }

    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &InteractionAnalyzer {
        &self.analyzer
    }

    /// Urgency in `[0, 1]`: how much of the deadline window has elapsed.
    ///
    /// The window runs from the demand's creation to its deadline. Demands
    /// without a deadline get the configured default.
    pub fn urgency(&self, demand: &Demand, now: DateTime<Utc>) -> f64 {
        let Some(deadline) = demand.deadline() else {
            return self.config.default_urgency;
        };

        let window = (deadline - demand.created_at()).num_milliseconds() as f64;
        if window <= 0.0 {
            return 1.0;
        }
        let remaining = (deadline - now).num_milliseconds() as f64;
        (1.0 - remaining / window).clamp(0.0, 1.0)
    }

    /// Intrinsic drive of a demand before any lateral interaction.
    pub fn self_excitation(&self, demand: &Demand, now: DateTime<Utc>) -> f64 {
        let w = &self.config.excitation;
        let raw = w.importance * demand.importance()
            + w.urgency * self.urgency(demand, now)
            + w.incompleteness * (1.0 - demand.progress());
        raw.clamp(0.0, 1.0)
    }

    /// Relax activations with the configured parameters at the current time.
    pub fn compete(&self, demands: &[Demand]) -> ArbitrationResult<ActivationState> {
        self.compete_at(demands, Utc::now())
    }

    /// Relax activations with the configured parameters at `now`.
    pub fn compete_at(
        &self,
        demands: &[Demand],
        now: DateTime<Utc>,
    ) -> ArbitrationResult<ActivationState> {
        self.relax(
            demands,
            now,
            self.config.iterations,
            self.config.inhibition_strength,
        )
    }

    /// Run `iterations` Jacobi updates of
    /// `a_i ← clamp(self_i + inhibition · Σ_{j≠i} w_ij · a_j, 0, 1)`.
    pub fn relax(
        &self,
        demands: &[Demand],
        now: DateTime<Utc>,
        iterations: usize,
        inhibition_strength: f64,
    ) -> ArbitrationResult<ActivationState> {
        if demands.is_empty() {
            return Ok(ActivationState::new());
        }

        let mut seen = HashSet::with_capacity(demands.len());
        for d in demands {
            if !seen.insert(d.id()) {
                return Err(ArbitrationError::DuplicateDemand(d.id().clone()));
            }
        }

        let mut ordered: Vec<&Demand> = demands.iter().collect();
        ordered.sort_by(|a, b| a.id().cmp(b.id()));
        let n = ordered.len();

        let interactions = self.analyzer.compute_interactions(demands);
        let weights: Vec<Vec<f64>> = ordered
            .iter()
            .map(|a| {
                ordered
                    .iter()
                    .map(|b| interactions.strength(a.id(), b.id()))
                    .collect()
            })
            .collect();

        let excitation: Vec<f64> = ordered
            .iter()
            .map(|d| self.self_excitation(d, now))
            .collect();

        let mut current = excitation.clone();
        let mut next = vec![0.0; n];
        for _ in 0..iterations {
            for i in 0..n {
                let lateral: f64 = (0..n)
                    .filter(|j| *j != i)
                    .map(|j| weights[i][j] * current[j])
                    .sum();
                next[i] = (excitation[i] + inhibition_strength * lateral).clamp(0.0, 1.0);
            }
            std::mem::swap(&mut current, &mut next);
        }

        let state: ActivationState = ordered
            .iter()
            .zip(current)
            .map(|(d, a)| (d.id().clone(), a))
            .collect();

        debug!(
            demands = n,
            iterations,
            inhibition_strength,
            top = ?state.top().map(|(id, a)| (id.to_string(), a)),
            "Competition relaxed"
        );

        Ok(state)
    }

    /// Greedy single-pass resource-constrained selection.
    ///
    /// Never fails: refused demands, including ones whose needs exceed the
    /// pool's total capacity, are reported as waiting.
    pub fn select_active(
        &self,
        demands: &[Demand],
        activation: &ActivationState,
        pool: &ResourcePool,
    ) -> Selection {
        let mut ranked: Vec<(&Demand, f64)> =
            demands.iter().map(|d| (d, activation.get(d.id()))).collect();
        ranked.sort_by(|(da, a), (db, b)| b.total_cmp(a).then_with(|| da.id().cmp(db.id())));

        let mut selection = Selection::default();
        for (demand, a) in ranked {
            if pool.allocate(demand.id(), demand.resource_needs()) {
                selection.active.push((demand.clone(), a));
            } else {
                selection.waiting.push(demand.clone());
            }
        }

        info!(
            active = selection.active.len(),
            waiting = selection.waiting.len(),
            utilization = pool.utilization(),
            "Selection complete"
        );

        selection
    }
}

impl Default for CompetitionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
