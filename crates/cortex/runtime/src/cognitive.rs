//! Cognitive Core: explicit composition of the broadcast and arbitration
//! pipelines.
//!
//! One instance is built at process start and handed to collaborators by
//! reference. It owns the dispatcher, the resource pool, the demand ledger
//! and the competition history; [`CognitiveCore::shutdown`] tears them down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cortex_arbitration::{
    CompetitionEngine, CompetitionSnapshot, CompetitionTracker, DemandLedger, ResourcePool, Selection,
};
use cortex_broadcast::{
    ActionObserver, AffectObserver, AttentionObserver, BroadcastDispatcher, BroadcastMetrics,
    MemoryObserver, MetaCognitionObserver, Observer,
};
use cortex_types::{ConsumerFeedback, ContentType, Demand, DemandId, DemandState, Event, ObserverId};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::config::CortexConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Composition root of the broadcast and arbitration subsystems.
pub struct CognitiveCore {
    config: CortexConfig,
    dispatcher: Arc<BroadcastDispatcher>,
    engine: CompetitionEngine,
    pool: Arc<ResourcePool>,
    ledger: Mutex<DemandLedger>,
    tracker: Mutex<CompetitionTracker>,
    running: AtomicBool,
}

impl CognitiveCore {
    /// Build a core from validated configuration. No observers are registered.
    pub fn new(config: CortexConfig) -> RuntimeResult<Self> {
        config.validate()?;

        let dispatcher = Arc::new(BroadcastDispatcher::new(config.broadcast.clone())?);
        let engine = CompetitionEngine::new(config.competition.clone())?;
        let pool = Arc::new(ResourcePool::new(config.pool.capacity));
        let tracker = CompetitionTracker::from_config(&config.competition);

        info!(
            timeout_secs = config.broadcast.per_observer_timeout_secs,
            iterations = config.competition.iterations,
            inhibition = config.competition.inhibition_strength,
            "Cognitive core initialized"
        );

        Ok(Self {
            config,
            dispatcher,
            engine,
            pool,
            ledger: Mutex::new(DemandLedger::new()),
            tracker: Mutex::new(tracker),
            running: AtomicBool::new(true),
        })
    }

    /// Build a core with the memory, attention, action, affect and
    /// meta-cognition observers registered.
    pub fn with_default_observers(config: CortexConfig) -> RuntimeResult<Self> {
        let core = Self::new(config)?;
        let observers: [Arc<dyn Observer>; 5] = [
            Arc::new(MemoryObserver::new("memory")),
            Arc::new(AttentionObserver::new("attention")),
            Arc::new(ActionObserver::new("action")),
            Arc::new(AffectObserver::new("affect")),
            Arc::new(MetaCognitionObserver::new("meta_cognition")),
        ];
        for observer in observers {
            core.dispatcher.register(observer)?;
        }
        Ok(core)
    }

    pub fn config(&self) -> &CortexConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<BroadcastDispatcher> {
        &self.dispatcher
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn engine(&self) -> &CompetitionEngine {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> RuntimeResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(RuntimeError::ShutDown)
        }
    }

    // ------------------------------------------------------------------
    // Broadcast
    // ------------------------------------------------------------------

    pub fn register_observer(&self, observer: Arc<dyn Observer>) -> RuntimeResult<()> {
        self.dispatcher.register(observer)?;
        Ok(())
    }

    pub fn unregister_observer(&self, observer_id: &ObserverId) -> RuntimeResult<()> {
        self.dispatcher.unregister(observer_id)?;
        Ok(())
    }

    /// Publish content to every eligible observer and wait for their feedback.
    pub async fn publish(
        &self,
        content_type: ContentType,
        payload: serde_json::Value,
        source: impl Into<String> + Send,
        ignition_strength: f64,
        metadata: HashMap<String, String>,
    ) -> RuntimeResult<(Event, Vec<ConsumerFeedback>)> {
        self.ensure_running()?;
        Ok(self
            .dispatcher
            .broadcast(content_type, payload, source, ignition_strength, metadata)
            .await?)
    }

    /// Publish without waiting for feedback; it is still recorded.
    pub fn publish_detached(
        &self,
        content_type: ContentType,
        payload: serde_json::Value,
        source: impl Into<String>,
        ignition_strength: f64,
        metadata: HashMap<String, String>,
    ) -> RuntimeResult<Event> {
        self.ensure_running()?;
        Ok(self
            .dispatcher
            .broadcast_detached(content_type, payload, source, ignition_strength, metadata)?)
    }

    pub fn broadcast_metrics(&self) -> BroadcastMetrics {
        self.dispatcher.metrics()
    }

    // ------------------------------------------------------------------
    // Arbitration
    // ------------------------------------------------------------------

    /// Add a demand to the competition. It starts out waiting.
    pub fn submit_demand(&self, demand: Demand) -> RuntimeResult<()> {
        self.ensure_running()?;
        self.ledger.lock().submit(demand)?;
        Ok(())
    }

    /// Replace a live demand, e.g. after its progress changed.
    pub fn update_demand(&self, demand: Demand) -> RuntimeResult<()> {
        self.ensure_running()?;
        self.ledger.lock().update(demand)?;
        self.engine.analyzer().invalidate();
        Ok(())
    }

    /// Mark a demand completed and release its resources.
    pub fn complete_demand(&self, id: &DemandId) -> RuntimeResult<()> {
        self.ledger.lock().complete(id, &self.pool)?;
        self.tracker.lock().forget(id);
        Ok(())
    }

    /// Mark a demand cancelled and release its resources.
    pub fn cancel_demand(&self, id: &DemandId) -> RuntimeResult<()> {
        self.ledger.lock().cancel(id, &self.pool)?;
        self.tracker.lock().forget(id);
        Ok(())
    }

    pub fn demand_state(&self, id: &DemandId) -> Option<DemandState> {
        self.ledger.lock().state(id)
    }

    /// Run one arbitration round over every live demand.
    pub fn arbitrate(&self) -> RuntimeResult<Selection> {
        self.arbitrate_at(Utc::now())
    }

    /// Run one arbitration round with urgency evaluated at `now`.
    ///
    /// Grants held by live demands from the previous round are released
    /// first, so every live demand competes for the full pool again.
    #[instrument(skip(self))]
    pub fn arbitrate_at(&self, now: DateTime<Utc>) -> RuntimeResult<Selection> {
        self.ensure_running()?;

        let mut ledger = self.ledger.lock();
        let released = ledger.release_active(&self.pool);
        let demands = ledger.live_demands();

        let activation = self.engine.compete_at(&demands, now)?;
        let selection = self.engine.select_active(&demands, &activation, &self.pool);
        ledger.apply_selection(&selection)?;
        drop(ledger);

        let top = activation.top().map(|(id, _)| id);
        let utilization = self.pool.utilization();
        let mut tracker = self.tracker.lock();
        tracker.record_round(&selection, top, utilization);
        tracker.track_top_change(top);

        info!(
            released,
            active = selection.active.len(),
            waiting = selection.waiting.len(),
            utilization,
            "Arbitration round complete"
        );

        Ok(selection)
    }

    pub fn utilization(&self) -> f64 {
        self.pool.utilization()
    }

    pub fn competition_history(&self) -> Vec<CompetitionSnapshot> {
        self.tracker.lock().history().history().cloned().collect()
    }

    pub fn goal_switches(&self) -> u64 {
        self.tracker.lock().goal_switches()
    }

    /// Demands waiting for at least `min_rounds` consecutive rounds.
    pub fn starved(&self, min_rounds: u64) -> Vec<(DemandId, u64)> {
        self.tracker.lock().starved(min_rounds)
    }

    pub fn is_resource_exhausted(&self) -> bool {
        self.tracker.lock().is_resource_exhausted()
    }

    /// Drop completed and cancelled demands from the ledger.
    pub fn prune_finished(&self) -> Vec<DemandId> {
        self.ledger.lock().prune_terminal()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stop accepting work and release every grant. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let released = self.pool.release_all();
        if released > 0 {
            warn!(released, "Released outstanding grants on shutdown");
        }
        info!(
            broadcasts = self.dispatcher.total_broadcasts(),
            goal_switches = self.goal_switches(),
            "Cognitive core shut down"
        );
    }
}
