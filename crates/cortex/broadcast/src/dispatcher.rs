//! Broadcast Dispatcher: parallel, fault-isolated fan-out of events.
//!
//! Every eligible observer gets its own spawned task bounded by the
//! per-observer timeout. The dispatcher suspends once, on the whole set,
//! so a broadcast takes as long as its slowest observer (capped by the
//! timeout), not the sum of all of them.
//!
//! A task that exceeds its timeout is detached rather than aborted: it may
//! keep running, but its result is never merged into the feedback. A task
//! that panics is reported as error feedback like any other failure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cortex_types::{ConsumerFeedback, ContentType, Event, ObserverId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::BroadcastConfig;
use crate::error::{BroadcastError, BroadcastResult, ObserverError};
use crate::metrics::{BroadcastMetrics, BroadcastRecord, ObserverStats};
use crate::observers::Observer;

/// Dispatches ignited events to registered observers.
pub struct BroadcastDispatcher {
    config: BroadcastConfig,
    timeout: Duration,
    observers: DashMap<ObserverId, Arc<dyn Observer>>,
    metrics: RwLock<BroadcastMetrics>,
    sequence: AtomicU64,
}

impl BroadcastDispatcher {
    /// Create a dispatcher, validating the configuration.
    pub fn new(config: BroadcastConfig) -> BroadcastResult<Self> {
        let timeout = config.per_observer_timeout()?;
        let metrics = BroadcastMetrics::new(config.max_history);
        Ok(Self {
            config,
            timeout,
            observers: DashMap::new(),
            metrics: RwLock::new(metrics),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Register an observer.
    pub fn register(&self, observer: Arc<dyn Observer>) -> BroadcastResult<()> {
        let id = observer.id().clone();
        match self.observers.entry(id.clone()) {
            Entry::Occupied(_) => {
                Err(BroadcastError::ObserverAlreadyRegistered(id))
            }
            Entry::Vacant(slot) => {
                info!(observer = %id, kind = %observer.kind(), "Observer registered");
                slot.insert(observer);
                Ok(())
            }
        }
    }

    /// Remove an observer. Broadcasts already in flight still complete for it.
    pub fn unregister(&self, observer_id: &ObserverId) -> BroadcastResult<Arc<dyn Observer>> {
        let (_, observer) = self
            .observers
            .remove(observer_id)
            .ok_or_else(|| BroadcastError::ObserverNotFound(observer_id.clone()))?;
        info!(observer = %observer_id, "Observer unregistered");
        Ok(observer)
    }

    /// Registered observer ids, sorted.
    pub fn observer_ids(&self) -> Vec<ObserverId> {
        let mut ids: Vec<ObserverId> = self.observers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Build, validate and dispatch an event; wait for every eligible observer.
    ///
    /// Fails only when the event itself is invalid. Observer failures and
    /// timeouts come back as error feedback.
    #[instrument(skip_all, fields(content_type = %content_type, ignition = ignition_strength))]
    pub async fn broadcast(
        &self,
        content_type: ContentType,
        payload: serde_json::Value,
        source: impl Into<String> + Send,
        ignition_strength: f64,
        metadata: HashMap<String, String>,
    ) -> BroadcastResult<(Event, Vec<ConsumerFeedback>)> {
        let event = Event::new(content_type, payload, source, ignition_strength)?.with_metadata(metadata);
        Ok(self.publish(event).await)
    }

    /// Dispatch an already constructed event.
    pub async fn publish(&self, event: Event) -> (Event, Vec<ConsumerFeedback>) {
        let sequence = self.next_sequence();
        self.dispatch(sequence, event).await
    }

    /// Validate synchronously, then dispatch in the background.
    ///
    /// Feedback is not returned to the caller but is still recorded.
    pub fn broadcast_detached(
        self: &Arc<Self>,
        content_type: ContentType,
        payload: serde_json::Value,
        source: impl Into<String>,
        ignition_strength: f64,
        metadata: HashMap<String, String>,
    ) -> BroadcastResult<Event> {
        let event = Event::new(content_type, payload, source, ignition_strength)?.with_metadata(metadata);
        let sequence = self.next_sequence();
        let dispatcher = Arc::clone(self);
        let detached = event.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(sequence, detached).await;
        });
        debug!(event_id = %event.id(), sequence, "Broadcast detached");
        Ok(event)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id()))]
    async fn dispatch(&self, sequence: u64, event: Event) -> (Event, Vec<ConsumerFeedback>) {
        let event = Arc::new(event);
        let eligible: Vec<Arc<dyn Observer>> = self
            .observers
            .iter()
            .filter(|entry| entry.value().accepts(&event))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        debug!(
            eligible = eligible.len(),
            registered = self.observers.len(),
            ignition = event.ignition_strength(),
            "Dispatching broadcast"
        );

        let started = Instant::now();
        let feedback = join_all(
            eligible
                .into_iter()
                .map(|observer| deliver(observer, Arc::clone(&event), self.timeout)),
        )
        .await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let event = Arc::unwrap_or_clone(event);
        let failures = feedback.iter().filter(|f| !f.is_success()).count();
        info!(
            sequence,
            observers = feedback.len(),
            failures,
            elapsed_ms,
            "Broadcast complete"
        );

        self.metrics.write().record(BroadcastRecord {
            sequence,
            event: event.clone(),
            feedback: feedback.clone(),
            elapsed_ms,
        });

        (event, feedback)
    }

    /// Retained broadcasts in submission order.
    pub fn history(&self) -> Vec<BroadcastRecord> {
        self.metrics.read().history().history().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.metrics.read().history().len()
    }

    /// Copy of the current metrics.
    pub fn metrics(&self) -> BroadcastMetrics {
        self.metrics.read().clone()
    }

    pub fn total_broadcasts(&self) -> u64 {
        self.metrics.read().total_broadcasts()
    }

    pub fn observer_stats(&self, observer_id: &ObserverId) -> Option<ObserverStats> {
        self.metrics.read().observer_stats(observer_id)
    }

    pub fn success_rate(&self, observer_id: &ObserverId) -> Option<f64> {
        self.metrics.read().success_rate(observer_id)
    }
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        let config = BroadcastConfig::default();
        let timeout = config.per_observer_timeout().unwrap_or(Duration::from_millis(100));
        let metrics = BroadcastMetrics::new(config.max_history);
        Self {
            config,
            timeout,
            observers: DashMap::new(),
            metrics: RwLock::new(metrics),
            sequence: AtomicU64::new(0),
        }
    }
}

/// Run one observer's unit of work and turn its outcome into feedback.
async fn deliver(observer: Arc<dyn Observer>, event: Arc<Event>, timeout: Duration) -> ConsumerFeedback {
    let observer_id = observer.id().clone();
    let event_id = event.id().clone();
    let started = Instant::now();

    let task = tokio::spawn(async move { observer.receive_broadcast(&event).await });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(actions))) => {
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            debug!(observer = %observer_id, actions = actions.len(), elapsed_ms = ms, "Observer processed event");
            ConsumerFeedback::processed(observer_id, event_id, actions, ms)
        }
        Ok(Ok(Err(e))) => {
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            warn!(observer = %observer_id, error = %e, "Observer failed");
            ConsumerFeedback::failed(observer_id, event_id, e.to_string(), ms)
        }
        Ok(Err(join_error)) => {
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            let e = ObserverError::Panicked(join_error.to_string());
            warn!(observer = %observer_id, error = %e, "Observer task aborted");
            ConsumerFeedback::failed(observer_id, event_id, e.to_string(), ms)
        }
        // The JoinHandle is dropped here; the task runs on detached and its
        // result is discarded.
        Err(_) => {
            let ms = timeout.as_secs_f64() * 1000.0;
            warn!(observer = %observer_id, timeout_ms = ms, "Observer timed out");
            ConsumerFeedback::timed_out(observer_id, event_id, ms)
        }
    }
}
