//! Working-memory observer.
//!
//! Keeps a bounded trace of the most recent broadcasts. Strong ignitions
//! are flagged for consolidation into long-term storage, which lives
//! outside this core.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cortex_types::{ContentType, Event, EventId, ObserverId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::debug;

use super::{Observer, ObserverKind};
use crate::error::ObserverResult;
use crate::filter::Subscription;

/// Default working-memory span.
const DEFAULT_CAPACITY: usize = 7;

/// Ignition at or above which a trace is marked for consolidation.
const DEFAULT_CONSOLIDATION_THRESHOLD: f64 = 0.8;

/// One retained broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryTrace {
    pub event_id: EventId,
    pub content_type: ContentType,
    pub source: String,
    pub ignition_strength: f64,
    pub consolidate: bool,
    pub stored_at: DateTime<Utc>,
}

/// Observer maintaining a bounded working-memory buffer.
pub struct MemoryObserver {
    id: ObserverId,
    subscription: RwLock<Subscription>,
    traces: Mutex<VecDeque<MemoryTrace>>,
    capacity: usize,
    consolidation_threshold: f64,
}

impl MemoryObserver {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        let id = ObserverId::new(id);
        Self {
            subscription: RwLock::new(Subscription::all(id.clone())),
            id,
            traces: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            consolidation_threshold: DEFAULT_CONSOLIDATION_THRESHOLD,
        }
    }

    /// Replace the subscription. The observer id is kept.
    pub fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write() = Subscription {
            observer_id: self.id.clone(),
            ..subscription
        };
    }

    /// Retained traces, oldest first.
    pub fn traces(&self) -> Vec<MemoryTrace> {
        self.traces.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.lock().is_empty()
    }
}

#[async_trait]
impl Observer for MemoryObserver {
    fn id(&self) -> &ObserverId {
        &self.id
    }

    fn kind(&self) -> ObserverKind {
        ObserverKind::Memory
    }

    fn subscription(&self) -> Subscription {
        self.subscription.read().clone()
    }

    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>> {
        let consolidate = event.ignition_strength() >= self.consolidation_threshold;
        let trace = MemoryTrace {
            event_id: event.id().clone(),
            content_type: event.content_type(),
            source: event.source().to_string(),
            ignition_strength: event.ignition_strength(),
            consolidate,
            stored_at: Utc::now(),
        };

        let mut actions = vec![format!("memory.store:{}", event.content_type())];

        let mut traces = self.traces.lock();
        traces.push_back(trace);
        while traces.len() > self.capacity {
            if let Some(evicted) = traces.pop_front() {
                debug!(observer = %self.id, evicted = %evicted.event_id, "Working memory trace evicted");
                actions.push("memory.evict".to_string());
            }
        }
        if consolidate {
            actions.push("memory.consolidate".to_string());
        }

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(ignition: f64) -> Event {
        Event::new(ContentType::Percept, json!({"seen": "cup"}), "vision", ignition).unwrap()
    }

    #[tokio::test]
    async fn stores_and_evicts_oldest() {
        let observer = MemoryObserver::with_capacity("memory", 2);
        let first = event(0.3);
        observer.receive_broadcast(&first).await.unwrap();
        observer.receive_broadcast(&event(0.3)).await.unwrap();
        let actions = observer.receive_broadcast(&event(0.3)).await.unwrap();

        assert_eq!(actions, vec!["memory.store:percept", "memory.evict"]);
        assert_eq!(observer.len(), 2);
        assert!(observer.traces().iter().all(|t| t.event_id != *first.id()));
    }

    #[tokio::test]
    async fn strong_ignition_is_consolidated() {
        let observer = MemoryObserver::new("memory");
        let actions = observer.receive_broadcast(&event(0.9)).await.unwrap();
        assert!(actions.contains(&"memory.consolidate".to_string()));
        assert!(observer.traces()[0].consolidate);
    }

    #[test]
    fn set_subscription_keeps_id() {
        let observer = MemoryObserver::new("memory");
        observer.set_subscription(
            Subscription::all(ObserverId::new("other")).with_content_types([ContentType::Memory]),
        );
        let sub = observer.subscription();
        assert_eq!(sub.observer_id, ObserverId::new("memory"));
        assert!(!observer.accepts(&event(0.5)));
    }
}
