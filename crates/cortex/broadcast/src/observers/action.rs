//! Action observer: turns action and goal broadcasts into pending intentions.

use std::collections::VecDeque;

use async_trait::async_trait;
use cortex_types::{ContentType, Event, EventId, ObserverId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, warn};

use super::{Observer, ObserverKind};
use crate::error::{ObserverError, ObserverResult};
use crate::filter::Subscription;

const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// An intention queued for execution by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingIntention {
    pub event_id: EventId,
    pub content_type: ContentType,
    pub description: String,
    pub priority: f64,
}

/// Observer collecting intentions from action and goal broadcasts.
///
/// Refuses new intentions with [`ObserverError::Overloaded`] once its queue
/// is full; the host drains it with [`ActionObserver::drain`].
pub struct ActionObserver {
    id: ObserverId,
    subscription: RwLock<Subscription>,
    queue: Mutex<VecDeque<PendingIntention>>,
    capacity: usize,
}

impl ActionObserver {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        let id = ObserverId::new(id);
        let subscription =
            Subscription::all(id.clone()).with_content_types([ContentType::Action, ContentType::Goal]);
        Self {
            id,
            subscription: RwLock::new(subscription),
            queue: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write() = Subscription {
            observer_id: self.id.clone(),
            ..subscription
        };
    }

    pub fn pending(&self) -> Vec<PendingIntention> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Take every queued intention, highest priority first.
    pub fn drain(&self) -> Vec<PendingIntention> {
        let mut drained: Vec<_> = self.queue.lock().drain(..).collect();
        drained.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        drained
    }
}

fn describe(event: &Event) -> String {
    ["action", "goal", "description"]
        .iter()
        .find_map(|key| event.payload().get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} from {}", event.content_type(), event.source()))
}

#[async_trait]
impl Observer for ActionObserver {
    fn id(&self) -> &ObserverId {
        &self.id
    }

    fn kind(&self) -> ObserverKind {
        ObserverKind::Action
    }

    fn subscription(&self) -> Subscription {
        self.subscription.read().clone()
    }

    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            warn!(observer = %self.id, capacity = self.capacity, "Intention queue full");
            return Err(ObserverError::Overloaded {
                capacity: self.capacity,
            });
        }

        let intention = PendingIntention {
            event_id: event.id().clone(),
            content_type: event.content_type(),
            description: describe(event),
            priority: event.ignition_strength(),
        };
        debug!(observer = %self.id, description = %intention.description, "Intention queued");
        queue.push_back(intention);

        Ok(vec![format!("action.enqueue:{}", event.content_type())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn queues_described_intentions() {
        let observer = ActionObserver::new("action");
        let event = Event::new(ContentType::Action, json!({"action": "grasp cup"}), "planner", 0.7).unwrap();

        let actions = observer.receive_broadcast(&event).await.unwrap();
        assert_eq!(actions, vec!["action.enqueue:action"]);
        assert_eq!(observer.pending()[0].description, "grasp cup");
    }

    #[tokio::test]
    async fn full_queue_is_overloaded() {
        let observer = ActionObserver::with_capacity("action", 1);
        let event = Event::new(ContentType::Goal, json!({}), "planner", 0.5).unwrap();

        observer.receive_broadcast(&event).await.unwrap();
        let err = observer.receive_broadcast(&event).await.unwrap_err();
        assert_eq!(err, ObserverError::Overloaded { capacity: 1 });
        assert_eq!(observer.pending()[0].description, "goal from planner");
    }

    #[tokio::test]
    async fn drain_orders_by_priority() {
        let observer = ActionObserver::new("action");
        for ignition in [0.2, 0.9, 0.5] {
            let event = Event::new(ContentType::Action, json!({}), "planner", ignition).unwrap();
            observer.receive_broadcast(&event).await.unwrap();
        }
        let priorities: Vec<f64> = observer.drain().iter().map(|i| i.priority).collect();
        assert_eq!(priorities, vec![0.9, 0.5, 0.2]);
        assert!(observer.pending().is_empty());
    }

    #[test]
    fn default_subscription_is_action_and_goal() {
        let observer = ActionObserver::new("action");
        let percept = Event::new(ContentType::Percept, json!({}), "vision", 1.0).unwrap();
        let goal = Event::new(ContentType::Goal, json!({}), "planner", 0.1).unwrap();
        assert!(!observer.accepts(&percept));
        assert!(observer.accepts(&goal));
    }
}
