//! Attention observer: follows the most salient broadcast.

use async_trait::async_trait;
use cortex_types::{ContentType, Event, EventId, ObserverId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::debug;

use super::{Observer, ObserverKind};
use crate::error::ObserverResult;
use crate::filter::Subscription;

/// Salience retained per broadcast while focus is sustained.
const SALIENCE_DECAY: f64 = 0.9;

/// Current focus of attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionFocus {
    pub event_id: EventId,
    pub content_type: ContentType,
    pub source: String,
    pub salience: f64,
}

#[derive(Debug, Default)]
struct AttentionState {
    focus: Option<AttentionFocus>,
    shifts: u64,
}

/// Observer that shifts focus to broadcasts stronger than the decayed
/// salience of the current focus.
pub struct AttentionObserver {
    id: ObserverId,
    subscription: RwLock<Subscription>,
    state: Mutex<AttentionState>,
}

impl AttentionObserver {
    pub fn new(id: impl Into<String>) -> Self {
        let id = ObserverId::new(id);
        Self {
            subscription: RwLock::new(Subscription::all(id.clone())),
            id,
            state: Mutex::new(AttentionState::default()),
        }
    }

    pub fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write() = Subscription {
            observer_id: self.id.clone(),
            ..subscription
        };
    }

    pub fn focus(&self) -> Option<AttentionFocus> {
        self.state.lock().focus.clone()
    }

    /// Number of focus shifts so far.
    pub fn shifts(&self) -> u64 {
        self.state.lock().shifts
    }
}

#[async_trait]
impl Observer for AttentionObserver {
    fn id(&self) -> &ObserverId {
        &self.id
    }

    fn kind(&self) -> ObserverKind {
        ObserverKind::Attention
    }

    fn subscription(&self) -> Subscription {
        self.subscription.read().clone()
    }

    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>> {
        let mut state = self.state.lock();

        let current = state.focus.as_ref().map(|f| f.salience).unwrap_or(0.0);
        if event.ignition_strength() > current {
            state.focus = Some(AttentionFocus {
                event_id: event.id().clone(),
                content_type: event.content_type(),
                source: event.source().to_string(),
                salience: event.ignition_strength(),
            });
            state.shifts += 1;
            debug!(
                observer = %self.id,
                event_id = %event.id(),
                salience = event.ignition_strength(),
                "Attention shifted"
            );
            return Ok(vec![format!("attention.shift:{}", event.content_type())]);
        }

        if let Some(focus) = state.focus.as_mut() {
            focus.salience *= SALIENCE_DECAY;
        }
        Ok(vec!["attention.sustain".to_string()])
    }
}
