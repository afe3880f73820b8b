//! Affect observer: valence/arousal state driven by emotion and percept broadcasts.

use async_trait::async_trait;
use cortex_types::{ContentType, Event, ObserverId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Observer, ObserverKind};
use crate::error::{ObserverError, ObserverResult};
use crate::filter::Subscription;

/// Weight of a new emotion reading against the current state.
const BLEND: f64 = 0.5;

/// Arousal added per unit of percept ignition.
const PERCEPT_AROUSAL_GAIN: f64 = 0.1;

/// Valence in `[-1, 1]`, arousal in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AffectState {
    pub valence: f64,
    pub arousal: f64,
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.2,
        }
    }
}

pub struct AffectObserver {
    id: ObserverId,
    subscription: RwLock<Subscription>,
    state: Mutex<AffectState>,
}

impl AffectObserver {
    pub fn new(id: impl Into<String>) -> Self {
        let id = ObserverId::new(id);
        let subscription = Subscription::all(id.clone())
            .with_content_types([ContentType::Emotion, ContentType::Percept]);
        Self {
            id,
            subscription: RwLock::new(subscription),
            state: Mutex::new(AffectState::default()),
        }
    }

    pub fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write() = Subscription {
            observer_id: self.id.clone(),
            ..subscription
        };
    }

    pub fn state(&self) -> AffectState {
        *self.state.lock()
    }
}

fn numeric_field(payload: &Value, field: &'static str) -> ObserverResult<Option<f64>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| ObserverError::InvalidPayload {
            field,
            reason: format!("expected a number, got {v}"),
        }),
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[async_trait]
impl Observer for AffectObserver {
    fn id(&self) -> &ObserverId {
        &self.id
    }

    fn kind(&self) -> ObserverKind {
        ObserverKind::Affect
    }

    fn subscription(&self) -> Subscription {
        self.subscription.read().clone()
    }

    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>> {
        let (valence, arousal) = match event.content_type() {
            ContentType::Emotion => (
                numeric_field(event.payload(), "valence")?,
                numeric_field(event.payload(), "arousal")?,
            ),
            _ => (None, None),
        };

        let mut state = self.state.lock();
        let before = *state;

        if let Some(v) = valence {
            state.valence = (state.valence * (1.0 - BLEND) + v.clamp(-1.0, 1.0) * BLEND).clamp(-1.0, 1.0);
        }
        state.arousal = match arousal {
            Some(a) => state.arousal * (1.0 - BLEND) + a.clamp(0.0, 1.0) * BLEND,
            None => state.arousal + PERCEPT_AROUSAL_GAIN * event.ignition_strength(),
        }
        .clamp(0.0, 1.0);

        debug!(
            observer = %self.id,
            valence = state.valence,
            arousal = state.arousal,
            "Affect updated"
        );

        let mut actions = vec!["affect.update".to_string()];
        match (sign(before.valence), sign(state.valence)) {
            (prev, 1) if prev != 1 => actions.push("affect.valence_positive".to_string()),
            (prev, -1) if prev != -1 => actions.push("affect.valence_negative".to_string()),
            _ => {}
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn emotion_blends_into_state() {
        let observer = AffectObserver::new("affect");
        let event = Event::new(
            ContentType::Emotion,
            json!({"valence": -0.8, "arousal": 0.6}),
            "appraisal",
            0.7,
        )
        .unwrap();

        let actions = observer.receive_broadcast(&event).await.unwrap();
        let state = observer.state();
        assert!((state.valence + 0.4).abs() < 1e-12);
        assert!((state.arousal - 0.4).abs() < 1e-12);
        assert_eq!(actions, vec!["affect.update", "affect.valence_negative"]);
    }

    #[tokio::test]
    async fn percepts_raise_arousal() {
        let observer = AffectObserver::new("affect");
        let event = Event::new(ContentType::Percept, json!({}), "vision", 1.0).unwrap();
        observer.receive_broadcast(&event).await.unwrap();
        assert!((observer.state().arousal - 0.3).abs() < 1e-12);
        assert_eq!(observer.state().valence, 0.0);
    }

    #[tokio::test]
    async fn malformed_valence_is_an_error() {
        let observer = AffectObserver::new("affect");
        let event = Event::new(ContentType::Emotion, json!({"valence": "sad"}), "appraisal", 0.5).unwrap();
        let err = observer.receive_broadcast(&event).await.unwrap_err();
        assert!(matches!(err, ObserverError::InvalidPayload { field: "valence", .. }));
        assert_eq!(observer.state(), AffectState::default());
    }
}
