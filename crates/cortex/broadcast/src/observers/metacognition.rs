//! Meta-cognition observer: counts what the system attends to and keeps
//! introspection notes.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use cortex_types::{ContentType, Event, ObserverId};
use parking_lot::{Mutex, RwLock};

use super::{Observer, ObserverKind};
use crate::error::ObserverResult;
use crate::filter::Subscription;

const MAX_NOTES: usize = 50;

#[derive(Debug, Default)]
struct MetaState {
    counts: BTreeMap<ContentType, u64>,
    notes: VecDeque<String>,
}

pub struct MetaCognitionObserver {
    id: ObserverId,
    subscription: RwLock<Subscription>,
    state: Mutex<MetaState>,
}

impl MetaCognitionObserver {
    pub fn new(id: impl Into<String>) -> Self {
        let id = ObserverId::new(id);
        Self {
            subscription: RwLock::new(Subscription::all(id.clone())),
            id,
            state: Mutex::new(MetaState::default()),
        }
    }

    pub fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write() = Subscription {
            observer_id: self.id.clone(),
            ..subscription
        };
    }

    /// Broadcasts seen per content type.
    pub fn counts(&self) -> BTreeMap<ContentType, u64> {
        self.state.lock().counts.clone()
    }

    /// Content type seen most often; ties go to the first in declaration order.
    pub fn dominant_content_type(&self) -> Option<ContentType> {
        let state = self.state.lock();
        ContentType::ALL
            .into_iter()
            .filter_map(|ct| state.counts.get(&ct).map(|n| (ct, *n)))
            .fold(None, |best: Option<(ContentType, u64)>, (ct, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((ct, n)),
            })
            .map(|(ct, _)| ct)
    }

    pub fn notes(&self) -> Vec<String> {
        self.state.lock().notes.iter().cloned().collect()
    }
}

#[async_trait]
impl Observer for MetaCognitionObserver {
    fn id(&self) -> &ObserverId {
        &self.id
    }

    fn kind(&self) -> ObserverKind {
        ObserverKind::MetaCognition
    }

    fn subscription(&self) -> Subscription {
        self.subscription.read().clone()
    }

    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>> {
        let mut state = self.state.lock();
        *state.counts.entry(event.content_type()).or_insert(0) += 1;

        let mut actions = vec![format!("meta.observe:{}", event.content_type())];

        if event.content_type() == ContentType::Introspection {
            let note = event
                .payload()
                .get("note")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| event.payload().to_string());
            state.notes.push_back(note);
            if state.notes.len() > MAX_NOTES {
                state.notes.pop_front();
            }
            actions.push("meta.note".to_string());
        }

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn counts_by_content_type() {
        let observer = MetaCognitionObserver::new("meta");
        for ct in [ContentType::Goal, ContentType::Percept, ContentType::Goal] {
            let event = Event::new(ct, json!({}), "test", 0.5).unwrap();
            observer.receive_broadcast(&event).await.unwrap();
        }
        assert_eq!(observer.counts()[&ContentType::Goal], 2);
        assert_eq!(observer.dominant_content_type(), Some(ContentType::Goal));
    }

    #[tokio::test]
    async fn introspection_adds_note() {
        let observer = MetaCognitionObserver::new("meta");
        let event = Event::new(
            ContentType::Introspection,
            json!({"note": "attention drifting"}),
            "self",
            0.4,
        )
        .unwrap();

        let actions = observer.receive_broadcast(&event).await.unwrap();
        assert_eq!(actions, vec!["meta.observe:introspection", "meta.note"]);
        assert_eq!(observer.notes(), vec!["attention drifting"]);
    }
}
