//! Subscription Filter: which observer receives which event.

use std::collections::BTreeSet;

use cortex_types::{ContentType, Event, ObserverId, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// What an observer wants to receive.
///
/// Empty sets accept everything along that axis. Deserialized
/// subscriptions go through the same threshold check as
/// [`Subscription::with_min_ignition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSubscription")]
pub struct Subscription {
    pub observer_id: ObserverId,
    pub accepted_content_types: BTreeSet<ContentType>,
    pub min_ignition_strength: f64,
    pub source_allow_list: BTreeSet<String>,
}

#[derive(Deserialize)]
struct RawSubscription {
    observer_id: ObserverId,
    #[serde(default)]
    accepted_content_types: BTreeSet<ContentType>,
    #[serde(default)]
    min_ignition_strength: f64,
    #[serde(default)]
    source_allow_list: BTreeSet<String>,
}

impl TryFrom<RawSubscription> for Subscription {
    type Error = ValidationError;

    fn try_from(raw: RawSubscription) -> Result<Self, Self::Error> {
        let subscription = Subscription {
            accepted_content_types: raw.accepted_content_types,
            source_allow_list: raw.source_allow_list,
            ..Subscription::all(raw.observer_id)
        };
        subscription.with_min_ignition(raw.min_ignition_strength)
    }
}

impl Subscription {
    /// Subscription accepting every event.
    pub fn all(observer_id: ObserverId) -> Self {
        Self {
            observer_id,
            accepted_content_types: BTreeSet::new(),
            min_ignition_strength: 0.0,
            source_allow_list: BTreeSet::new(),
        }
    }

    pub fn with_content_types(mut self, types: impl IntoIterator<Item = ContentType>) -> Self {
        self.accepted_content_types.extend(types);
        self
    }

    pub fn with_sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.source_allow_list.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Set the ignition threshold, rejecting values outside `[0, 1]`.
    pub fn with_min_ignition(mut self, min: f64) -> ValidationResult<Self> {
        if !min.is_finite() || !(0.0..=1.0).contains(&min) {
            return Err(ValidationError::OutOfRange {
                field: "min_ignition_strength",
                value: min,
            });
        }
        self.min_ignition_strength = min;
        Ok(self)
    }

    pub fn accepts(&self, event: &Event) -> bool {
        accepts(self, event)
    }
}

/// Pure eligibility check of one event against one subscription.
pub fn accepts(subscription: &Subscription, event: &Event) -> bool {
    let type_ok = subscription.accepted_content_types.is_empty()
        || subscription.accepted_content_types.contains(&event.content_type());
    let ignition_ok = event.ignition_strength() >= subscription.min_ignition_strength;
    let source_ok = subscription.source_allow_list.is_empty()
        || subscription.source_allow_list.contains(event.source());

    type_ok && ignition_ok && source_ok
}
