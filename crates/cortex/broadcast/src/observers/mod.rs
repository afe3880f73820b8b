//! Observers of ignited content.
//!
//! Observers are the consumers of a broadcast: memory, attention, action,
//! affect and meta-cognition. Each one owns its subscription and its
//! internal state; the dispatcher only ever asks whether an observer
//! accepts an event and hands it over.

mod action;
mod affect;
mod attention;
mod memory;
mod metacognition;

pub use action::{ActionObserver, PendingIntention};
pub use affect::{AffectObserver, AffectState};
pub use attention::{AttentionFocus, AttentionObserver};
pub use memory::{MemoryObserver, MemoryTrace};
pub use metacognition::MetaCognitionObserver;

use async_trait::async_trait;
use cortex_types::{Event, ObserverId};
use serde::{Deserialize, Serialize};

use crate::error::ObserverResult;
use crate::filter::Subscription;

/// Kind of observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserverKind {
    Memory,
    Attention,
    Action,
    Affect,
    MetaCognition,
    /// Application-defined observer.
    Custom,
}

impl std::fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObserverKind::Memory => write!(f, "memory"),
            ObserverKind::Attention => write!(f, "attention"),
            ObserverKind::Action => write!(f, "action"),
            ObserverKind::Affect => write!(f, "affect"),
            ObserverKind::MetaCognition => write!(f, "meta_cognition"),
            ObserverKind::Custom => write!(f, "custom"),
        }
    }
}

/// Consumer of broadcast events.
///
/// Implementations must return promptly. The dispatcher enforces a
/// per-observer timeout regardless and discards late results.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Unique id of this observer.
    fn id(&self) -> &ObserverId;

    fn kind(&self) -> ObserverKind;

    /// Current subscription.
    fn subscription(&self) -> Subscription;

    /// Whether this observer should receive `event`.
    fn accepts(&self, event: &Event) -> bool {
        self.subscription().accepts(event)
    }

    /// Process an event, returning the labels of the actions it triggered.
    async fn receive_broadcast(&self, event: &Event) -> ObserverResult<Vec<String>>;
}
