//! Cortex Broadcast - dissemination of ignited content to observers
//!
//! The [`BroadcastDispatcher`] publishes each event to every registered
//! [`Observer`] whose [`Subscription`] accepts it. Delivery is concurrent
//! and isolated per observer:
//!
//! - each observer runs in its own task under its own timeout;
//! - a failing, panicking or slow observer yields error feedback for
//!   itself only;
//! - the caller gets back exactly one [`ConsumerFeedback`] per eligible
//!   observer, in no particular order.
//!
//! Every broadcast is folded into [`BroadcastMetrics`]: a bounded history
//! kept in submission order plus per-observer counters.
//!
//! [`ConsumerFeedback`]: cortex_types::ConsumerFeedback

#![deny(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod observers;

pub use config::BroadcastConfig;
pub use dispatcher::BroadcastDispatcher;
pub use error::{BroadcastError, BroadcastResult, ObserverError, ObserverResult};
pub use filter::{accepts, Subscription};
pub use metrics::{BroadcastField, BroadcastMetrics, BroadcastRecord, ObserverStats};
pub use observers::{
    ActionObserver, AffectObserver, AffectState, AttentionFocus, AttentionObserver, MemoryObserver,
    MemoryTrace, MetaCognitionObserver, Observer, ObserverKind, PendingIntention,
};
