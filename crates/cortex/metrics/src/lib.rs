//! Bounded rolling metrics history.
//!
//! A [`MetricsTracker`] keeps the most recent `max_history` snapshots in
//! FIFO order and computes rolling aggregates over whatever is currently
//! retained. Both the broadcast dispatcher and the competition engine
//! instantiate it with their own snapshot type; the field selector is a
//! per-snapshot enum so aggregate queries stay typed.
//!
//! The tracker is a plain value. Owners that share it across tasks wrap it
//! in their own lock.

#![deny(unsafe_code)]

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::trace;

/// A snapshot that exposes numeric fields for rolling aggregation.
pub trait Snapshot {
    /// Selector for the numeric fields of this snapshot.
    type Field: Copy + fmt::Debug;

    /// Value of one field.
    fn value(&self, field: Self::Field) -> f64;
}

/// FIFO history bounded at `max_history`; the oldest entry is evicted first.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsTracker<S> {
    history: VecDeque<S>,
    max_history: usize,
    total_recorded: u64,
    total_evicted: u64,
}

impl<S> MetricsTracker<S> {
    /// Create a tracker retaining at most `max_history` snapshots.
    ///
    /// A bound of zero is valid: counters still advance but nothing is retained.
    pub fn new(max_history: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history.min(1024)),
            max_history,
            total_recorded: 0,
            total_evicted: 0,
        }
    }

    /// Append a snapshot. Returns the evicted snapshot, if any.
    pub fn record(&mut self, snapshot: S) -> Option<S> {
        self.history.push_back(snapshot);
        self.total_recorded += 1;
        self.evict_overflow()
    }

    /// Insert a snapshot keeping the history sorted by `key`.
    ///
    /// Snapshots normally arrive in key order, so the scan from the back is
    /// O(1) in the common case. Used when completion order can differ from
    /// submission order.
    pub fn record_ordered_by<K, F>(&mut self, snapshot: S, key: F) -> Option<S>
    where
        K: Ord,
        F: Fn(&S) -> K,
    {
        let k = key(&snapshot);
        let mut idx = self.history.len();
        while idx > 0 && key(&self.history[idx - 1]) > k {
            idx -= 1;
        }
        self.history.insert(idx, snapshot);
        self.total_recorded += 1;
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> Option<S> {
        if self.history.len() > self.max_history {
            self.total_evicted += 1;
            trace!(
                max_history = self.max_history,
                evicted_total = self.total_evicted,
                "Evicted oldest metrics snapshot"
            );
            self.history.pop_front()
        } else {
            None
        }
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &S> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&S> {
        self.history.back()
    }

    pub fn oldest(&self) -> Option<&S> {
        self.history.front()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Snapshots ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl<S: Snapshot> MetricsTracker<S> {
    /// Rolling mean of a field over the retained history.
    ///
    /// `None` when the history is empty.
    pub fn average(&self, field: S::Field) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let sum: f64 = self.history.iter().map(|s| s.value(field)).sum();
        Some(sum / self.history.len() as f64)
    }

    /// Largest value of a field over the retained history.
    pub fn max(&self, field: S::Field) -> Option<f64> {
        self.history
            .iter()
            .map(|s| s.value(field))
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }
}

impl<S> Default for MetricsTracker<S> {
    fn default() -> Self {
        Self::new(100)
    }
}
