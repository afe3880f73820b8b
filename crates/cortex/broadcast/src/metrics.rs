//! Broadcast-side metrics: bounded history plus running counters.

use std::collections::BTreeMap;

use cortex_metrics::{MetricsTracker, Snapshot};
use cortex_types::{ConsumerFeedback, Event, ObserverId};
use serde::Serialize;
use tracing::debug;

/// One completed broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastRecord {
    /// Submission sequence number.
    pub sequence: u64,
    pub event: Event,
    pub feedback: Vec<ConsumerFeedback>,
    /// Wall-clock time of the whole fan-out.
    pub elapsed_ms: f64,
}

impl BroadcastRecord {
    pub fn eligible_count(&self) -> usize {
        self.feedback.len()
    }

    pub fn actions_triggered(&self) -> usize {
        self.feedback.iter().map(|f| f.actions_triggered.len()).sum()
    }

    pub fn success_count(&self) -> usize {
        self.feedback.iter().filter(|f| f.is_success()).count()
    }

    /// Feedback of one observer, if it was eligible.
    pub fn feedback_for(&self, observer: &ObserverId) -> Option<&ConsumerFeedback> {
        self.feedback.iter().find(|f| &f.observer_id == observer)
    }
}

/// Numeric fields of [`BroadcastRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastField {
    EligibleObservers,
    ActionsTriggered,
    SuccessfulObservers,
    ElapsedMs,
}

impl Snapshot for BroadcastRecord {
    type Field = BroadcastField;

    fn value(&self, field: BroadcastField) -> f64 {
        match field {
            BroadcastField::EligibleObservers => self.eligible_count() as f64,
            BroadcastField::ActionsTriggered => self.actions_triggered() as f64,
            BroadcastField::SuccessfulObservers => self.success_count() as f64,
            BroadcastField::ElapsedMs => self.elapsed_ms,
        }
    }
}

/// Delivery counters for one observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObserverStats {
    pub delivered: u64,
    pub processed: u64,
    pub failed: u64,
    pub timed_out: u64,
}

impl ObserverStats {
    /// Fraction of deliveries that were processed; `0.0` before any delivery.
    pub fn success_rate(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.processed as f64 / self.delivered as f64
        }
    }

    fn observe(&mut self, feedback: &ConsumerFeedback) {
        self.delivered += 1;
        if feedback.is_success() {
            self.processed += 1;
        } else if feedback.is_timeout() {
            self.timed_out += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Running aggregate over every broadcast of a dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastMetrics {
    history: MetricsTracker<BroadcastRecord>,
    total_broadcasts: u64,
    total_eligible: u64,
    total_actions: u64,
    observers: BTreeMap<ObserverId, ObserverStats>,
}

impl BroadcastMetrics {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: MetricsTracker::new(max_history),
            total_broadcasts: 0,
            total_eligible: 0,
            total_actions: 0,
            observers: BTreeMap::new(),
        }
    }

    /// Fold a finished broadcast into the counters and the history.
    ///
    /// History stays ordered by submission sequence even when broadcasts
    /// finish out of order.
    pub fn record(&mut self, record: BroadcastRecord) {
        self.total_broadcasts += 1;
        self.total_eligible += record.eligible_count() as u64;
        self.total_actions += record.actions_triggered() as u64;
        for feedback in &record.feedback {
            self.observers
                .entry(feedback.observer_id.clone())
                .or_default()
                .observe(feedback);
        }

        if let Some(evicted) = self.history.record_ordered_by(record, |r| r.sequence) {
            debug!(
                sequence = evicted.sequence,
                event_id = %evicted.event.id(),
                "Broadcast history entry evicted"
            );
        }
    }

    pub fn total_broadcasts(&self) -> u64 {
        self.total_broadcasts
    }

    /// Lifetime mean of eligible observers per broadcast.
    pub fn average_eligible_observers(&self) -> f64 {
        ratio(self.total_eligible, self.total_broadcasts)
    }

    /// Lifetime mean of actions triggered per broadcast.
    pub fn average_actions_triggered(&self) -> f64 {
        ratio(self.total_actions, self.total_broadcasts)
    }

    pub fn observer_stats(&self, observer: &ObserverId) -> Option<ObserverStats> {
        self.observers.get(observer).copied()
    }

    pub fn all_observer_stats(&self) -> &BTreeMap<ObserverId, ObserverStats> {
        &self.observers
    }

    pub fn success_rate(&self, observer: &ObserverId) -> Option<f64> {
        self.observers.get(observer).map(ObserverStats::success_rate)
    }

    pub fn history(&self) -> &MetricsTracker<BroadcastRecord> {
        &self.history
    }

    /// Rolling mean of a field over the retained history.
    pub fn rolling_average(&self, field: BroadcastField) -> Option<f64> {
        self.history.average(field)
    }
}

impl Default for BroadcastMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}

fn ratio(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_types::ContentType;
    use serde_json::json;

    fn record(sequence: u64, feedback: Vec<ConsumerFeedback>) -> BroadcastRecord {
        BroadcastRecord {
            sequence,
            event: Event::new(ContentType::Percept, json!({}), "test", 0.5).unwrap(),
            feedback,
            elapsed_ms: 1.0,
        }
    }

    fn ok(observer: &str, actions: usize) -> ConsumerFeedback {
        ConsumerFeedback::processed(
            ObserverId::new(observer),
            cortex_types::EventId::new("e"),
            (0..actions).map(|i| format!("a{i}")).collect(),
            1.0,
        )
    }

    #[test]
    fn counters_track_outcomes() {
        let mut metrics = BroadcastMetrics::new(10);
        let timeout = ConsumerFeedback::timed_out(ObserverId::new("slow"), cortex_types::EventId::new("e"), 100.0);
        let failed = ConsumerFeedback::failed(ObserverId::new("bad"), cortex_types::EventId::new("e"), "boom", 1.0);

        metrics.record(record(0, vec![ok("fast", 2), timeout, failed]));
        metrics.record(record(1, vec![ok("fast", 1)]));

        assert_eq!(metrics.total_broadcasts(), 2);
        assert_eq!(metrics.average_eligible_observers(), 2.0);
        assert_eq!(metrics.average_actions_triggered(), 1.5);
        assert_eq!(metrics.success_rate(&ObserverId::new("fast")), Some(1.0));

        let slow = metrics.observer_stats(&ObserverId::new("slow")).unwrap();
        assert_eq!(slow.timed_out, 1);
        assert_eq!(slow.success_rate(), 0.0);
        assert_eq!(metrics.observer_stats(&ObserverId::new("bad")).unwrap().failed, 1);
    }

    #[test]
    fn history_is_ordered_by_sequence() {
        let mut metrics = BroadcastMetrics::new(10);
        metrics.record(record(1, vec![]));
        metrics.record(record(0, vec![]));
        metrics.record(record(2, vec![]));

        let order: Vec<u64> = metrics.history().history().map(|r| r.sequence).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn empty_metrics_average_zero() {
        let metrics = BroadcastMetrics::default();
        assert_eq!(metrics.average_eligible_observers(), 0.0);
        assert!(metrics.rolling_average(BroadcastField::ElapsedMs).is_none());
    }
}
