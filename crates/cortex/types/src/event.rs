//! Ignited events and the feedback observers return for them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Error label recorded for an observer whose unit of work timed out.
pub const TIMEOUT_ERROR: &str = "timeout";

/// Unique identifier for a broadcast event
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registered observer
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub String);

impl ObserverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of broadcast content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Percept,
    Goal,
    Emotion,
    Action,
    Memory,
    Introspection,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Percept,
        ContentType::Goal,
        ContentType::Emotion,
        ContentType::Action,
        ContentType::Memory,
        ContentType::Introspection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Percept => "percept",
            ContentType::Goal => "goal",
            ContentType::Emotion => "emotion",
            ContentType::Action => "action",
            ContentType::Memory => "memory",
            ContentType::Introspection => "introspection",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownContentType(s.to_string()))
    }
}

/// Content that won upstream competition and is published to observers.
///
/// Fields are private so the ignition invariant cannot be broken after
/// construction; clone it freely, it carries no shared state.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    id: EventId,
    content_type: ContentType,
    payload: serde_json::Value,
    source: String,
    ignition_strength: f64,
    timestamp: DateTime<Utc>,
    metadata: HashMap<String, String>,
}

impl Event {
    /// Create a new event, rejecting ignition strengths outside `[0, 1]`.
    pub fn new(
        content_type: ContentType,
        payload: serde_json::Value,
        source: impl Into<String>,
        ignition_strength: f64,
    ) -> ValidationResult<Self> {
        if !ignition_strength.is_finite() || !(0.0..=1.0).contains(&ignition_strength) {
            return Err(ValidationError::IgnitionOutOfRange(ignition_strength));
        }

        Ok(Self {
            id: EventId::generate(),
            content_type,
            payload,
            source: source.into(),
            ignition_strength,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        })
    }

    /// Attach metadata entries.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ignition_strength(&self) -> f64 {
        self.ignition_strength
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Outcome of delivering one event to one observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerFeedback {
    pub observer_id: ObserverId,
    pub event_id: EventId,
    pub received: bool,
    pub processed: bool,
    /// Labels of the actions the observer triggered, in order.
    pub actions_triggered: Vec<String>,
    pub processing_time_ms: f64,
    /// Present iff the observer failed or timed out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsumerFeedback {
    /// Feedback for an observer that processed the event.
    pub fn processed(
        observer_id: ObserverId,
        event_id: EventId,
        actions_triggered: Vec<String>,
        processing_time_ms: f64,
    ) -> Self {
        Self {
            observer_id,
            event_id,
            received: true,
            processed: true,
            actions_triggered,
            processing_time_ms,
            error: None,
        }
    }

    /// Feedback for an observer that received the event but failed.
    pub fn failed(
        observer_id: ObserverId,
        event_id: EventId,
        error: impl Into<String>,
        processing_time_ms: f64,
    ) -> Self {
        Self {
            observer_id,
            event_id,
            received: true,
            processed: false,
            actions_triggered: Vec::new(),
            processing_time_ms,
            error: Some(error.into()),
        }
    }

    /// Feedback for an observer whose unit of work exceeded its timeout.
    pub fn timed_out(observer_id: ObserverId, event_id: EventId, timeout_ms: f64) -> Self {
        Self::failed(observer_id, event_id, TIMEOUT_ERROR, timeout_ms)
    }

    pub fn is_success(&self) -> bool {
        self.processed && self.error.is_none()
    }

    pub fn is_timeout(&self) -> bool {
        self.error.as_deref() == Some(TIMEOUT_ERROR)
    }
}
