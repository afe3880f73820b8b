//! Competing demands ("goals") and the activation state computed over them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check_unit;
use crate::error::{ValidationError, ValidationResult};
use crate::resources::CognitiveResources;

/// Unique identifier for a demand.
///
/// Ordered so that arbitration can break activation ties deterministically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DemandId(pub String);

impl DemandId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DemandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared relationships between demands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRelationships {
    #[serde(default)]
    pub conflicts_with: BTreeSet<DemandId>,
    #[serde(default)]
    pub facilitates: BTreeSet<DemandId>,
    #[serde(default)]
    pub subgoal_ids: BTreeSet<DemandId>,
}

impl DemandRelationships {
    pub fn is_empty(&self) -> bool {
        self.conflicts_with.is_empty() && self.facilitates.is_empty() && self.subgoal_ids.is_empty()
    }
}

/// A demand competing for cognitive resources.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Demand {
    id: DemandId,
    importance: f64,
    progress: f64,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    resource_needs: CognitiveResources,
    relationships: DemandRelationships,
}

impl Demand {
    pub fn builder(id: impl Into<String>) -> DemandBuilder {
        DemandBuilder::new(DemandId::new(id))
    }

    pub fn id(&self) -> &DemandId {
        &self.id
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resource_needs(&self) -> &CognitiveResources {
        &self.resource_needs
    }

    pub fn relationships(&self) -> &DemandRelationships {
        &self.relationships
    }

    /// Update progress between arbitration rounds.
    pub fn set_progress(&mut self, progress: f64) -> ValidationResult<()> {
        self.progress = check_unit("progress", progress)?;
        Ok(())
    }

    /// Update importance between arbitration rounds.
    pub fn set_importance(&mut self, importance: f64) -> ValidationResult<()> {
        self.importance = check_unit("importance", importance)?;
        Ok(())
    }

    pub fn conflicts_with(&self, other: &DemandId) -> bool {
        self.relationships.conflicts_with.contains(other)
    }

    pub fn facilitates(&self, other: &DemandId) -> bool {
        self.relationships.facilitates.contains(other)
    }
}

/// Builder for [`Demand`]; validation happens in [`DemandBuilder::build`].
#[derive(Clone, Debug)]
pub struct DemandBuilder {
    id: DemandId,
    importance: f64,
    progress: f64,
    deadline: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    resource_needs: CognitiveResources,
    relationships: DemandRelationships,
}

impl DemandBuilder {
    pub fn new(id: DemandId) -> Self {
        Self {
            id,
            importance: 0.5,
            progress: 0.0,
            deadline: None,
            created_at: None,
            resource_needs: CognitiveResources::zero(),
            relationships: DemandRelationships::default(),
        }
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn needs(mut self, needs: CognitiveResources) -> Self {
        self.resource_needs = needs;
        self
    }

    pub fn conflicts_with(mut self, other: impl Into<String>) -> Self {
        self.relationships.conflicts_with.insert(DemandId::new(other));
        self
    }

    pub fn facilitates(mut self, other: impl Into<String>) -> Self {
        self.relationships.facilitates.insert(DemandId::new(other));
        self
    }

    pub fn subgoal(mut self, subgoal: impl Into<String>) -> Self {
        self.relationships.subgoal_ids.insert(DemandId::new(subgoal));
        self
    }

    pub fn relationships(mut self, relationships: DemandRelationships) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn build(self) -> ValidationResult<Demand> {
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier("demand id"));
        }

        Ok(Demand {
            id: self.id,
            importance: check_unit("importance", self.importance)?,
            progress: check_unit("progress", self.progress)?,
            deadline: self.deadline,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            resource_needs: self.resource_needs,
            relationships: self.relationships,
        })
    }
}

/// Lifecycle of a demand across arbitration rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandState {
    Waiting,
    Active,
    Completed,
    Cancelled,
}

impl DemandState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DemandState::Completed | DemandState::Cancelled)
    }

    /// Valid transitions: `Waiting ↔ Active`, any live state to a terminal one.
    pub fn can_transition_to(&self, next: DemandState) -> bool {
        use DemandState::*;
        match (*self, next) {
            (Waiting, Active) | (Active, Waiting) => true,
            (Waiting, Waiting) | (Active, Active) => true,
            (Waiting | Active, Completed | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DemandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DemandState::Waiting => "waiting",
            DemandState::Active => "active",
            DemandState::Completed => "completed",
            DemandState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Activation per demand after one competition round.
///
/// Keyed by id in sorted order, so iteration is reproducible.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationState {
    activations: BTreeMap<DemandId, f64>,
}

impl ActivationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: DemandId, activation: f64) {
        self.activations.insert(id, activation.clamp(0.0, 1.0));
    }

    /// Activation of a demand, `0.0` if it was not part of the round.
    pub fn get(&self, id: &DemandId) -> f64 {
        self.activations.get(id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, id: &DemandId) -> bool {
        self.activations.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DemandId, f64)> {
        self.activations.iter().map(|(id, a)| (id, *a))
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Highest activation, ties broken by ascending id.
    pub fn top(&self) -> Option<(&DemandId, f64)> {
        self.iter().fold(None, |best, (id, a)| match best {
            Some((_, best_a)) if best_a >= a => best,
            _ => Some((id, a)),
        })
    }
}

impl FromIterator<(DemandId, f64)> for ActivationState {
    fn from_iter<I: IntoIterator<Item = (DemandId, f64)>>(iter: I) -> Self {
        let mut state = ActivationState::new();
        for (id, a) in iter {
            state.insert(id, a);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_validates_ranges() {
        assert!(Demand::builder("g").importance(1.5).build().is_err());
        assert!(Demand::builder("g").progress(-0.5).build().is_err());
        assert!(matches!(
            Demand::builder("  ").build(),
            Err(ValidationError::EmptyIdentifier(_))
        ));
    }

    #[test]
    fn builder_collects_relationships() {
        let d = Demand::builder("write")
            .importance(0.8)
            .conflicts_with("sleep")
            .facilitates("publish")
            .subgoal("outline")
            .build()
            .unwrap();

        assert!(d.conflicts_with(&DemandId::new("sleep")));
        assert!(d.facilitates(&DemandId::new("publish")));
        assert!(d.relationships().subgoal_ids.contains(&DemandId::new("outline")));
        assert!(!d.relationships().is_empty());
    }

    #[test]
    fn set_progress_validates() {
        let mut d = Demand::builder("g").build().unwrap();
        assert!(d.set_progress(0.4).is_ok());
        assert_eq!(d.progress(), 0.4);
        assert!(d.set_progress(1.4).is_err());
        assert_eq!(d.progress(), 0.4);
    }

    #[test]
    fn state_transitions() {
        use DemandState::*;
        assert!(Waiting.can_transition_to(Active));
        assert!(Active.can_transition_to(Waiting));
        assert!(Active.can_transition_to(Completed));
        assert!(Waiting.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Waiting));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(Completed.is_terminal());
        assert!(!Active.is_terminal());
    }

    #[test]
    fn activation_top_breaks_ties_by_id() {
        let state: ActivationState = vec![
            (DemandId::new("b"), 0.7),
            (DemandId::new("a"), 0.7),
            (DemandId::new("c"), 0.2),
        ]
        .into_iter()
        .collect();

        let (id, a) = state.top().unwrap();
        assert_eq!(id.as_str(), "a");
        assert_eq!(a, 0.7);
        assert_eq!(state.get(&DemandId::new("missing")), 0.0);
    }

    #[test]
    fn activation_insert_clamps() {
        let mut state = ActivationState::new();
        state.insert(DemandId::new("x"), 1.7);
        assert_eq!(state.get(&DemandId::new("x")), 1.0);
    }
}
