//! Configuration for the competition engine and resource pool

use cortex_types::{CognitiveResources, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Weights of the self-excitation terms.
///
/// `self_excitation = importance·w_i + urgency·w_u + (1 − progress)·w_c`,
/// clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcitationWeights {
    #[serde(default = "default_importance_weight")]
    pub importance: f64,

    #[serde(default = "default_urgency_weight")]
    pub urgency: f64,

    #[serde(default = "default_incompleteness_weight")]
    pub incompleteness: f64,
}

impl Default for ExcitationWeights {
    fn default() -> Self {
        Self {
            importance: default_importance_weight(),
            urgency: default_urgency_weight(),
            incompleteness: default_incompleteness_weight(),
        }
    }
}

impl ExcitationWeights {
    pub fn validate(&self) -> ValidationResult<()> {
        for (field, w) in [
            ("excitation.importance", self.importance),
            ("excitation.urgency", self.urgency),
            ("excitation.incompleteness", self.incompleteness),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ValidationError::config(field, format!("weight {w} must be finite and >= 0")));
            }
        }
        Ok(())
    }
}

/// Weights used by the interaction analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionWeights {
    /// Scale of the resource-overlap interference term (overlap / 4).
    #[serde(default = "default_overlap_weight")]
    pub resource_overlap: f64,

    /// Fixed interference for an explicit conflict.
    #[serde(default = "default_conflict_weight")]
    pub conflict: f64,

    /// Facilitation added per shared signal.
    #[serde(default = "default_facilitation_weight")]
    pub facilitation_per_signal: f64,
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            resource_overlap: default_overlap_weight(),
            conflict: default_conflict_weight(),
            facilitation_per_signal: default_facilitation_weight(),
        }
    }
}

impl InteractionWeights {
    pub fn validate(&self) -> ValidationResult<()> {
        for (field, w) in [
            ("interaction.resource_overlap", self.resource_overlap),
            ("interaction.conflict", self.conflict),
            ("interaction.facilitation_per_signal", self.facilitation_per_signal),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(ValidationError::config(field, format!("weight {w} must be finite and >= 0")));
            }
        }
        Ok(())
    }
}

/// Competition engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionConfig {
    /// Fixed relaxation iteration count; there is no early exit.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Lateral inhibition strength in `[0, 1]`.
    #[serde(default = "default_inhibition_strength")]
    pub inhibition_strength: f64,

    /// Urgency used for demands without a deadline.
    #[serde(default = "default_urgency")]
    pub default_urgency: f64,

    #[serde(default)]
    pub excitation: ExcitationWeights,

    #[serde(default)]
    pub interaction: InteractionWeights,

    /// Bound of the competition snapshot history.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Rolling utilization at or above which the pool counts as exhausted.
    #[serde(default = "default_exhaustion_threshold")]
    pub exhaustion_threshold: f64,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            inhibition_strength: default_inhibition_strength(),
            default_urgency: default_urgency(),
            excitation: ExcitationWeights::default(),
            interaction: InteractionWeights::default(),
            max_history: default_max_history(),
            exhaustion_threshold: default_exhaustion_threshold(),
        }
    }
}

impl CompetitionConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        check_unit_config("inhibition_strength", self.inhibition_strength)?;
        check_unit_config("default_urgency", self.default_urgency)?;
        check_unit_config("exhaustion_threshold", self.exhaustion_threshold)?;
        self.excitation.validate()?;
        self.interaction.validate()?;
        Ok(())
    }
}

/// Resource pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "CognitiveResources::full")]
    pub capacity: CognitiveResources,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: CognitiveResources::full(),
        }
    }
}

fn check_unit_config(field: &'static str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::config(field, format!("{value} outside [0, 1]")))
    }
}

// Default value helpers
fn default_iterations() -> usize {
    10
}

fn default_inhibition_strength() -> f64 {
    0.3
}

fn default_urgency() -> f64 {
    0.5
}

fn default_importance_weight() -> f64 {
    0.5
}

fn default_urgency_weight() -> f64 {
    0.3
}

fn default_incompleteness_weight() -> f64 {
    0.2
}

fn default_overlap_weight() -> f64 {
    1.0
}

fn default_conflict_weight() -> f64 {
    1.0
}

fn default_facilitation_weight() -> f64 {
    0.25
}

fn default_max_history() -> usize {
    100
}

fn default_exhaustion_threshold() -> f64 {
    0.9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompetitionConfig::default();
        assert_eq!(config.iterations, 10);
        assert_eq!(config.inhibition_strength, 0.3);
        assert_eq!(config.default_urgency, 0.5);
        assert_eq!(config.excitation.importance, 0.5);
        assert_eq!(config.excitation.urgency, 0.3);
        assert_eq!(config.excitation.incompleteness, 0.2);
        assert_eq!(config.max_history, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_inhibition() {
        let config = CompetitionConfig {
            inhibition_strength: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let config = CompetitionConfig {
            excitation: ExcitationWeights {
                urgency: -0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: CompetitionConfig =
            serde_json::from_str(r#"{"iterations": 4, "excitation": {"importance": 0.7}}"#).unwrap();
        assert_eq!(config.iterations, 4);
        assert_eq!(config.inhibition_strength, 0.3);
        assert_eq!(config.excitation.importance, 0.7);
        assert_eq!(config.excitation.urgency, 0.3);
    }

    #[test]
    fn test_pool_default_is_full() {
        assert_eq!(PoolConfig::default().capacity, CognitiveResources::full());
        let config: PoolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.capacity, CognitiveResources::full());
    }
}
