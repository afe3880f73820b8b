//! Fixed-dimension cognitive resource vectors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::check_unit;
use crate::error::{ValidationError, ValidationResult};

/// One of the four independent exhaustible capacity axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceDimension {
    Attention,
    Processing,
    Action,
    Time,
}

impl ResourceDimension {
    pub const ALL: [ResourceDimension; 4] = [
        ResourceDimension::Attention,
        ResourceDimension::Processing,
        ResourceDimension::Action,
        ResourceDimension::Time,
    ];

    /// Number of dimensions.
    pub const COUNT: usize = 4;

    pub fn index(&self) -> usize {
        match self {
            ResourceDimension::Attention => 0,
            ResourceDimension::Processing => 1,
            ResourceDimension::Action => 2,
            ResourceDimension::Time => 3,
        }
    }

    fn field_name(&self) -> &'static str {
        match self {
            ResourceDimension::Attention => "attention",
            ResourceDimension::Processing => "processing",
            ResourceDimension::Action => "action",
            ResourceDimension::Time => "time",
        }
    }
}

impl fmt::Display for ResourceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A vector over {attention, processing, action, time}.
///
/// Each component is a fraction of total capacity in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResources")]
pub struct CognitiveResources {
    attention: f64,
    processing: f64,
    action: f64,
    time: f64,
}

#[derive(Deserialize)]
struct RawResources {
    #[serde(default)]
    attention: f64,
    #[serde(default)]
    processing: f64,
    #[serde(default)]
    action: f64,
    #[serde(default)]
    time: f64,
}

impl TryFrom<RawResources> for CognitiveResources {
    type Error = ValidationError;

    fn try_from(raw: RawResources) -> Result<Self, Self::Error> {
        CognitiveResources::new(raw.attention, raw.processing, raw.action, raw.time)
    }
}

impl CognitiveResources {
    /// Create a resource vector, validating every component.
    pub fn new(attention: f64, processing: f64, action: f64, time: f64) -> ValidationResult<Self> {
        Ok(Self {
            attention: check_unit("attention", attention)?,
            processing: check_unit("processing", processing)?,
            action: check_unit("action", action)?,
            time: check_unit("time", time)?,
        })
    }

    /// The same value along every dimension.
    pub fn uniform(value: f64) -> ValidationResult<Self> {
        Self::new(value, value, value, value)
    }

    /// All-zero vector.
    pub fn zero() -> Self {
        Self {
            attention: 0.0,
            processing: 0.0,
            action: 0.0,
            time: 0.0,
        }
    }

    /// Full capacity along every dimension.
    pub fn full() -> Self {
        Self {
            attention: 1.0,
            processing: 1.0,
            action: 1.0,
            time: 1.0,
        }
    }

    /// Build from a component array ordered as [`ResourceDimension::ALL`].
    pub fn from_array(values: [f64; ResourceDimension::COUNT]) -> ValidationResult<Self> {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn get(&self, dimension: ResourceDimension) -> f64 {
        match dimension {
            ResourceDimension::Attention => self.attention,
            ResourceDimension::Processing => self.processing,
            ResourceDimension::Action => self.action,
            ResourceDimension::Time => self.time,
        }
    }

    pub fn attention(&self) -> f64 {
        self.attention
    }

    pub fn processing(&self) -> f64 {
        self.processing
    }

    pub fn action(&self) -> f64 {
        self.action
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Components ordered as [`ResourceDimension::ALL`].
    pub fn to_array(&self) -> [f64; ResourceDimension::COUNT] {
        [self.attention, self.processing, self.action, self.time]
    }

    /// Sum over all dimensions.
    pub fn total(&self) -> f64 {
        self.to_array().iter().sum()
    }

    /// `Σ_d min(self[d], other[d])`, how much two demands contend.
    pub fn overlap(&self, other: &CognitiveResources) -> f64 {
        ResourceDimension::ALL
            .iter()
            .map(|d| self.get(*d).min(other.get(*d)))
            .sum()
    }

    /// True if every component is zero.
    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }
}

impl Default for CognitiveResources {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_components() {
        assert!(CognitiveResources::new(0.5, 1.2, 0.0, 0.0).is_err());
        assert!(CognitiveResources::new(-0.1, 0.0, 0.0, 0.0).is_err());
        assert!(CognitiveResources::uniform(f64::NAN).is_err());
    }

    #[test]
    fn dimension_access() {
        let r = CognitiveResources::new(0.1, 0.2, 0.3, 0.4).unwrap();
        assert_eq!(r.get(ResourceDimension::Attention), 0.1);
        assert_eq!(r.get(ResourceDimension::Time), 0.4);
        for d in ResourceDimension::ALL {
            assert_eq!(r.to_array()[d.index()], r.get(d));
        }
        assert!((r.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overlap_is_symmetric_sum_of_minima() {
        let a = CognitiveResources::new(0.6, 0.2, 0.0, 1.0).unwrap();
        let b = CognitiveResources::new(0.3, 0.5, 0.4, 1.0).unwrap();
        assert!((a.overlap(&b) - 1.5).abs() < 1e-12);
        assert_eq!(a.overlap(&b), b.overlap(&a));
        assert_eq!(a.overlap(&CognitiveResources::zero()), 0.0);
    }

    #[test]
    fn deserialization_validates() {
        let ok: CognitiveResources =
            serde_json::from_str(r#"{"attention":0.5,"processing":0.25}"#).unwrap();
        assert_eq!(ok.processing(), 0.25);
        assert_eq!(ok.time(), 0.0);

        let bad = serde_json::from_str::<CognitiveResources>(r#"{"attention":2.0}"#);
        assert!(bad.is_err());
    }
}
