//! Prediction Result Types

use crate::DetectionError;
use serde::{Deserialize, Serialize};
use telemetry::{Parameter, SensorReading};

/// Minimum window length before the ensemble path is trusted.
/// Shorter histories are scored by the basic predictor instead.
pub const MIN_ENSEMBLE_HISTORY: usize = 10;

/// Maximum number of contributing factors reported per prediction
pub const MAX_FACTORS: usize = 5;

/// Risk tier derived from the 0-100 risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band a 0-100 risk score into a tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Critical
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 30.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Direction a parameter is moving over the recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

impl Trend {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Worsening => "worsening",
        }
    }
}

/// One parameter's contribution to a risk score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    /// The contributing parameter
    pub parameter: Parameter,
    /// Points contributed to the 0-100 score
    pub contribution: f64,
    /// Recent trend for this parameter
    pub trend: Trend,
    /// Normalized significance (0.0 to 1.0)
    pub significance: f64,
}

/// Output of a single model, before ensemble fusion
#[derive(Debug, Clone, Default)]
pub struct PartialPrediction {
    /// Risk score (0-100)
    pub risk_score: f64,
    /// Model confidence (0-100)
    pub confidence: f64,
    /// Contributing factors
    pub factors: Vec<RiskFactor>,
    /// Names of matched historical patterns
    pub patterns: Vec<String>,
    /// Predicted hours until a failure event, when a pattern declares one
    pub time_to_event_hours: Option<f64>,
}

/// Fused prediction for one zone at one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Zone the prediction applies to
    pub zone_id: String,
    /// Combined risk score (0-100)
    pub risk_score: f64,
    /// Risk tier banded from the score
    pub risk_level: RiskLevel,
    /// Combined confidence (0-100)
    pub confidence: f64,
    /// Predicted hours until a failure event, if any pattern declared one
    pub time_to_event_hours: Option<f64>,
    /// Top contributing factors (at most 5, largest contribution first)
    pub factors: Vec<RiskFactor>,
    /// Matched pattern names
    pub patterns: Vec<String>,
    /// Operator recommendations for this tier and factor set
    pub recommendations: Vec<String>,
}

/// A detection model scoring readings against a zone's window.
///
/// Implementations must not mutate shared state; threshold adaptation
/// happens only through the engine's explicit calibrate entry point.
pub trait DetectionModel: Send + Sync {
    /// Stable model identifier
    fn id(&self) -> &'static str;

    /// Historical accuracy (0-100), used as the ensemble weight
    fn accuracy(&self) -> f64;

    /// Whether this model participates in the ensemble
    fn is_active(&self) -> bool;

    /// Score the current reading against the zone's window.
    ///
    /// `window` is the full zone history including `reading` as its
    /// latest entry, oldest first.
    fn score(
        &self,
        reading: &SensorReading,
        window: &[SensorReading],
    ) -> Result<PartialPrediction, DetectionError>;

    /// Adjust internal thresholds from observed risk outcomes.
    ///
    /// Default is a no-op; only models with tunable thresholds override.
    fn calibrate(&mut self, risk_scores: &[f64], learning_rate: f64) {
        let _ = (risk_scores, learning_rate);
    }
}

/// Clamp a score or confidence to the canonical 0-100 range.
pub(crate) fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges_exact() {
        assert_eq!(RiskLevel::from_score(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(79.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamped_score_stays_canonical(value in -1e6f64..1e6) {
                let clamped = clamp_score(value);
                prop_assert!((0.0..=100.0).contains(&clamped));
            }

            #[test]
            fn banding_agrees_with_thresholds(score in 0.0f64..=100.0) {
                match RiskLevel::from_score(score) {
                    RiskLevel::Critical => prop_assert!(score >= 80.0),
                    RiskLevel::High => prop_assert!((60.0..80.0).contains(&score)),
                    RiskLevel::Medium => prop_assert!((30.0..60.0).contains(&score)),
                    RiskLevel::Low => prop_assert!(score < 30.0),
                }
            }

            #[test]
            fn banding_is_monotone(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(RiskLevel::from_score(lo) <= RiskLevel::from_score(hi));
            }
        }
    }
}
