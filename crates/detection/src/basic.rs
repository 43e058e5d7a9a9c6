//! Basic Threshold Predictor
//!
//! Fallback used while a zone has too little history for stable
//! statistics. Scores a single reading against a fixed threshold table.

use crate::types::{clamp_score, PartialPrediction, PredictionResult, RiskFactor, RiskLevel, Trend};
use telemetry::{Parameter, SensorReading};

/// Fixed confidence reported for basic predictions
const BASIC_CONFIDENCE: f64 = 50.0;

/// Fixed threshold table: parameter, trigger level, points contributed
const THRESHOLD_TABLE: [(Parameter, f64, f64); 5] = [
    (Parameter::Displacement, 15.0, 30.0),
    (Parameter::Strain, 800.0, 25.0),
    (Parameter::PorePressure, 500.0, 20.0),
    (Parameter::Vibration, 5.0, 15.0),
    (Parameter::TiltAngle, 5.0, 10.0),
];

/// Threshold-table predictor for zones with insufficient history
#[derive(Debug, Default)]
pub struct BasicPredictor;

impl BasicPredictor {
    /// Create a basic predictor
    pub fn new() -> Self {
        Self
    }

    /// Score one reading against the fixed threshold table.
    pub fn predict(&self, reading: &SensorReading) -> PredictionResult {
        let partial = self.score(reading);
        let risk_level = RiskLevel::from_score(partial.risk_score);

        PredictionResult {
            zone_id: reading.zone_id.clone(),
            risk_score: partial.risk_score,
            risk_level,
            confidence: partial.confidence,
            time_to_event_hours: None,
            factors: partial.factors,
            patterns: partial.patterns,
            recommendations: vec![
                "Continue monitoring; insufficient history for ensemble scoring".to_string(),
                "Verify sensor installation and data feed for this zone".to_string(),
            ],
        }
    }

    fn score(&self, reading: &SensorReading) -> PartialPrediction {
        let mut risk_score = 0.0;
        let mut factors = Vec::new();

        for (parameter, threshold, points) in THRESHOLD_TABLE {
            if parameter.value_of(reading) > threshold {
                risk_score += points;
                factors.push(RiskFactor {
                    parameter,
                    contribution: points,
                    trend: Trend::Stable,
                    significance: points / 100.0,
                });
            }
        }

        PartialPrediction {
            risk_score: clamp_score(risk_score),
            confidence: BASIC_CONFIDENCE,
            factors,
            patterns: vec!["threshold_exceedance".to_string()],
            time_to_event_hours: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worked_example() {
        // displacement 20 (+30) and strain 900 (+25); pore pressure,
        // vibration, and tilt below their triggers.
        let reading = SensorReading {
            zone_id: "zone-a".to_string(),
            displacement_mm: 20.0,
            strain_ue: 900.0,
            pore_pressure_kpa: 400.0,
            vibration_hz: 3.0,
            tilt_angle_deg: 2.0,
            ..Default::default()
        };

        let predictor = BasicPredictor::new();
        let result = predictor.predict(&reading);

        assert_eq!(result.risk_score, 55.0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.confidence, 50.0);
        assert_eq!(result.factors.len(), 2);
        assert_eq!(result.patterns, vec!["threshold_exceedance".to_string()]);
    }

    #[test]
    fn test_quiet_reading_scores_zero() {
        let reading = SensorReading {
            zone_id: "zone-a".to_string(),
            ..Default::default()
        };

        let result = BasicPredictor::new().predict(&reading);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_all_thresholds_capped() {
        let reading = SensorReading {
            zone_id: "zone-a".to_string(),
            displacement_mm: 100.0,
            strain_ue: 2000.0,
            pore_pressure_kpa: 900.0,
            vibration_hz: 20.0,
            tilt_angle_deg: 30.0,
            ..Default::default()
        };

        let result = BasicPredictor::new().predict(&reading);
        assert_eq!(result.risk_score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }
}
