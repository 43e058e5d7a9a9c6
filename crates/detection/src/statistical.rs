//! Statistical Exceedance Model

use crate::statistics::compute_trend;
use crate::types::{clamp_score, DetectionModel, PartialPrediction, RiskFactor, Trend};
use crate::DetectionError;
use std::collections::HashMap;
use telemetry::{Parameter, SensorReading};
use tracing::debug;

/// Minimum contribution (points) before a parameter is reported as a factor
const FACTOR_FLOOR: f64 = 5.0;

/// Points added per worsening parameter trend
const TREND_PENALTY: f64 = 10.0;

/// Confidence ceiling for the statistical path
const MAX_CONFIDENCE: f64 = 90.0;

/// Threshold-exceedance model with trend adjustment.
///
/// For each parameter: exceedance = max(0, (current - threshold) / threshold),
/// contribution = exceedance x weight x 100. Worsening trends add a fixed
/// penalty each. Confidence scales with window length.
pub struct StatisticalModel {
    thresholds: HashMap<Parameter, f64>,
    weights: HashMap<Parameter, f64>,
    accuracy: f64,
    active: bool,
}

impl StatisticalModel {
    /// Create with default thresholds and weights
    pub fn new() -> Self {
        Self {
            thresholds: Self::default_thresholds(),
            weights: Self::default_weights(),
            accuracy: 78.0,
            active: true,
        }
    }

    fn default_thresholds() -> HashMap<Parameter, f64> {
        HashMap::from([
            (Parameter::Displacement, 15.0),
            (Parameter::Strain, 800.0),
            (Parameter::PorePressure, 500.0),
            (Parameter::Temperature, 35.0),
            (Parameter::Vibration, 5.0),
            (Parameter::Rainfall, 25.0),
            (Parameter::WindSpeed, 15.0),
            (Parameter::SoilMoisture, 70.0),
            (Parameter::TiltAngle, 5.0),
        ])
    }

    fn default_weights() -> HashMap<Parameter, f64> {
        HashMap::from([
            (Parameter::Displacement, 0.25),
            (Parameter::Strain, 0.20),
            (Parameter::PorePressure, 0.20),
            (Parameter::Temperature, 0.025),
            (Parameter::Vibration, 0.10),
            (Parameter::Rainfall, 0.10),
            (Parameter::WindSpeed, 0.025),
            (Parameter::SoilMoisture, 0.05),
            (Parameter::TiltAngle, 0.05),
        ])
    }

    /// Current threshold for a parameter
    pub fn threshold(&self, parameter: Parameter) -> f64 {
        self.thresholds.get(&parameter).copied().unwrap_or(0.0)
    }

    /// Nudge thresholds toward observed outcomes.
    ///
    /// Called only from the engine's calibrate entry point; prediction
    /// itself never mutates the model. Each sample moves thresholds by
    /// (score - 50) / 100 scaled by the learning rate, bounded to half
    /// and one-and-a-half times the factory defaults.
    pub fn adjust_thresholds(&mut self, risk_scores: &[f64], learning_rate: f64) {
        let defaults = Self::default_thresholds();
        for score in risk_scores {
            let delta = (score - 50.0) / 100.0 * learning_rate;
            for (parameter, threshold) in self.thresholds.iter_mut() {
                let base = defaults[parameter];
                *threshold = (*threshold * (1.0 - delta)).clamp(base * 0.5, base * 1.5);
            }
        }
        debug!(samples = risk_scores.len(), "Statistical thresholds calibrated");
    }
}

impl Default for StatisticalModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionModel for StatisticalModel {
    fn id(&self) -> &'static str {
        "statistical"
    }

    fn accuracy(&self) -> f64 {
        self.accuracy
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn score(
        &self,
        reading: &SensorReading,
        window: &[SensorReading],
    ) -> Result<PartialPrediction, DetectionError> {
        let mut risk_score = 0.0;
        let mut factors = Vec::new();

        for parameter in Parameter::ALL {
            let threshold = self.thresholds[&parameter];
            if threshold <= 0.0 {
                return Err(DetectionError::ModelComputation {
                    model: "statistical",
                    reason: format!("non-positive threshold for {}", parameter.as_str()),
                });
            }

            let current = parameter.value_of(reading);
            let exceedance = ((current - threshold) / threshold).max(0.0);
            let contribution = exceedance * self.weights[&parameter] * 100.0;
            risk_score += contribution;

            let trend = compute_trend(&parameter.series(window));
            if trend == Trend::Worsening {
                risk_score += TREND_PENALTY;
            }

            if contribution > FACTOR_FLOOR {
                factors.push(RiskFactor {
                    parameter,
                    contribution,
                    trend,
                    significance: (contribution / 100.0).clamp(0.0, 1.0),
                });
            }
        }

        let confidence = MAX_CONFIDENCE.min(50.0 + window.len() as f64 * 2.0);

        Ok(PartialPrediction {
            risk_score: clamp_score(risk_score),
            confidence,
            factors,
            patterns: Vec::new(),
            time_to_event_hours: None,
        })
    }

    fn calibrate(&mut self, risk_scores: &[f64], learning_rate: f64) {
        self.adjust_thresholds(risk_scores, learning_rate);
    }
}
