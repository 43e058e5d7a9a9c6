//! Hybrid Model
//!
//! Weighted combination of the statistical and pattern paths plus an
//! environmental loading term (rainfall, accumulation, temperature,
//! saturation, wind).

use crate::pattern::PatternModel;
use crate::statistical::StatisticalModel;
use crate::types::{clamp_score, DetectionModel, PartialPrediction};
use crate::DetectionError;
use telemetry::SensorReading;

/// Default sub-model weights
const STATISTICAL_WEIGHT: f64 = 0.3;
const PATTERN_WEIGHT: f64 = 0.4;
const ENVIRONMENTAL_WEIGHT: f64 = 0.3;

/// Readings considered for cumulative rainfall (one day at the nominal
/// ingest cadence)
const CUMULATIVE_RAINFALL_READINGS: usize = 24;

/// Pattern name reported when environmental loading dominates
const ENVIRONMENTAL_PATTERN: &str = "environmental_loading";

/// Hybrid of statistical, pattern, and environmental scoring
pub struct HybridModel {
    statistical: StatisticalModel,
    pattern: PatternModel,
    accuracy: f64,
    active: bool,
}

impl HybridModel {
    /// Create with default sub-models
    pub fn new() -> Self {
        Self {
            statistical: StatisticalModel::new(),
            pattern: PatternModel::new(),
            accuracy: 88.0,
            active: true,
        }
    }

    /// Environmental risk term (0-100) from fixed point bands.
    pub fn environmental_risk(&self, reading: &SensorReading, window: &[SensorReading]) -> f64 {
        let mut score: f64 = 0.0;

        // Rainfall intensity
        if reading.rainfall_mm_hr > 30.0 {
            score += 25.0;
        } else if reading.rainfall_mm_hr > 20.0 {
            score += 15.0;
        } else if reading.rainfall_mm_hr > 10.0 {
            score += 5.0;
        }

        // Cumulative rainfall over the last day of readings
        let cumulative: f64 = window
            .iter()
            .rev()
            .take(CUMULATIVE_RAINFALL_READINGS)
            .map(|r| r.rainfall_mm_hr)
            .sum();
        if cumulative > 200.0 {
            score += 25.0;
        } else if cumulative > 120.0 {
            score += 15.0;
        }

        // Temperature extremes (freeze-thaw or desiccation)
        if reading.temperature_c < -10.0 || reading.temperature_c > 40.0 {
            score += 10.0;
        }

        // Soil saturation
        if reading.soil_moisture_pct > 85.0 {
            score += 20.0;
        } else if reading.soil_moisture_pct > 70.0 {
            score += 10.0;
        }

        // Wind loading on surface structures
        if reading.wind_speed_ms > 20.0 {
            score += 10.0;
        } else if reading.wind_speed_ms > 12.0 {
            score += 5.0;
        }

        score.min(100.0)
    }
}

impl Default for HybridModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionModel for HybridModel {
    fn id(&self) -> &'static str {
        "hybrid"
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
        let statistical = self.statistical.score(reading, window)?;
        let pattern = self.pattern.score(reading, window)?;
        let environmental = self.environmental_risk(reading, window);

        let risk_score = clamp_score(
            STATISTICAL_WEIGHT * statistical.risk_score
                + PATTERN_WEIGHT * pattern.risk_score
                + ENVIRONMENTAL_WEIGHT * environmental,
        );

        let mut factors = statistical.factors;
        factors.extend(pattern.factors);

        let mut patterns = pattern.patterns;
        if environmental > 50.0 {
            patterns.push(ENVIRONMENTAL_PATTERN.to_string());
        }

        Ok(PartialPrediction {
            risk_score,
            confidence: statistical.confidence.max(pattern.confidence),
            factors,
            patterns,
            time_to_event_hours: pattern.time_to_event_hours,
        })
    }

    fn calibrate(&mut self, risk_scores: &[f64], learning_rate: f64) {
        self.statistical.calibrate(risk_scores, learning_rate);
    }
}
