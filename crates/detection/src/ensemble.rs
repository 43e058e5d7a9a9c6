//! Ensemble Combiner and Detection Engine

use crate::basic::BasicPredictor;
use crate::hybrid::HybridModel;
use crate::pattern::PatternModel;
use crate::statistical::StatisticalModel;
use crate::types::{
    clamp_score, DetectionModel, PartialPrediction, PredictionResult, RiskFactor, RiskLevel,
    MAX_FACTORS, MIN_ENSEMBLE_HISTORY,
};
use crate::DetectionError;
use std::collections::HashMap;
use telemetry::{Parameter, SensorReading, ZoneWindows};
use tracing::{debug, warn};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-zone window capacity
    pub window_capacity: usize,
    /// Learning rate applied during calibration
    pub learning_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: telemetry::WINDOW_CAPACITY,
            learning_rate: 0.05,
        }
    }
}

/// Multi-model detection engine owning the per-zone windows.
///
/// Readings for one zone must be fed in arrival order; zones are
/// independent of one another.
pub struct DetectionEngine {
    windows: ZoneWindows,
    models: Vec<Box<dyn DetectionModel>>,
    basic: BasicPredictor,
    config: EngineConfig,
}

impl DetectionEngine {
    /// Create an engine with the standard three-model ensemble
    pub fn new(config: EngineConfig) -> Self {
        let models: Vec<Box<dyn DetectionModel>> = vec![
            Box::new(StatisticalModel::new()),
            Box::new(PatternModel::new()),
            Box::new(HybridModel::new()),
        ];

        Self {
            windows: ZoneWindows::with_capacity(config.window_capacity),
            models,
            basic: BasicPredictor::new(),
            config,
        }
    }

    /// Create an engine with a custom model set (for tests and tuning)
    pub fn with_models(config: EngineConfig, models: Vec<Box<dyn DetectionModel>>) -> Self {
        Self {
            windows: ZoneWindows::with_capacity(config.window_capacity),
            models,
            basic: BasicPredictor::new(),
            config,
        }
    }

    /// Ingest one reading and produce a fused prediction for its zone.
    ///
    /// Appends to the zone's window first, then scores. Zones with fewer
    /// than ten readings use the basic predictor; individual model
    /// failures are isolated and the ensemble proceeds without them.
    pub fn predict(&mut self, reading: SensorReading) -> PredictionResult {
        let window = self.windows.push(reading.clone()).to_vec();

        if window.len() < MIN_ENSEMBLE_HISTORY {
            debug!(
                zone_id = %reading.zone_id,
                window_len = window.len(),
                "Insufficient history, using basic predictor"
            );
            return self.basic.predict(&reading);
        }

        let mut partials = Vec::new();
        for model in &self.models {
            if !model.is_active() {
                continue;
            }
            match model.score(&reading, &window) {
                Ok(partial) => partials.push((model.accuracy(), partial)),
                Err(e) => {
                    warn!(model = model.id(), error = %e, "Model failed, excluding from ensemble");
                }
            }
        }

        match Self::combine(&reading.zone_id, &partials) {
            Ok(result) => result,
            Err(e) => {
                warn!(zone_id = %reading.zone_id, error = %e, "Falling back to basic predictor");
                self.basic.predict(&reading)
            }
        }
    }

    /// Number of readings held for a zone
    pub fn window_len(&self, zone_id: &str) -> usize {
        self.windows.get(zone_id).map(|w| w.len()).unwrap_or(0)
    }

    /// Zones currently tracked
    pub fn zone_count(&self) -> usize {
        self.windows.zone_count()
    }

    /// Adjust model thresholds from a batch of observed risk scores.
    ///
    /// Kept separate from `predict` so prediction stays side-effect-free
    /// apart from the window append.
    pub fn calibrate(&mut self, risk_scores: &[f64]) {
        for model in &mut self.models {
            model.calibrate(risk_scores, self.config.learning_rate);
        }
    }

    /// Accuracy-weighted fusion of the model partials.
    fn combine(
        zone_id: &str,
        partials: &[(f64, PartialPrediction)],
    ) -> Result<PredictionResult, DetectionError> {
        if partials.is_empty() {
            return Err(DetectionError::NoActiveModels);
        }

        let weight_sum: f64 = partials.iter().map(|(acc, _)| acc / 100.0).sum();
        let risk_score = clamp_score(
            partials
                .iter()
                .map(|(acc, p)| p.risk_score * (acc / 100.0))
                .sum::<f64>()
                / weight_sum,
        );

        let confidence = clamp_score(
            partials
                .iter()
                .map(|(_, p)| p.confidence)
                .fold(0.0, f64::max),
        );

        // Keep the strongest factor per parameter, then rank
        let mut by_parameter: HashMap<Parameter, RiskFactor> = HashMap::new();
        for (_, partial) in partials {
            for factor in &partial.factors {
                let keep = by_parameter
                    .get(&factor.parameter)
                    .map(|existing| factor.contribution.abs() > existing.contribution.abs())
                    .unwrap_or(true);
                if keep {
                    by_parameter.insert(factor.parameter, factor.clone());
                }
            }
        }
        let mut factors: Vec<RiskFactor> = by_parameter.into_values().collect();
        factors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        factors.truncate(MAX_FACTORS);

        let mut patterns = Vec::new();
        for (_, partial) in partials {
            for name in &partial.patterns {
                if !patterns.contains(name) {
                    patterns.push(name.clone());
                }
            }
        }

        let time_to_event_hours = partials
            .iter()
            .filter_map(|(_, p)| p.time_to_event_hours)
            .fold(None, |acc: Option<f64>, t| {
                Some(acc.map_or(t, |a| a.min(t)))
            });

        let risk_level = RiskLevel::from_score(risk_score);
        let recommendations = recommendations_for(risk_level, &factors, &patterns);

        Ok(PredictionResult {
            zone_id: zone_id.to_string(),
            risk_score,
            risk_level,
            confidence,
            time_to_event_hours,
            factors,
            patterns,
            recommendations,
        })
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Build the operator recommendation list for a prediction.
///
/// Per-tier base actions plus factor- and pattern-specific additions,
/// deduplicated in order.
fn recommendations_for(
    level: RiskLevel,
    factors: &[RiskFactor],
    patterns: &[String],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: &str, out: &mut Vec<String>| {
        if !out.iter().any(|existing| existing == s) {
            out.push(s.to_string());
        }
    };

    let base: &[&str] = match level {
        RiskLevel::Low => &["Maintain routine monitoring schedule"],
        RiskLevel::Medium => &[
            "Increase monitoring frequency for the zone",
            "Review recent readings with the duty geotechnician",
        ],
        RiskLevel::High => &[
            "Restrict non-essential access to the zone",
            "Prepare equipment relocation plan",
            "Notify the response coordinator",
        ],
        RiskLevel::Critical => &[
            "Evacuate personnel from the zone immediately",
            "Halt all operations in and below the zone",
            "Activate the emergency response plan",
        ],
    };
    for action in base {
        push(action, &mut out);
    }

    for factor in factors {
        let action = match factor.parameter {
            Parameter::Displacement => "Deploy additional displacement gauges on the active face",
            Parameter::Strain => "Inspect anchors and retaining systems for strain damage",
            Parameter::PorePressure => "Check drainage systems and relieve pore pressure",
            Parameter::Vibration => "Suspend blasting and heavy equipment work near the zone",
            Parameter::Rainfall => "Inspect surface drainage and diversion channels",
            Parameter::SoilMoisture => "Verify dewatering capacity against current saturation",
            Parameter::TiltAngle => "Survey crest monuments for rotation",
            Parameter::Temperature | Parameter::WindSpeed => continue,
        };
        push(action, &mut out);
    }

    for pattern in patterns {
        let action = match pattern.as_str() {
            "rainfall_triggered_failure" => "Track the weather forecast and pre-position pumps",
            "seismic_destabilization" => "Review regional seismic activity reports",
            "pore_pressure_buildup" => "Increase piezometer reading frequency",
            "progressive_creep" => "Schedule a detailed displacement survey",
            "environmental_loading" => "Track storm system development for the area",
            _ => continue,
        };
        push(action, &mut out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(zone: &str) -> SensorReading {
        SensorReading {
            zone_id: zone.to_string(),
            displacement_mm: 5.0,
            strain_ue: 200.0,
            temperature_c: 15.0,
            soil_moisture_pct: 40.0,
            ..Default::default()
        }
    }

    fn storm_reading(zone: &str) -> SensorReading {
        SensorReading {
            zone_id: zone.to_string(),
            displacement_mm: 35.0,
            strain_ue: 1800.0,
            pore_pressure_kpa: 900.0,
            vibration_hz: 9.0,
            rainfall_mm_hr: 40.0,
            soil_moisture_pct: 92.0,
            tilt_angle_deg: 8.0,
            temperature_c: 15.0,
            wind_speed_ms: 22.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_history_uses_basic_predictor() {
        let mut engine = DetectionEngine::default();
        let result = engine.predict(reading("zone-a"));

        assert_eq!(result.confidence, 50.0);
        assert_eq!(result.patterns, vec!["threshold_exceedance".to_string()]);
    }

    #[test]
    fn test_ensemble_after_ten_readings() {
        let mut engine = DetectionEngine::default();
        for _ in 0..9 {
            engine.predict(reading("zone-a"));
        }
        let result = engine.predict(reading("zone-a"));

        assert_eq!(engine.window_len("zone-a"), 10);
        // Ensemble confidence comes from the statistical path, not the
        // basic predictor's fixed 50
        assert!(result.confidence >= 70.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_scores_always_clamped() {
        let mut engine = DetectionEngine::default();
        for _ in 0..30 {
            let result = engine.predict(storm_reading("zone-a"));
            assert!(result.risk_score >= 0.0 && result.risk_score <= 100.0);
            assert!(result.confidence >= 0.0 && result.confidence <= 100.0);
        }
    }

    #[test]
    fn test_storm_is_high_or_critical() {
        let mut engine = DetectionEngine::default();
        for _ in 0..20 {
            engine.predict(storm_reading("zone-a"));
        }
        let result = engine.predict(storm_reading("zone-a"));

        assert!(result.risk_level >= RiskLevel::High, "got {:?}", result.risk_level);
        assert!(!result.factors.is_empty());
        assert!(result.factors.len() <= 5);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_factors_unique_per_parameter_and_sorted() {
        let mut engine = DetectionEngine::default();
        for _ in 0..25 {
            engine.predict(storm_reading("zone-a"));
        }
        let result = engine.predict(storm_reading("zone-a"));

        let mut seen = std::collections::HashSet::new();
        for factor in &result.factors {
            assert!(seen.insert(factor.parameter), "duplicate parameter factor");
        }
        for pair in result.factors.windows(2) {
            assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
        }
    }

    #[test]
    fn test_zones_are_independent() {
        let mut engine = DetectionEngine::default();
        for _ in 0..20 {
            engine.predict(reading("zone-a"));
        }
        // zone-b has no history yet, so it takes the basic path
        let result = engine.predict(reading("zone-b"));
        assert_eq!(result.confidence, 50.0);
        assert_eq!(engine.zone_count(), 2);
    }

    #[test]
    fn test_failing_model_is_isolated() {
        struct FailingModel;
        impl DetectionModel for FailingModel {
            fn id(&self) -> &'static str {
                "failing"
            }
            fn accuracy(&self) -> f64 {
                99.0
            }
            fn is_active(&self) -> bool {
                true
            }
            fn score(
                &self,
                _reading: &SensorReading,
                _window: &[SensorReading],
            ) -> Result<PartialPrediction, DetectionError> {
                Err(DetectionError::ModelComputation {
                    model: "failing",
                    reason: "synthetic failure".to_string(),
                })
            }
        }

        let models: Vec<Box<dyn DetectionModel>> = vec![
            Box::new(FailingModel),
            Box::new(StatisticalModel::new()),
        ];
        let mut engine = DetectionEngine::with_models(EngineConfig::default(), models);

        for _ in 0..15 {
            let result = engine.predict(reading("zone-a"));
            // Statistical model still produces a usable prediction
            assert!(result.risk_score >= 0.0);
        }
    }

    #[test]
    fn test_all_models_failing_falls_back_to_basic() {
        struct FailingModel;
        impl DetectionModel for FailingModel {
            fn id(&self) -> &'static str {
                "failing"
            }
            fn accuracy(&self) -> f64 {
                99.0
            }
            fn is_active(&self) -> bool {
                true
            }
            fn score(
                &self,
                _reading: &SensorReading,
                _window: &[SensorReading],
            ) -> Result<PartialPrediction, DetectionError> {
                Err(DetectionError::ModelComputation {
                    model: "failing",
                    reason: "synthetic failure".to_string(),
                })
            }
        }

        let mut engine = DetectionEngine::with_models(
            EngineConfig::default(),
            vec![Box::new(FailingModel)],
        );
        for _ in 0..12 {
            let result = engine.predict(reading("zone-a"));
            assert_eq!(result.confidence, 50.0); // Basic predictor signature
        }
    }

    #[test]
    fn test_recommendations_deduplicated() {
        let factors = vec![
            RiskFactor {
                parameter: Parameter::Rainfall,
                contribution: 20.0,
                trend: crate::types::Trend::Worsening,
                significance: 0.2,
            },
            RiskFactor {
                parameter: Parameter::Displacement,
                contribution: 15.0,
                trend: crate::types::Trend::Stable,
                significance: 0.15,
            },
        ];
        let patterns = vec!["rainfall_triggered_failure".to_string()];
        let recs = recommendations_for(RiskLevel::High, &factors, &patterns);

        let mut unique = std::collections::HashSet::new();
        for rec in &recs {
            assert!(unique.insert(rec.clone()), "duplicate recommendation");
        }
        assert!(recs.iter().any(|r| r.contains("drainage")));
    }
}
