//! Historical Pattern Model
//!
//! Matches the current reading against a static library of named failure
//! patterns and scores window-wide anomalies via parameter z-scores.

use crate::statistics::{z_score, SeriesStats};
use crate::types::{clamp_score, DetectionModel, PartialPrediction, RiskFactor, Trend};
use crate::DetectionError;
use telemetry::{Parameter, SensorReading};

/// Match score above which a pattern's declared duration becomes the
/// predicted time to event
const TIME_TO_EVENT_MATCH: f64 = 0.7;

/// Window length required before anomaly z-scores are computed
const MIN_ANOMALY_HISTORY: usize = 20;

/// Weights for the combined pattern-path risk score
const RATE_WEIGHT: f64 = 0.3;
const PATTERN_WEIGHT: f64 = 0.4;
const ANOMALY_WEIGHT: f64 = 0.3;

/// One precursor condition of a historical pattern
#[derive(Debug, Clone)]
pub enum Precursor {
    /// A single parameter exceeding a level adds `weight` to the match
    Exceeds {
        parameter: Parameter,
        level: f64,
        weight: f64,
    },
    /// A set of conditions of which at least `min_true` must hold
    Composite {
        conditions: Vec<(Parameter, f64)>,
        min_true: usize,
        weight: f64,
    },
}

impl Precursor {
    /// Match weight contributed by this precursor for a reading
    fn match_weight(&self, reading: &SensorReading) -> f64 {
        match self {
            Precursor::Exceeds {
                parameter,
                level,
                weight,
            } => {
                if parameter.value_of(reading) > *level {
                    *weight
                } else {
                    0.0
                }
            }
            Precursor::Composite {
                conditions,
                min_true,
                weight,
            } => {
                let held = conditions
                    .iter()
                    .filter(|(p, level)| p.value_of(reading) > *level)
                    .count();
                if held >= *min_true {
                    *weight
                } else {
                    0.0
                }
            }
        }
    }
}

/// A named failure pattern from the historical record
#[derive(Debug, Clone)]
pub struct HistoricalPattern {
    /// Pattern name as reported in predictions
    pub name: &'static str,
    /// How often this pattern has been observed
    pub frequency: &'static str,
    /// Typical outcome severity when the pattern completes
    pub severity: &'static str,
    /// Precursor conditions and their match weights
    pub precursors: Vec<Precursor>,
    /// Expected hours from full precursor match to failure
    pub expected_duration_hours: f64,
}

impl HistoricalPattern {
    /// Match score (0.0 to 1.0) of this pattern against a reading
    pub fn match_score(&self, reading: &SensorReading) -> f64 {
        self.precursors
            .iter()
            .map(|p| p.match_weight(reading))
            .sum::<f64>()
            .min(1.0)
    }
}

/// The static pattern library consulted at runtime
pub fn pattern_library() -> Vec<HistoricalPattern> {
    vec![
        HistoricalPattern {
            name: "rainfall_triggered_failure",
            frequency: "seasonal",
            severity: "high",
            precursors: vec![
                Precursor::Exceeds {
                    parameter: Parameter::Rainfall,
                    level: 25.0,
                    weight: 0.3,
                },
                Precursor::Exceeds {
                    parameter: Parameter::SoilMoisture,
                    level: 70.0,
                    weight: 0.3,
                },
                Precursor::Composite {
                    conditions: vec![
                        (Parameter::Displacement, 10.0),
                        (Parameter::Strain, 600.0),
                        (Parameter::PorePressure, 450.0),
                    ],
                    min_true: 2,
                    weight: 0.4,
                },
            ],
            expected_duration_hours: 12.0,
        },
        HistoricalPattern {
            name: "seismic_destabilization",
            frequency: "rare",
            severity: "critical",
            precursors: vec![
                Precursor::Exceeds {
                    parameter: Parameter::Vibration,
                    level: 5.0,
                    weight: 0.3,
                },
                Precursor::Exceeds {
                    parameter: Parameter::Displacement,
                    level: 12.0,
                    weight: 0.3,
                },
                Precursor::Composite {
                    conditions: vec![
                        (Parameter::TiltAngle, 3.0),
                        (Parameter::Strain, 700.0),
                        (Parameter::Displacement, 15.0),
                    ],
                    min_true: 2,
                    weight: 0.4,
                },
            ],
            expected_duration_hours: 6.0,
        },
        HistoricalPattern {
            name: "pore_pressure_buildup",
            frequency: "recurrent",
            severity: "high",
            precursors: vec![
                Precursor::Exceeds {
                    parameter: Parameter::PorePressure,
                    level: 450.0,
                    weight: 0.35,
                },
                Precursor::Exceeds {
                    parameter: Parameter::SoilMoisture,
                    level: 75.0,
                    weight: 0.25,
                },
                Precursor::Composite {
                    conditions: vec![
                        (Parameter::Rainfall, 20.0),
                        (Parameter::Strain, 650.0),
                        (Parameter::Displacement, 8.0),
                    ],
                    min_true: 2,
                    weight: 0.4,
                },
            ],
            expected_duration_hours: 24.0,
        },
        HistoricalPattern {
            name: "progressive_creep",
            frequency: "chronic",
            severity: "medium",
            precursors: vec![
                Precursor::Exceeds {
                    parameter: Parameter::Displacement,
                    level: 10.0,
                    weight: 0.25,
                },
                Precursor::Exceeds {
                    parameter: Parameter::TiltAngle,
                    level: 3.0,
                    weight: 0.25,
                },
                Precursor::Composite {
                    conditions: vec![
                        (Parameter::Strain, 600.0),
                        (Parameter::PorePressure, 450.0),
                        (Parameter::SoilMoisture, 65.0),
                    ],
                    min_true: 2,
                    weight: 0.5,
                },
            ],
            expected_duration_hours: 48.0,
        },
    ]
}

/// Pattern and anomaly model
pub struct PatternModel {
    library: Vec<HistoricalPattern>,
    accuracy: f64,
    active: bool,
}

impl PatternModel {
    /// Create with the built-in pattern library
    pub fn new() -> Self {
        Self {
            library: pattern_library(),
            accuracy: 82.0,
            active: true,
        }
    }

    /// Anomaly score (0.0 to 1.0) from parameter z-scores over the window.
    ///
    /// Requires at least 20 readings; shorter windows score 0.
    pub fn anomaly_score(&self, reading: &SensorReading, window: &[SensorReading]) -> f64 {
        if window.len() < MIN_ANOMALY_HISTORY {
            return 0.0;
        }

        let mut score: f64 = 0.0;
        for parameter in Parameter::ALL {
            let stats = SeriesStats::compute(&parameter.series(window));
            let z = z_score(parameter.value_of(reading), &stats).abs();
            if z > 3.0 {
                score += 0.2;
            } else if z > 2.0 {
                score += 0.1;
            }
        }
        score.min(1.0)
    }

    /// Rate-of-change score (0.0 to 1.0) over the deformation parameters
    fn rate_score(&self, window: &[SensorReading]) -> f64 {
        if window.len() < 2 {
            return 0.0;
        }

        // Normalize each parameter's mean step change against a scale at
        // which movement is clearly accelerating.
        let scales = [
            (Parameter::Displacement, 2.0),
            (Parameter::Strain, 50.0),
            (Parameter::PorePressure, 25.0),
        ];

        let mut score = 0.0;
        for (parameter, scale) in scales {
            let stats = SeriesStats::compute(&parameter.series(window));
            score += (stats.rate_of_change / scale).min(1.0) / scales.len() as f64;
        }
        score
    }

    /// Best-matching pattern and its score for a reading
    fn best_match(&self, reading: &SensorReading) -> Option<(&HistoricalPattern, f64)> {
        self.library
            .iter()
            .map(|p| (p, p.match_score(reading)))
            .filter(|(_, score)| *score > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl Default for PatternModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionModel for PatternModel {
    fn id(&self) -> &'static str {
        "pattern"
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
        let best = self.best_match(reading);
        let pattern_score = best.map(|(_, s)| s).unwrap_or(0.0);
        let anomaly = self.anomaly_score(reading, window);
        let rate = self.rate_score(window);

        let risk_score = clamp_score(
            (RATE_WEIGHT * rate + PATTERN_WEIGHT * pattern_score + ANOMALY_WEIGHT * anomaly)
                * 100.0,
        );

        let mut patterns = Vec::new();
        let mut time_to_event_hours = None;
        if let Some((pattern, score)) = best {
            patterns.push(pattern.name.to_string());
            if score > TIME_TO_EVENT_MATCH {
                time_to_event_hours = Some(pattern.expected_duration_hours);
            }
        }

        // Report strongly anomalous parameters as factors
        let mut factors = Vec::new();
        if window.len() >= MIN_ANOMALY_HISTORY {
            for parameter in Parameter::ALL {
                let stats = SeriesStats::compute(&parameter.series(window));
                let z = z_score(parameter.value_of(reading), &stats).abs();
                if z > 2.0 {
                    factors.push(RiskFactor {
                        parameter,
                        contribution: (z.min(5.0) / 5.0) * 20.0,
                        trend: Trend::Worsening,
                        significance: (z / 5.0).min(1.0),
                    });
                }
            }
        }

        Ok(PartialPrediction {
            risk_score,
            confidence: pattern_score.max(anomaly) * 100.0,
            factors,
            patterns,
            time_to_event_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storm_reading() -> SensorReading {
        SensorReading {
            zone_id: "zone-a".to_string(),
            rainfall_mm_hr: 30.0,
            soil_moisture_pct: 80.0,
            displacement_mm: 12.0,
            strain_ue: 700.0,
            pore_pressure_kpa: 400.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_pattern_match_sets_time_to_event() {
        let model = PatternModel::new();
        let reading = storm_reading();
        // rainfall (0.3) + soil moisture (0.3) + two of three composite
        // conditions true (0.4) = 1.0 match
        let partial = model.score(&reading, &[reading.clone()]).unwrap();

        assert!(partial.patterns.contains(&"rainfall_triggered_failure".to_string()));
        assert_eq!(partial.time_to_event_hours, Some(12.0));
        assert_eq!(partial.confidence, 100.0);
    }

    #[test]
    fn test_weak_match_has_no_time_to_event() {
        let model = PatternModel::new();
        let reading = SensorReading {
            zone_id: "zone-a".to_string(),
            rainfall_mm_hr: 30.0,
            ..Default::default()
        };

        let partial = model.score(&reading, &[reading.clone()]).unwrap();
        assert!(partial.time_to_event_hours.is_none());
        assert!(!partial.patterns.is_empty());
    }

    #[test]
    fn test_anomaly_requires_history() {
        let model = PatternModel::new();
        let reading = storm_reading();
        let short_window = vec![SensorReading::default(); 10];
        assert_eq!(model.anomaly_score(&reading, &short_window), 0.0);
    }

    #[test]
    fn test_anomaly_scores_outlier() {
        let model = PatternModel::new();
        // Stable noise-free baseline, then a large displacement spike.
        let mut window: Vec<SensorReading> = (0..30)
            .map(|i| SensorReading {
                zone_id: "zone-a".to_string(),
                displacement_mm: 10.0 + (i % 2) as f64 * 0.2,
                ..Default::default()
            })
            .collect();
        let spike = SensorReading {
            zone_id: "zone-a".to_string(),
            displacement_mm: 25.0,
            ..Default::default()
        };
        window.push(spike.clone());

        let score = model.anomaly_score(&spike, &window);
        assert!(score >= 0.2, "spike should register |z| > 3, got {}", score);
    }

    #[test]
    fn test_no_match_scores_zero_pattern_component(){
        let model = PatternModel::new();
        let reading = SensorReading {
            zone_id: "zone-a".to_string(),
            ..Default::default()
        };
        let partial = model.score(&reading, &[reading.clone()]).unwrap();
        assert_eq!(partial.risk_score, 0.0);
        assert!(partial.patterns.is_empty());
    }
}
