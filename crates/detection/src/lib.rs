//! Risk Detection Engine
//!
//! Turns a rolling window of sensor readings into a scored, explainable
//! risk assessment. Three models (statistical, pattern, hybrid) score
//! independently and an ensemble combiner fuses their output; zones with
//! fewer than ten readings fall back to a fixed-threshold basic predictor.

mod basic;
mod ensemble;
mod hybrid;
mod pattern;
mod statistical;
mod statistics;
mod types;

pub use basic::BasicPredictor;
pub use ensemble::{DetectionEngine, EngineConfig};
pub use hybrid::HybridModel;
pub use pattern::{HistoricalPattern, PatternModel, Precursor};
pub use statistical::StatisticalModel;
pub use statistics::{compute_trend, z_score, SeriesStats};
pub use types::{
    DetectionModel, PartialPrediction, PredictionResult, RiskFactor, RiskLevel, Trend,
    MIN_ENSEMBLE_HISTORY,
};

use thiserror::Error;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    /// A single model failed; the ensemble proceeds without it
    #[error("Model '{model}' computation failed: {reason}")]
    ModelComputation { model: &'static str, reason: String },

    /// No model produced a usable score
    #[error("No active detection models produced a score")]
    NoActiveModels,
}
