//! Reading Ingest and Prediction Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use storage::PredictionRecord;
use telemetry::SensorReading;

use crate::{ApiError, SharedState};

/// Response for a single ingested reading
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub zone_id: String,
    pub risk_score: f64,
    pub risk_level: String,
    pub confidence: f64,
    pub time_to_event_hours: Option<f64>,
    pub alert_id: Option<String>,
    pub deduplicated: bool,
    pub deliveries_created: usize,
}

/// Ingest one sensor reading through the pipeline
pub async fn ingest(
    State(state): State<SharedState>,
    Json(reading): Json<SensorReading>,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut state = state.write().await;
    let outcome = state.pipeline.process_reading(reading).await?;

    Ok(Json(IngestResponse {
        zone_id: outcome.prediction.zone_id.clone(),
        risk_score: outcome.prediction.risk_score,
        risk_level: outcome.prediction.risk_level.as_str().to_string(),
        confidence: outcome.prediction.confidence,
        time_to_event_hours: outcome.prediction.time_to_event_hours,
        alert_id: outcome.alert.as_ref().map(|a| a.id.clone()),
        deduplicated: outcome.deduplicated,
        deliveries_created: outcome.deliveries_created,
    }))
}

/// One reading's result inside a batch ingest response
#[derive(Debug, Serialize)]
pub struct BatchReadingResult {
    pub zone_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a batch reading ingest
#[derive(Debug, Serialize)]
pub struct BatchIngestResponse {
    pub results: Vec<BatchReadingResult>,
    pub processed: usize,
    pub rejected: usize,
}

/// Ingest a batch of readings; failures are reported per reading
pub async fn ingest_batch(
    State(state): State<SharedState>,
    Json(readings): Json<Vec<SensorReading>>,
) -> Json<BatchIngestResponse> {
    let mut state = state.write().await;
    let outcomes = state.pipeline.process_readings(readings).await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut rejected = 0;
    for item in outcomes {
        match item.outcome {
            Ok(outcome) => results.push(BatchReadingResult {
                zone_id: item.zone_id,
                status: "ok".to_string(),
                risk_score: Some(outcome.prediction.risk_score),
                risk_level: Some(outcome.prediction.risk_level.as_str().to_string()),
                alert_id: outcome.alert.map(|a| a.id),
                error: None,
            }),
            Err(e) => {
                rejected += 1;
                results.push(BatchReadingResult {
                    zone_id: item.zone_id,
                    status: "error".to_string(),
                    risk_score: None,
                    risk_level: None,
                    alert_id: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let processed = results.len() - rejected;
    Json(BatchIngestResponse {
        results,
        processed,
        rejected,
    })
}

/// One externally computed zone score
#[derive(Debug, Deserialize)]
pub struct ZoneScore {
    pub zone_id: String,
    /// Risk score on the 0-100 scale
    pub risk_score: f64,
}

/// One zone's result inside an assessment response
#[derive(Debug, Serialize)]
pub struct ZoneAssessment {
    pub zone_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliveries_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a batch risk assessment
#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub results: Vec<ZoneAssessment>,
    pub alerts_raised: usize,
}

/// Run alerting over externally computed zone scores
pub async fn assess(
    State(state): State<SharedState>,
    Json(scores): Json<Vec<ZoneScore>>,
) -> Json<AssessmentResponse> {
    let mut state = state.write().await;
    let outcomes = state
        .pipeline
        .process_risk_assessment(scores.into_iter().map(|z| (z.zone_id, z.risk_score)).collect())
        .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut alerts_raised = 0;
    for item in outcomes {
        match item.outcome {
            Ok(outcome) => {
                if outcome.alert.is_some() && !outcome.deduplicated {
                    alerts_raised += 1;
                }
                results.push(ZoneAssessment {
                    zone_id: item.zone_id,
                    status: "ok".to_string(),
                    severity: Some(outcome.severity.as_str().to_string()),
                    alert_id: outcome.alert.map(|a| a.id),
                    deduplicated: Some(outcome.deduplicated),
                    deliveries_created: Some(outcome.deliveries_created),
                    error: None,
                });
            }
            Err(e) => results.push(ZoneAssessment {
                zone_id: item.zone_id,
                status: "error".to_string(),
                severity: None,
                alert_id: None,
                deduplicated: None,
                deliveries_created: None,
                error: Some(e.to_string()),
            }),
        }
    }

    Json(AssessmentResponse {
        results,
        alerts_raised,
    })
}

/// Query parameters for prediction history
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Filter by zone
    pub zone: Option<String>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for prediction history
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub data: Vec<PredictionRecord>,
    pub count: usize,
}

/// Get recent predictions, newest first
pub async fn get_predictions(
    State(state): State<SharedState>,
    Query(params): Query<PredictionQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let state = state.read().await;
    let data = state
        .pipeline
        .repository()
        .get_predictions(params.zone.as_deref(), params.limit)?;

    Ok(Json(PredictionResponse {
        count: data.len(),
        data,
    }))
}
