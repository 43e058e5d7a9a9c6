//! Alert Routes

use alerting::Alert;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use notification::DeliveryStatus;
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState};

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Filter by zone
    pub zone: Option<String>,
    /// Only currently active alerts
    #[serde(default)]
    pub active: bool,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<Alert>,
    pub count: usize,
}

/// List alerts, newest first
pub async fn get_alerts(
    State(state): State<SharedState>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let state = state.read().await;

    let data = if params.active {
        state
            .pipeline
            .active_alerts()
            .into_iter()
            .filter(|a| params.zone.as_deref().map_or(true, |z| a.zone_id == z))
            .take(params.limit)
            .collect()
    } else {
        state
            .pipeline
            .repository()
            .get_alerts(params.zone.as_deref(), params.limit)?
    };

    Ok(Json(AlertResponse {
        count: data.len(),
        data,
    }))
}

/// Get one alert by id
pub async fn get_alert(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    let state = state.read().await;
    let alert = state.pipeline.repository().get_alert(&alert_id)?;
    Ok(Json(alert))
}

/// Acknowledge an active alert
pub async fn acknowledge(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    let mut state = state.write().await;
    let alert = state.pipeline.acknowledge_alert(&alert_id)?;
    Ok(Json(alert))
}

/// Body for the resolve endpoint
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    /// Free-text resolution note
    #[serde(default = "default_resolution")]
    pub resolution: String,
}

fn default_resolution() -> String {
    "resolved".to_string()
}

/// Resolve an alert
pub async fn resolve(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<Alert>, ApiError> {
    let mut state = state.write().await;
    let alert = state.pipeline.resolve_alert(&alert_id, &body.resolution)?;
    Ok(Json(alert))
}

/// Body for the manual send endpoint
#[derive(Debug, Default, Deserialize)]
pub struct SendBody {
    /// Explicit target devices; omitted means normal recipient selection
    #[serde(default)]
    pub device_ids: Option<Vec<String>>,
}

/// Response for the manual send endpoint
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub alert_id: String,
    pub deliveries: Vec<DeliveryStatus>,
}

/// Manually (re-)dispatch an alert
pub async fn send(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
    Json(body): Json<SendBody>,
) -> Result<Json<SendResponse>, ApiError> {
    let mut state = state.write().await;
    let deliveries = state
        .pipeline
        .send_alert(&alert_id, body.device_ids.as_deref())
        .await?;

    Ok(Json(SendResponse {
        alert_id,
        deliveries,
    }))
}
