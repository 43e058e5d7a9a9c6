//! Delivery Tracking Routes

use axum::{
    extract::{Path, State},
    Json,
};
use notification::{DeliveryState, DeliveryStatus};
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState};

/// Response for an alert's delivery records
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub alert_id: String,
    pub data: Vec<DeliveryStatus>,
    pub count: usize,
}

/// Delivery records for one alert
pub async fn get_deliveries(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
) -> Json<DeliveryResponse> {
    let state = state.read().await;
    let data = state.pipeline.get_delivery_status(&alert_id);

    Json(DeliveryResponse {
        alert_id,
        count: data.len(),
        data,
    })
}

/// Body for delivery state updates (provider callback path)
#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryBody {
    /// New lifecycle state
    pub status: DeliveryState,
    /// Error detail, for failed transitions
    pub error_message: Option<String>,
}

/// Advance one delivery through its lifecycle
pub async fn update_delivery(
    State(state): State<SharedState>,
    Path(delivery_id): Path<String>,
    Json(body): Json<UpdateDeliveryBody>,
) -> Result<Json<DeliveryStatus>, ApiError> {
    let mut state = state.write().await;
    let updated = state
        .pipeline
        .update_delivery(&delivery_id, body.status, body.error_message)?;
    Ok(Json(updated))
}
