//! Geotechnical Risk API Server
//!
//! REST surface over the risk pipeline: reading ingest, batch
//! assessment, alert lifecycle and delivery tracking.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod pipeline;
mod rate_limit;
mod routes;
mod settings;

pub use pipeline::{
    AssessmentOutcome, BatchOutcome, Pipeline, PipelineError, ReadingOutcome, ScoreOutcome,
};
pub use rate_limit::{create_governor_config, RateLimitConfig};
pub use settings::{Settings, ZoneSettings};

use alerting::AlertError;
use notification::DispatchError;
use storage::StorageError;

/// Application state shared across handlers
pub struct AppState {
    /// The risk pipeline service
    pub pipeline: Pipeline,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state around a pipeline
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Shared handler state
pub type SharedState = Arc<RwLock<AppState>>;

/// Error wrapper mapping pipeline failures to HTTP responses
pub struct ApiError(pub PipelineError);

impl<E: Into<PipelineError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidReading { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Alert(AlertError::NotFound(_)) => StatusCode::NOT_FOUND,
            PipelineError::Alert(AlertError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            PipelineError::Dispatch(DispatchError::UnknownDelivery(_)) => StatusCode::NOT_FOUND,
            PipelineError::Dispatch(DispatchError::InvalidTransition { .. }) => {
                StatusCode::CONFLICT
            }
            PipelineError::Dispatch(DispatchError::NoProvider(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PipelineError::Storage(
                StorageError::AlertNotFound(_) | StorageError::DeliveryNotFound(_),
            ) => StatusCode::NOT_FOUND,
            PipelineError::Storage(StorageError::Access(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: SystemMetrics,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub zones_monitored: usize,
    pub active_alerts: usize,
    pub prediction_count: usize,
    pub delivery_count: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/readings", post(routes::readings::ingest))
        .route(
            "/api/v1/readings/batch",
            post(routes::readings::ingest_batch),
        )
        .route("/api/v1/assessments", post(routes::readings::assess))
        .route("/api/v1/predictions", get(routes::readings::get_predictions))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/alerts/:id", get(routes::alerts::get_alert))
        .route(
            "/api/v1/alerts/:id/acknowledge",
            post(routes::alerts::acknowledge),
        )
        .route("/api/v1/alerts/:id/resolve", post(routes::alerts::resolve))
        .route("/api/v1/alerts/:id/send", post(routes::alerts::send))
        .route(
            "/api/v1/alerts/:id/deliveries",
            get(routes::deliveries::get_deliveries),
        )
        .route(
            "/api/v1/deliveries/:id",
            post(routes::deliveries::update_delivery),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let repository = state.pipeline.repository();
    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: SystemMetrics {
            zones_monitored: state.pipeline.zone_count(),
            active_alerts: state.pipeline.active_alerts().len(),
            prediction_count: repository.prediction_count(),
            delivery_count: repository.delivery_count(),
        },
    };

    Json(response)
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server with the given settings
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = settings.build_pipeline();
    let state: SharedState = Arc::new(RwLock::new(AppState::new(pipeline)));

    // Periodic dedup-cache sweep
    let sweep_state = state.clone();
    let sweep_interval = Duration::from_secs(settings.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let swept = sweep_state.write().await.pipeline.sweep_stale();
            if swept > 0 {
                info!(swept, "Swept stale dedup entries");
            }
        }
    });

    let governor = create_governor_config(&settings.rate_limit());
    let app = create_router(state).layer(GovernorLayer { config: governor });

    info!("Starting API server on {}", settings.bind_addr);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
