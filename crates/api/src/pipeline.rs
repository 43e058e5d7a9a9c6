//! Risk Pipeline Service
//!
//! Wires validation, detection, alerting, dispatch and storage into one
//! ingest path. Each reading flows: validate, window + score, classify,
//! dedup, dispatch, track.

use alerting::{Alert, AlertError, AlertManager, AlertPolicy, Severity};
use chrono::Utc;
use data_validator::{ValidationConfig, Validator};
use detection::{DetectionEngine, EngineConfig, PredictionResult};
use notification::{DeliveryState, DeliveryStatus, DeliveryTracker, Dispatcher};
use std::collections::HashMap;
use std::sync::Arc;
use storage::{PredictionRecord, Repository, StorageError};
use telemetry::SensorReading;
use thiserror::Error;
use tracing::{debug, info};

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading failed range or finiteness validation
    #[error("Invalid reading for zone {zone_id}: {}", errors.join("; "))]
    InvalidReading {
        zone_id: String,
        errors: Vec<String>,
    },

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Dispatch(#[from] notification::DispatchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of processing one reading through the pipeline
#[derive(Debug, Clone)]
pub struct ReadingOutcome {
    /// Ensemble prediction for the zone
    pub prediction: PredictionResult,
    /// Alert raised by this reading, if severity warranted one
    pub alert: Option<Alert>,
    /// True when an existing alert suppressed a new one
    pub deduplicated: bool,
    /// Delivery records created by immediate dispatch
    pub deliveries_created: usize,
}

/// Per-reading outcome of a batch ingest
pub struct BatchOutcome {
    pub zone_id: String,
    pub outcome: Result<ReadingOutcome, PipelineError>,
}

/// Outcome of classifying one externally supplied zone score
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Severity band for the supplied score
    pub severity: Severity,
    /// Alert raised, if severity warranted one
    pub alert: Option<Alert>,
    /// True when an existing alert suppressed a new one
    pub deduplicated: bool,
    /// Delivery records created by immediate dispatch
    pub deliveries_created: usize,
}

/// Per-zone outcome of a batch risk assessment
pub struct AssessmentOutcome {
    pub zone_id: String,
    pub outcome: Result<ScoreOutcome, PipelineError>,
}

/// End-to-end risk pipeline over the crate seams
pub struct Pipeline {
    validator: Validator,
    engine: DetectionEngine,
    alerts: AlertManager,
    dispatcher: Dispatcher,
    tracker: DeliveryTracker,
    repository: Arc<Repository>,
    /// Display names per zone id; unmapped zones fall back to the id
    zone_names: HashMap<String, String>,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        alert_policy: AlertPolicy,
        dispatcher: Dispatcher,
        repository: Arc<Repository>,
        zone_names: HashMap<String, String>,
    ) -> Self {
        info!(zones_named = zone_names.len(), "Assembling risk pipeline");
        Self {
            validator: Validator::new(ValidationConfig::default()),
            engine: DetectionEngine::new(EngineConfig::default()),
            alerts: AlertManager::new(alert_policy),
            dispatcher,
            tracker: DeliveryTracker::new(),
            repository,
            zone_names,
        }
    }

    fn zone_name(&self, zone_id: &str) -> String {
        self.zone_names
            .get(zone_id)
            .cloned()
            .unwrap_or_else(|| zone_id.to_string())
    }

    /// Process one sensor reading end to end.
    ///
    /// Invalid readings are rejected before they reach the window.
    pub async fn process_reading(
        &mut self,
        reading: SensorReading,
    ) -> Result<ReadingOutcome, PipelineError> {
        let validation = self.validator.validate_reading(&reading);
        if !validation.valid {
            return Err(PipelineError::InvalidReading {
                zone_id: reading.zone_id.clone(),
                errors: validation.errors.iter().map(|e| e.to_string()).collect(),
            });
        }

        let zone_id = reading.zone_id.clone();
        let prediction = self.engine.predict(reading);

        self.repository.insert_prediction(PredictionRecord {
            zone_id: zone_id.clone(),
            timestamp: Utc::now(),
            risk_score: prediction.risk_score,
            risk_level: prediction.risk_level.as_str().to_string(),
            confidence: prediction.confidence,
            time_to_event_hours: prediction.time_to_event_hours,
        })?;

        match self.classify_and_dispatch(&zone_id, prediction.risk_score).await? {
            Some((alert, deduplicated, deliveries_created)) => Ok(ReadingOutcome {
                prediction,
                alert: Some(alert),
                deduplicated,
                deliveries_created,
            }),
            None => {
                debug!(zone_id, score = prediction.risk_score, "No alert warranted");
                Ok(ReadingOutcome {
                    prediction,
                    alert: None,
                    deduplicated: false,
                    deliveries_created: 0,
                })
            }
        }
    }

    /// Classify a score for a zone, persisting and dispatching any alert.
    ///
    /// Returns the alert plus its dedup and dispatch results, or None
    /// when the score stays below the medium band.
    async fn classify_and_dispatch(
        &mut self,
        zone_id: &str,
        engine_score: f64,
    ) -> Result<Option<(Alert, bool, usize)>, PipelineError> {
        let zone_name = self.zone_name(zone_id);
        let Some(decision) =
            self.alerts
                .classify_and_maybe_create(zone_id, &zone_name, engine_score)
        else {
            return Ok(None);
        };

        if !decision.deduplicated {
            self.repository.insert_alert(decision.alert.clone())?;
        }

        let mut deliveries_created = 0;
        if decision.dispatch_immediately {
            let statuses = self.dispatcher.dispatch(&decision.alert).await;
            deliveries_created = statuses.len();
            for status in statuses {
                self.tracker.record(status.clone());
                self.repository.upsert_delivery(status)?;
            }
        }

        Ok(Some((
            decision.alert,
            decision.deduplicated,
            deliveries_created,
        )))
    }

    /// Ingest a batch of readings, one outcome per reading.
    ///
    /// A bad reading never aborts the batch; its error is carried in the
    /// per-zone outcome.
    pub async fn process_readings(&mut self, readings: Vec<SensorReading>) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(readings.len());
        for reading in readings {
            let zone_id = reading.zone_id.clone();
            let outcome = self.process_reading(reading).await;
            outcomes.push(BatchOutcome { zone_id, outcome });
        }
        outcomes
    }

    /// Run alerting over externally computed zone risk scores.
    ///
    /// Entry point for risk-monitoring jobs that already hold a 0-100
    /// score per zone; classification, dedup, and dispatch behave
    /// exactly as for engine-produced scores.
    pub async fn process_risk_assessment(
        &mut self,
        zone_scores: Vec<(String, f64)>,
    ) -> Vec<AssessmentOutcome> {
        let mut outcomes = Vec::with_capacity(zone_scores.len());
        for (zone_id, engine_score) in zone_scores {
            let severity = self.alerts.classify(engine_score);
            let outcome = self
                .classify_and_dispatch(&zone_id, engine_score)
                .await
                .map(|raised| match raised {
                    Some((alert, deduplicated, deliveries_created)) => ScoreOutcome {
                        severity,
                        alert: Some(alert),
                        deduplicated,
                        deliveries_created,
                    },
                    None => ScoreOutcome {
                        severity,
                        alert: None,
                        deduplicated: false,
                        deliveries_created: 0,
                    },
                });
            outcomes.push(AssessmentOutcome { zone_id, outcome });
        }
        outcomes
    }

    /// Manually dispatch an existing alert, optionally to explicit devices
    pub async fn send_alert(
        &mut self,
        alert_id: &str,
        device_ids: Option<&[String]>,
    ) -> Result<Vec<DeliveryStatus>, PipelineError> {
        let alert = self
            .alerts
            .get(alert_id)
            .cloned()
            .or_else(|| self.repository.get_alert(alert_id).ok())
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;

        let statuses = match device_ids {
            Some(ids) => self.dispatcher.dispatch_to(&alert, ids).await,
            None => self.dispatcher.dispatch(&alert).await,
        };

        for status in &statuses {
            self.tracker.record(status.clone());
            self.repository.upsert_delivery(status.clone())?;
        }
        Ok(statuses)
    }

    /// Delivery records for an alert
    pub fn get_delivery_status(&self, alert_id: &str) -> Vec<DeliveryStatus> {
        let tracked = self.tracker.query(alert_id);
        if !tracked.is_empty() {
            return tracked;
        }
        self.repository.get_deliveries(alert_id).unwrap_or_default()
    }

    /// Advance a delivery through its lifecycle (provider callback path)
    pub fn update_delivery(
        &mut self,
        delivery_id: &str,
        state: DeliveryState,
        error: Option<String>,
    ) -> Result<DeliveryStatus, PipelineError> {
        let updated = self.tracker.update(delivery_id, state, error)?;
        self.repository.upsert_delivery(updated.clone())?;
        Ok(updated)
    }

    /// Acknowledge an active alert
    pub fn acknowledge_alert(&mut self, alert_id: &str) -> Result<Alert, PipelineError> {
        let alert = self.alerts.acknowledge(alert_id)?;
        self.repository.update_alert(alert.clone())?;
        Ok(alert)
    }

    /// Resolve an alert with a free-text resolution
    pub fn resolve_alert(
        &mut self,
        alert_id: &str,
        resolution: &str,
    ) -> Result<Alert, PipelineError> {
        let alert = self.alerts.resolve(alert_id, resolution)?;
        self.repository.update_alert(alert.clone())?;
        Ok(alert)
    }

    /// Currently active alerts
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts().into_iter().cloned().collect()
    }

    /// Drop dedup entries past their stale age; returns count removed
    pub fn sweep_stale(&mut self) -> usize {
        self.alerts.sweep_stale()
    }

    /// Shared repository handle
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Zones currently holding a reading window
    pub fn zone_count(&self) -> usize {
        self.engine.zone_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notification::{
        Channel, ChannelProvider, ContactInfo, Device, DevicePreferences, DispatchConfig,
        InMemoryRegistry, SimulatedProvider,
    };

    fn reading(zone: &str, displacement: f64) -> SensorReading {
        SensorReading {
            zone_id: zone.to_string(),
            timestamp_ms: 0,
            displacement_mm: displacement,
            strain_ue: 100.0,
            pore_pressure_kpa: 50.0,
            temperature_c: 15.0,
            vibration_hz: 0.5,
            rainfall_mm_hr: 0.0,
            wind_speed_ms: 3.0,
            soil_moisture_pct: 30.0,
            tilt_angle_deg: 0.5,
        }
    }

    fn danger(zone: &str) -> SensorReading {
        // Exceeds displacement, strain, pore pressure and vibration
        // triggers: 90 points on the threshold table, critical
        SensorReading {
            zone_id: zone.to_string(),
            timestamp_ms: 0,
            displacement_mm: 120.0,
            strain_ue: 1500.0,
            pore_pressure_kpa: 650.0,
            temperature_c: 15.0,
            vibration_hz: 8.0,
            rainfall_mm_hr: 10.0,
            wind_speed_ms: 5.0,
            soil_moisture_pct: 40.0,
            tilt_angle_deg: 2.0,
        }
    }

    fn pipeline() -> Pipeline {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.upsert(Device {
            id: "d1".to_string(),
            zone_assignment: "zone-a".to_string(),
            is_active: true,
            preferences: DevicePreferences::default(),
            contact: ContactInfo {
                push_token: Some("token".to_string()),
                ..Default::default()
            },
        });
        let providers: Vec<Arc<dyn ChannelProvider>> = vec![
            Arc::new(SimulatedProvider::new(Channel::Push)),
            Arc::new(SimulatedProvider::new(Channel::Sms)),
            Arc::new(SimulatedProvider::new(Channel::Email)),
        ];
        let dispatcher = Dispatcher::new(registry, providers, DispatchConfig::default());
        Pipeline::new(
            AlertPolicy::default(),
            dispatcher,
            Arc::new(Repository::new()),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn test_invalid_reading_rejected() {
        let mut pipeline = pipeline();
        let mut bad = reading("zone-a", 5.0);
        bad.displacement_mm = f64::NAN;

        let result = pipeline.process_reading(bad).await;
        assert!(matches!(
            result,
            Err(PipelineError::InvalidReading { .. })
        ));
        // Rejected readings never reach the window
        assert_eq!(pipeline.zone_count(), 0);
    }

    #[tokio::test]
    async fn test_quiet_zone_produces_no_alert() {
        let mut pipeline = pipeline();
        let outcome = pipeline
            .process_reading(reading("zone-a", 0.5))
            .await
            .unwrap();

        assert!(outcome.alert.is_none());
        assert_eq!(outcome.deliveries_created, 0);
        assert_eq!(pipeline.repository().prediction_count(), 1);
    }

    #[tokio::test]
    async fn test_dangerous_zone_alerts_and_dispatches() {
        let mut pipeline = pipeline();
        // Basic predictor path: a single extreme reading scores critical
        let outcome = pipeline
            .process_reading(danger("zone-a"))
            .await
            .unwrap();

        let alert = outcome.alert.expect("alert expected");
        assert!(outcome.deliveries_created > 0);
        assert!(!pipeline.get_delivery_status(&alert.id).is_empty());
        assert_eq!(pipeline.repository().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_alert_not_redispatched() {
        let mut pipeline = pipeline();
        let first = pipeline
            .process_reading(danger("zone-a"))
            .await
            .unwrap();
        let second = pipeline
            .process_reading(danger("zone-a"))
            .await
            .unwrap();

        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(second.deliveries_created, 0);
        assert_eq!(pipeline.repository().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_isolates_bad_readings() {
        let mut pipeline = pipeline();
        let mut bad = reading("zone-b", 5.0);
        bad.soil_moisture_pct = 250.0;

        let outcomes = pipeline
            .process_readings(vec![reading("zone-a", 1.0), bad, reading("zone-c", 1.0)])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].outcome.is_ok());
        assert!(outcomes[1].outcome.is_err());
        assert!(outcomes[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn test_risk_assessment_from_external_scores() {
        let mut pipeline = pipeline();
        let outcomes = pipeline
            .process_risk_assessment(vec![
                ("zone-a".to_string(), 92.0),
                ("zone-b".to_string(), 40.0),
            ])
            .await;

        assert_eq!(outcomes.len(), 2);

        let critical = outcomes[0].outcome.as_ref().unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        let alert = critical.alert.as_ref().unwrap();
        assert_eq!(alert.zone_id, "zone-a");
        assert!(critical.deliveries_created > 0);
        assert!(!pipeline.get_delivery_status(&alert.id).is_empty());

        // 40 on the 0-100 scale is 4.0, below the medium band
        let quiet = outcomes[1].outcome.as_ref().unwrap();
        assert_eq!(quiet.severity, Severity::Low);
        assert!(quiet.alert.is_none());
        assert_eq!(pipeline.repository().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_risk_assessment_dedups_repeated_scores() {
        let mut pipeline = pipeline();
        let outcomes = pipeline
            .process_risk_assessment(vec![
                ("zone-a".to_string(), 92.0),
                ("zone-a".to_string(), 95.0),
            ])
            .await;

        let first = outcomes[0].outcome.as_ref().unwrap();
        let second = outcomes[1].outcome.as_ref().unwrap();
        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(second.deliveries_created, 0);
        assert_eq!(
            first.alert.as_ref().unwrap().id,
            second.alert.as_ref().unwrap().id
        );
        assert_eq!(pipeline.repository().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_updates_store() {
        let mut pipeline = pipeline();
        let alert = pipeline
            .process_reading(danger("zone-a"))
            .await
            .unwrap()
            .alert
            .unwrap();

        let resolved = pipeline
            .resolve_alert(&alert.id, "slope stabilized")
            .unwrap();
        assert_eq!(resolved.status, alerting::AlertStatus::Resolved);

        let stored = pipeline.repository().get_alert(&alert.id).unwrap();
        assert_eq!(stored.status, alerting::AlertStatus::Resolved);
        assert!(pipeline.active_alerts().is_empty());
    }
}
