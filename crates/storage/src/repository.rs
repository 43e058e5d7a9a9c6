//! Repository Implementation

use crate::StorageError;
use alerting::Alert;
use chrono::{DateTime, Utc};
use notification::DeliveryStatus;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Flattened prediction history record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub zone_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub risk_level: String,
    pub confidence: f64,
    pub time_to_event_hours: Option<f64>,
}

/// Retention caps per store
#[derive(Debug, Clone, Copy)]
pub struct RetentionLimits {
    pub max_alerts: usize,
    pub max_predictions: usize,
    pub max_deliveries: usize,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            max_alerts: 10_000,
            max_predictions: 10_000,
            max_deliveries: 50_000,
        }
    }
}

/// Repository for data access (in-memory implementation)
pub struct Repository {
    alerts: Mutex<VecDeque<Alert>>,
    predictions: Mutex<VecDeque<PredictionRecord>>,
    deliveries: Mutex<VecDeque<DeliveryStatus>>,
    limits: RetentionLimits,
}

impl Repository {
    /// Create a repository with default retention
    pub fn new() -> Self {
        Self::with_limits(RetentionLimits::default())
    }

    /// Create a repository with explicit retention caps
    pub fn with_limits(limits: RetentionLimits) -> Self {
        info!(
            max_alerts = limits.max_alerts,
            max_predictions = limits.max_predictions,
            max_deliveries = limits.max_deliveries,
            "Creating in-memory repository"
        );
        Self {
            alerts: Mutex::new(VecDeque::with_capacity(1024)),
            predictions: Mutex::new(VecDeque::with_capacity(1024)),
            deliveries: Mutex::new(VecDeque::with_capacity(1024)),
            limits,
        }
    }

    /// Append an alert to the history
    pub fn insert_alert(&self, alert: Alert) -> Result<(), StorageError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        while alerts.len() >= self.limits.max_alerts {
            alerts.pop_front();
        }
        debug!(alert_id = %alert.id, "Stored alert");
        alerts.push_back(alert);
        Ok(())
    }

    /// Replace a stored alert after a lifecycle change
    pub fn update_alert(&self, alert: Alert) -> Result<(), StorageError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        let slot = alerts
            .iter_mut()
            .find(|a| a.id == alert.id)
            .ok_or_else(|| StorageError::AlertNotFound(alert.id.clone()))?;
        *slot = alert;
        Ok(())
    }

    /// Get one alert by id
    pub fn get_alert(&self, alert_id: &str) -> Result<Alert, StorageError> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        alerts
            .iter()
            .find(|a| a.id == alert_id)
            .cloned()
            .ok_or_else(|| StorageError::AlertNotFound(alert_id.to_string()))
    }

    /// Most recent alerts, optionally filtered by zone
    pub fn get_alerts(
        &self,
        zone_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Alert>, StorageError> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        Ok(alerts
            .iter()
            .rev()
            .filter(|a| zone_id.map_or(true, |z| a.zone_id == z))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Append a prediction record
    pub fn insert_prediction(&self, record: PredictionRecord) -> Result<(), StorageError> {
        let mut predictions = self
            .predictions
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        while predictions.len() >= self.limits.max_predictions {
            predictions.pop_front();
        }
        predictions.push_back(record);
        Ok(())
    }

    /// Most recent predictions, optionally filtered by zone
    pub fn get_predictions(
        &self,
        zone_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let predictions = self
            .predictions
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        Ok(predictions
            .iter()
            .rev()
            .filter(|p| zone_id.map_or(true, |z| p.zone_id == z))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Store or replace a delivery snapshot by delivery id
    pub fn upsert_delivery(&self, status: DeliveryStatus) -> Result<(), StorageError> {
        let mut deliveries = self
            .deliveries
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        if let Some(slot) = deliveries.iter_mut().find(|d| d.id == status.id) {
            *slot = status;
            return Ok(());
        }

        while deliveries.len() >= self.limits.max_deliveries {
            deliveries.pop_front();
        }
        deliveries.push_back(status);
        Ok(())
    }

    /// All delivery snapshots for an alert
    pub fn get_deliveries(&self, alert_id: &str) -> Result<Vec<DeliveryStatus>, StorageError> {
        let deliveries = self
            .deliveries
            .lock()
            .map_err(|e| StorageError::Access(format!("Lock error: {}", e)))?;

        Ok(deliveries
            .iter()
            .filter(|d| d.alert_id == alert_id)
            .cloned()
            .collect())
    }

    /// Stored alert count
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Stored prediction count
    pub fn prediction_count(&self) -> usize {
        self.predictions.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Stored delivery count
    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Clear all stores (for testing)
    pub fn clear(&self) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.clear();
        }
        if let Ok(mut predictions) = self.predictions.lock() {
            predictions.clear();
        }
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.clear();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertManager, AlertPolicy};
    use notification::{Channel, DeliveryState};

    fn alert_for_zone(zone: &str, score: f64) -> Alert {
        AlertManager::new(AlertPolicy::default())
            .classify_and_maybe_create(zone, "Test Zone", score)
            .unwrap()
            .alert
    }

    fn prediction(zone: &str, score: f64) -> PredictionRecord {
        PredictionRecord {
            zone_id: zone.to_string(),
            timestamp: Utc::now(),
            risk_score: score,
            risk_level: "high".to_string(),
            confidence: 70.0,
            time_to_event_hours: None,
        }
    }

    #[test]
    fn test_alert_insert_and_query() {
        let repo = Repository::new();
        repo.insert_alert(alert_for_zone("zone-a", 85.0)).unwrap();
        repo.insert_alert(alert_for_zone("zone-b", 92.0)).unwrap();

        assert_eq!(repo.get_alerts(None, 10).unwrap().len(), 2);
        let zone_a = repo.get_alerts(Some("zone-a"), 10).unwrap();
        assert_eq!(zone_a.len(), 1);
        assert_eq!(zone_a[0].zone_id, "zone-a");
    }

    #[test]
    fn test_update_alert_replaces_by_id() {
        let repo = Repository::new();
        let mut alert = alert_for_zone("zone-a", 85.0);
        repo.insert_alert(alert.clone()).unwrap();

        alert.status = alerting::AlertStatus::Resolved;
        repo.update_alert(alert.clone()).unwrap();

        let stored = repo.get_alert(&alert.id).unwrap();
        assert_eq!(stored.status, alerting::AlertStatus::Resolved);

        let mut missing = alert_for_zone("zone-z", 85.0);
        missing.id = "no-such-id".to_string();
        assert!(matches!(
            repo.update_alert(missing),
            Err(StorageError::AlertNotFound(_))
        ));
    }

    #[test]
    fn test_prediction_retention_evicts_oldest() {
        let repo = Repository::with_limits(RetentionLimits {
            max_alerts: 10,
            max_predictions: 5,
            max_deliveries: 10,
        });

        for i in 0..8 {
            repo.insert_prediction(prediction("zone-a", i as f64)).unwrap();
        }

        assert_eq!(repo.prediction_count(), 5);
        let recent = repo.get_predictions(Some("zone-a"), 10).unwrap();
        // newest first; scores 0..2 evicted
        assert_eq!(recent[0].risk_score, 7.0);
        assert_eq!(recent.last().unwrap().risk_score, 3.0);
    }

    #[test]
    fn test_delivery_upsert_and_query() {
        let repo = Repository::new();
        let mut status = DeliveryStatus::pending("alert-1", "device-1", Channel::Push);
        repo.upsert_delivery(status.clone()).unwrap();

        status.status = DeliveryState::Sent;
        repo.upsert_delivery(status.clone()).unwrap();

        let stored = repo.get_deliveries("alert-1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryState::Sent);
    }
}
