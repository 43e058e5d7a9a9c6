//! Alert Manager Implementation

use crate::alert::{Alert, AlertStatus, AlertType, Severity};
use crate::AlertError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Alerting policy configuration.
///
/// Severity thresholds are on the 0-10 alerting scale; the detection
/// engine's 0-100 score is converted by dividing by ten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Score at or above which severity is medium (default: 6.0)
    pub medium_threshold: f64,
    /// Score at or above which severity is high (default: 7.5)
    pub high_threshold: f64,
    /// Score at or above which severity is critical (default: 8.5)
    pub critical_threshold: f64,
    /// Suppression window for duplicate (zone, severity) alerts (seconds)
    pub dedup_window_secs: u64,
    /// Age after which dedup entries are swept (seconds)
    pub stale_after_secs: u64,
    /// Whether medium alerts are dispatched immediately on creation
    pub dispatch_medium: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            medium_threshold: 6.0,
            high_threshold: 7.5,
            critical_threshold: 8.5,
            dedup_window_secs: 300, // 5 minutes
            stale_after_secs: 3600,
            dispatch_medium: false,
        }
    }
}

/// Outcome of a classify-and-create call
#[derive(Debug, Clone)]
pub struct AlertDecision {
    /// The created or cached alert
    pub alert: Alert,
    /// True when the dedup cache suppressed a new alert
    pub deduplicated: bool,
    /// Whether the dispatcher should be invoked now
    pub dispatch_immediately: bool,
}

/// Dedup cache entry
struct CacheEntry {
    alert: Alert,
    created: Instant,
}

/// Alert manager: severity classification, dedup, lifecycle.
pub struct AlertManager {
    policy: AlertPolicy,
    /// Dedup cache keyed by "{zone_id}-{severity}"
    cache: HashMap<String, CacheEntry>,
    /// Recent alerts by id, for lifecycle updates
    alerts: HashMap<String, Alert>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(policy: AlertPolicy) -> Self {
        info!("Creating alert manager with policy: {:?}", policy);
        Self {
            policy,
            cache: HashMap::new(),
            alerts: HashMap::new(),
        }
    }

    /// Convert an engine score (0-100) to the 0-10 alerting scale
    pub fn alert_score(engine_score: f64) -> f64 {
        (engine_score / 10.0).clamp(0.0, 10.0)
    }

    /// Failure probability for operator display (0.05 to 0.95)
    pub fn risk_probability(engine_score: f64) -> f64 {
        (engine_score / 100.0).clamp(0.05, 0.95)
    }

    /// Classify a 0-100 engine score into a severity tier
    pub fn classify(&self, engine_score: f64) -> Severity {
        let score = Self::alert_score(engine_score);
        if score >= self.policy.critical_threshold {
            Severity::Critical
        } else if score >= self.policy.high_threshold {
            Severity::High
        } else if score >= self.policy.medium_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Classify a zone's risk score and create an alert when warranted.
    ///
    /// Low severity never creates an alert. A dedup-cache hit within the
    /// suppression window returns the cached alert unchanged.
    pub fn classify_and_maybe_create(
        &mut self,
        zone_id: &str,
        zone_name: &str,
        engine_score: f64,
    ) -> Option<AlertDecision> {
        let severity = self.classify(engine_score);
        if severity == Severity::Low {
            return None;
        }

        let key = format!("{}-{}", zone_id, severity.as_str());
        let window = Duration::from_secs(self.policy.dedup_window_secs);

        if let Some(entry) = self.cache.get(&key) {
            if entry.created.elapsed() < window {
                info!(
                    alert_id = %entry.alert.id,
                    zone_id,
                    severity = severity.as_str(),
                    "Duplicate suppressed, returning cached alert"
                );
                return Some(AlertDecision {
                    alert: entry.alert.clone(),
                    deduplicated: true,
                    dispatch_immediately: false,
                });
            }
        }

        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            severity,
            status: AlertStatus::Active,
            message: Alert::message_for(severity, zone_name),
            risk_score: Self::alert_score(engine_score),
            risk_probability: Self::risk_probability(engine_score),
            predicted_timeline: Alert::timeline_for(severity).to_string(),
            recommended_actions: Alert::actions_for(severity),
            affected_personnel: 0,
            equipment_at_risk: Alert::equipment_for(severity),
            alert_type: AlertType::Automatic,
            created_at: Utc::now(),
            resolved_at: None,
        };

        self.cache.insert(
            key,
            CacheEntry {
                alert: alert.clone(),
                created: Instant::now(),
            },
        );
        self.alerts.insert(alert.id.clone(), alert.clone());

        let dispatch_immediately = match severity {
            Severity::High | Severity::Critical => true,
            Severity::Medium => self.policy.dispatch_medium,
            Severity::Low => false,
        };

        info!(
            alert_id = %alert.id,
            zone_id,
            severity = severity.as_str(),
            dispatch_immediately,
            "Alert created"
        );

        Some(AlertDecision {
            alert,
            deduplicated: false,
            dispatch_immediately,
        })
    }

    /// Get an alert by id, if still tracked
    pub fn get(&self, alert_id: &str) -> Option<&Alert> {
        self.alerts.get(alert_id)
    }

    /// Acknowledge an active alert
    pub fn acknowledge(&mut self, alert_id: &str) -> Result<Alert, AlertError> {
        let alert = self
            .alerts
            .get_mut(alert_id)
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;

        match alert.status {
            AlertStatus::Active => {
                alert.status = AlertStatus::Acknowledged;
                info!(alert_id, "Alert acknowledged");
                Ok(alert.clone())
            }
            AlertStatus::Acknowledged => Ok(alert.clone()),
            AlertStatus::Resolved => Err(AlertError::InvalidTransition {
                id: alert_id.to_string(),
                from: "resolved",
            }),
        }
    }

    /// Resolve an alert with a resolution note
    pub fn resolve(&mut self, alert_id: &str, resolution: &str) -> Result<Alert, AlertError> {
        let alert = self
            .alerts
            .get_mut(alert_id)
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;

        if alert.status == AlertStatus::Resolved {
            return Err(AlertError::InvalidTransition {
                id: alert_id.to_string(),
                from: "resolved",
            });
        }

        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(Utc::now());
        info!(alert_id, resolution, "Alert resolved");
        Ok(alert.clone())
    }

    /// Sweep dedup entries older than the stale threshold.
    ///
    /// Run periodically by the service; safe to call at any time.
    pub fn sweep_stale(&mut self) -> usize {
        let stale = Duration::from_secs(self.policy.stale_after_secs);
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.created.elapsed() < stale);
        let removed = before - self.cache.len();
        if removed > 0 {
            debug!(removed, "Swept stale dedup entries");
        }
        removed
    }

    /// Number of live dedup entries
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Active (unresolved) alerts
    pub fn active_alerts(&self) -> Vec<&Alert> {
        self.alerts
            .values()
            .filter(|a| a.status != AlertStatus::Resolved)
            .collect()
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_bands() {
        let manager = AlertManager::default();

        assert_eq!(manager.classify(59.9), Severity::Low);
        assert_eq!(manager.classify(60.0), Severity::Medium);
        assert_eq!(manager.classify(74.9), Severity::Medium);
        assert_eq!(manager.classify(75.0), Severity::High);
        assert_eq!(manager.classify(84.9), Severity::High);
        assert_eq!(manager.classify(85.0), Severity::Critical);
        assert_eq!(manager.classify(100.0), Severity::Critical);
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(AlertManager::risk_probability(0.0), 0.05);
        assert_eq!(AlertManager::risk_probability(50.0), 0.5);
        assert_eq!(AlertManager::risk_probability(100.0), 0.95);
    }

    #[test]
    fn test_low_never_creates_alert() {
        let mut manager = AlertManager::default();
        assert!(manager
            .classify_and_maybe_create("zone-a", "North Pit", 25.0)
            .is_none());
    }

    #[test]
    fn test_dedup_returns_same_alert() {
        let mut manager = AlertManager::default();

        let first = manager
            .classify_and_maybe_create("zone-a", "North Pit", 80.0)
            .unwrap();
        assert!(!first.deduplicated);
        assert!(first.dispatch_immediately);

        let second = manager
            .classify_and_maybe_create("zone-a", "North Pit", 81.0)
            .unwrap();
        assert!(second.deduplicated);
        assert!(!second.dispatch_immediately);
        assert_eq!(first.alert.id, second.alert.id);
    }

    #[test]
    fn test_dedup_expires() {
        let policy = AlertPolicy {
            dedup_window_secs: 0, // Expire immediately for the test
            ..Default::default()
        };
        let mut manager = AlertManager::new(policy);

        let first = manager
            .classify_and_maybe_create("zone-a", "North Pit", 80.0)
            .unwrap();
        let second = manager
            .classify_and_maybe_create("zone-a", "North Pit", 80.0)
            .unwrap();
        assert!(!second.deduplicated);
        assert_ne!(first.alert.id, second.alert.id);
    }

    #[test]
    fn test_dedup_keyed_by_severity() {
        let mut manager = AlertManager::default();

        let medium = manager
            .classify_and_maybe_create("zone-a", "North Pit", 65.0)
            .unwrap();
        let critical = manager
            .classify_and_maybe_create("zone-a", "North Pit", 90.0)
            .unwrap();

        // Different severity tiers never collide in the cache
        assert!(!critical.deduplicated);
        assert_ne!(medium.alert.id, critical.alert.id);
    }

    #[test]
    fn test_medium_dispatch_policy() {
        let mut manager = AlertManager::default();
        let decision = manager
            .classify_and_maybe_create("zone-a", "North Pit", 65.0)
            .unwrap();
        // Default policy defers medium alerts
        assert!(!decision.dispatch_immediately);

        let mut eager = AlertManager::new(AlertPolicy {
            dispatch_medium: true,
            ..Default::default()
        });
        let decision = eager
            .classify_and_maybe_create("zone-b", "South Pit", 65.0)
            .unwrap();
        assert!(decision.dispatch_immediately);
    }

    #[test]
    fn test_lifecycle() {
        let mut manager = AlertManager::default();
        let decision = manager
            .classify_and_maybe_create("zone-a", "North Pit", 80.0)
            .unwrap();
        let id = decision.alert.id;

        let acked = manager.acknowledge(&id).unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);

        let resolved = manager.resolve(&id, "bench stabilized").unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        // No transitions out of resolved
        assert!(manager.acknowledge(&id).is_err());
        assert!(manager.resolve(&id, "again").is_err());
    }

    #[test]
    fn test_unknown_alert() {
        let mut manager = AlertManager::default();
        assert!(matches!(
            manager.acknowledge("missing"),
            Err(AlertError::NotFound(_))
        ));
    }

    #[test]
    fn test_sweep_stale() {
        let policy = AlertPolicy {
            stale_after_secs: 0,
            ..Default::default()
        };
        let mut manager = AlertManager::new(policy);
        manager.classify_and_maybe_create("zone-a", "North Pit", 80.0);
        assert_eq!(manager.cache_len(), 1);

        let removed = manager.sweep_stale();
        assert_eq!(removed, 1);
        assert_eq!(manager.cache_len(), 0);
    }
}
