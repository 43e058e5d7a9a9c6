//! Alert Data Model

use chrono::{DateTime, Utc};
use detection::RiskLevel;
use serde::{Deserialize, Serialize};

/// Alert severity tier; ordering is total (low < medium < high < critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl From<RiskLevel> for Severity {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Severity::Low,
            RiskLevel::Medium => Severity::Medium,
            RiskLevel::High => Severity::High,
            RiskLevel::Critical => Severity::Critical,
        }
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }
}

/// How the alert was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Automatic,
    Manual,
}

/// One escalated risk condition for a zone.
///
/// Message, timeline, and actions are generated from fixed per-severity
/// templates so operator messaging stays consistent across alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id
    pub id: String,
    /// Zone the alert applies to
    pub zone_id: String,
    /// Human-readable zone name
    pub zone_name: String,
    /// Severity tier
    pub severity: Severity,
    /// Lifecycle status
    pub status: AlertStatus,
    /// Operator-facing message
    pub message: String,
    /// Risk score on the 0-10 alerting scale
    pub risk_score: f64,
    /// Failure probability (0.05 to 0.95)
    pub risk_probability: f64,
    /// Expected timeline text
    pub predicted_timeline: String,
    /// Recommended operator actions
    pub recommended_actions: Vec<String>,
    /// Personnel count expected in the affected area
    pub affected_personnel: u32,
    /// Equipment classes at risk in the zone
    pub equipment_at_risk: Vec<String>,
    /// Automatic (pipeline) or manual (operator) origin
    pub alert_type: AlertType,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Resolution time, once resolved
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Fixed message template for a severity tier
    pub(crate) fn message_for(severity: Severity, zone_name: &str) -> String {
        match severity {
            Severity::Low => format!("Risk conditions in {} within normal bounds", zone_name),
            Severity::Medium => format!("Elevated risk conditions detected in {}", zone_name),
            Severity::High => format!(
                "High slope failure risk in {}; restrict access and prepare response",
                zone_name
            ),
            Severity::Critical => format!(
                "CRITICAL: imminent slope failure risk in {}; evacuate immediately",
                zone_name
            ),
        }
    }

    /// Fixed timeline template for a severity tier
    pub(crate) fn timeline_for(severity: Severity) -> &'static str {
        match severity {
            Severity::Low => "No failure expected under current conditions",
            Severity::Medium => "Potential instability within 48-72 hours if trends continue",
            Severity::High => "Potential failure within 12-24 hours",
            Severity::Critical => "Failure possible within 0-6 hours",
        }
    }

    /// Fixed action template for a severity tier
    pub(crate) fn actions_for(severity: Severity) -> Vec<String> {
        let actions: &[&str] = match severity {
            Severity::Low => &["Continue routine monitoring"],
            Severity::Medium => &[
                "Increase monitoring frequency",
                "Brief shift supervisors on current readings",
            ],
            Severity::High => &[
                "Restrict access to the affected zone",
                "Move mobile equipment to safe ground",
                "Place response teams on standby",
            ],
            Severity::Critical => &[
                "Evacuate all personnel from the zone",
                "Halt operations in and below the zone",
                "Activate the emergency response plan",
            ],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }

    /// Fixed equipment-at-risk template for a severity tier
    pub(crate) fn equipment_for(severity: Severity) -> Vec<String> {
        let equipment: &[&str] = match severity {
            Severity::Low => &[],
            Severity::Medium => &["mobile plant in zone"],
            Severity::High => &["mobile plant in zone", "haul road segment"],
            Severity::Critical => &[
                "mobile plant in zone",
                "haul road segment",
                "fixed conveyors and infrastructure",
            ],
        };
        equipment.iter().map(|e| e.to_string()).collect()
    }
}
