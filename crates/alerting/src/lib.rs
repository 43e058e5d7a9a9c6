//! Alerting System
//!
//! Classifies fused risk scores into severity tiers, deduplicates alert
//! creation per (zone, severity), and owns the alert lifecycle.

mod alert;
mod manager;

pub use alert::{Alert, AlertStatus, AlertType, Severity};
pub use manager::{AlertDecision, AlertManager, AlertPolicy};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    /// Alert id not known to the manager
    #[error("Unknown alert: {0}")]
    NotFound(String),

    /// Lifecycle transition not allowed from the current status
    #[error("Invalid status transition from {from} for alert {id}")]
    InvalidTransition { id: String, from: &'static str },
}
