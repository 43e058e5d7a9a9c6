//! Storage Layer
//!
//! In-memory repositories with bounded retention. The repository is the
//! single seam a database-backed implementation would replace.

mod repository;

pub use repository::{PredictionRecord, Repository, RetentionLimits};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage access error: {0}")]
    Access(String),
    #[error("Alert not found: {0}")]
    AlertNotFound(String),
    #[error("Delivery not found: {0}")]
    DeliveryNotFound(String),
}
