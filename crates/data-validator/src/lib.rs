//! Data Validation
//!
//! Provides input validation and range checking for geotechnical sensor
//! readings before they reach a zone's window.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, ValidationResult, Validator};
