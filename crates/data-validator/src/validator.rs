//! Reading Validator for Range Checking

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use telemetry::{Parameter, SensorReading};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Displacement valid range (mm)
    pub displacement_range: (f64, f64),
    /// Strain valid range (microstrain)
    pub strain_range: (f64, f64),
    /// Pore pressure valid range (kPa)
    pub pore_pressure_range: (f64, f64),
    /// Temperature valid range (C)
    pub temperature_range: (f64, f64),
    /// Vibration valid range (Hz)
    pub vibration_range: (f64, f64),
    /// Rainfall valid range (mm/hr)
    pub rainfall_range: (f64, f64),
    /// Wind speed valid range (m/s)
    pub wind_speed_range: (f64, f64),
    /// Soil moisture valid range (%)
    pub soil_moisture_range: (f64, f64),
    /// Tilt angle valid range (degrees)
    pub tilt_angle_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            displacement_range: (0.0, 500.0),
            strain_range: (0.0, 5000.0),
            pore_pressure_range: (0.0, 2000.0),
            temperature_range: (-40.0, 60.0),
            vibration_range: (0.0, 50.0),
            rainfall_range: (0.0, 300.0),
            wind_speed_range: (0.0, 80.0),
            soil_moisture_range: (0.0, 100.0),
            tilt_angle_range: (0.0, 90.0),
        }
    }
}

/// Result of validating one reading
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }
}

/// Validator for geotechnical sensor readings
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn range_for(&self, parameter: Parameter) -> (f64, f64) {
        match parameter {
            Parameter::Displacement => self.config.displacement_range,
            Parameter::Strain => self.config.strain_range,
            Parameter::PorePressure => self.config.pore_pressure_range,
            Parameter::Temperature => self.config.temperature_range,
            Parameter::Vibration => self.config.vibration_range,
            Parameter::Rainfall => self.config.rainfall_range,
            Parameter::WindSpeed => self.config.wind_speed_range,
            Parameter::SoilMoisture => self.config.soil_moisture_range,
            Parameter::TiltAngle => self.config.tilt_angle_range,
        }
    }

    /// Validate one parameter of a reading
    pub fn validate_parameter(
        &self,
        parameter: Parameter,
        reading: &SensorReading,
    ) -> Result<(), ValidationError> {
        self.validate_range(
            parameter.as_str(),
            parameter.value_of(reading),
            self.range_for(parameter),
        )
    }

    /// Validate every monitored parameter of a reading.
    ///
    /// A rejected reading must not be appended to its zone's window;
    /// processing continues for other zones.
    pub fn validate_reading(&self, reading: &SensorReading) -> ValidationResult {
        if reading.zone_id.is_empty() {
            return ValidationResult::invalid(
                vec![ValidationError::MissingField("zone_id")],
                Parameter::ALL.len(),
            );
        }

        let errors: Vec<ValidationError> = Parameter::ALL
            .iter()
            .filter_map(|p| self.validate_parameter(*p, reading).err())
            .collect();

        if errors.is_empty() {
            ValidationResult::valid(Parameter::ALL.len())
        } else {
            debug!(
                zone_id = %reading.zone_id,
                errors = errors.len(),
                "Reading rejected by validation"
            );
            ValidationResult::invalid(errors, Parameter::ALL.len())
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
