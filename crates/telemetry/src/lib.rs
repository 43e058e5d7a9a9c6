//! Zone Telemetry
//!
//! Provides the sensor reading data model and per-zone bounded sliding
//! windows that form the statistical basis for risk scoring.

mod window;

pub use window::{ReadingWindow, ZoneWindows, WINDOW_CAPACITY};

use serde::{Deserialize, Serialize};

/// One geotechnical sensor reading for a monitored zone.
///
/// Readings are immutable once recorded; range clamping is the
/// producer's responsibility (a gateway or simulator upstream).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Zone this reading belongs to
    pub zone_id: String,
    /// Capture time (unix milliseconds)
    pub timestamp_ms: u64,
    /// Surface displacement (mm)
    pub displacement_mm: f64,
    /// Strain (microstrain)
    pub strain_ue: f64,
    /// Pore water pressure (kPa)
    pub pore_pressure_kpa: f64,
    /// Ambient temperature (C)
    pub temperature_c: f64,
    /// Ground vibration (Hz)
    pub vibration_hz: f64,
    /// Rainfall intensity (mm/hr)
    pub rainfall_mm_hr: f64,
    /// Wind speed (m/s)
    pub wind_speed_ms: f64,
    /// Soil moisture (%)
    pub soil_moisture_pct: f64,
    /// Tilt angle (degrees)
    pub tilt_angle_deg: f64,
}

/// Monitored geotechnical parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Displacement,
    Strain,
    PorePressure,
    Temperature,
    Vibration,
    Rainfall,
    WindSpeed,
    SoilMoisture,
    TiltAngle,
}

impl Parameter {
    /// All monitored parameters, in reporting order.
    pub const ALL: [Parameter; 9] = [
        Parameter::Displacement,
        Parameter::Strain,
        Parameter::PorePressure,
        Parameter::Temperature,
        Parameter::Vibration,
        Parameter::Rainfall,
        Parameter::WindSpeed,
        Parameter::SoilMoisture,
        Parameter::TiltAngle,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Displacement => "displacement",
            Parameter::Strain => "strain",
            Parameter::PorePressure => "pore_pressure",
            Parameter::Temperature => "temperature",
            Parameter::Vibration => "vibration",
            Parameter::Rainfall => "rainfall",
            Parameter::WindSpeed => "wind_speed",
            Parameter::SoilMoisture => "soil_moisture",
            Parameter::TiltAngle => "tilt_angle",
        }
    }

    /// Extract this parameter's value from a reading.
    pub fn value_of(&self, reading: &SensorReading) -> f64 {
        match self {
            Parameter::Displacement => reading.displacement_mm,
            Parameter::Strain => reading.strain_ue,
            Parameter::PorePressure => reading.pore_pressure_kpa,
            Parameter::Temperature => reading.temperature_c,
            Parameter::Vibration => reading.vibration_hz,
            Parameter::Rainfall => reading.rainfall_mm_hr,
            Parameter::WindSpeed => reading.wind_speed_ms,
            Parameter::SoilMoisture => reading.soil_moisture_pct,
            Parameter::TiltAngle => reading.tilt_angle_deg,
        }
    }

    /// Extract this parameter's series from a slice of readings.
    pub fn series(&self, readings: &[SensorReading]) -> Vec<f64> {
        readings.iter().map(|r| self.value_of(r)).collect()
    }
}
