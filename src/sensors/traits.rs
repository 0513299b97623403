// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Sensor traits and common types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::SensorKind;

/// Errors raised while acquiring sensor readings
#[derive(Debug, Error)]
pub enum SensorError {
    /// No store URL or credentials were configured
    #[error("sensor store not configured")]
    NotConfigured,

    /// Transport or HTTP-level failure talking to the store
    #[error("sensor store request failed: {0}")]
    Transport(String),

    /// Store answered with something that is not a list of readings
    #[error("malformed sensor payload: {0}")]
    Malformed(String),
}

/// One row from the site sensor store.
///
/// Field names on the wire follow the store's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Rainfall_3Day")]
    pub rainfall_3day: f64,
    #[serde(rename = "Rainfall_7Day")]
    pub rainfall_7day: f64,
    #[serde(rename = "Temperature_C")]
    pub temperature_c: f64,
    #[serde(rename = "Soil_Strain")]
    pub soil_strain: f64,
    #[serde(rename = "Pore_Water_Pressure_kPa")]
    pub pore_water_pressure_kpa: f64,

    #[serde(rename = "sensor_location")]
    pub location: String,
}

impl SensorReading {
    pub const UNKNOWN_LOCATION: &'static str = "Unknown Location";

    /// Reading with every measurement at zero, stamped now
    pub fn new(location: &str) -> Self {
        let now = Utc::now();
        Self {
            id: format!("sensor-{}", now.timestamp_millis()),
            timestamp: now,
            rainfall_mm: 0.0,
            rainfall_3day: 0.0,
            rainfall_7day: 0.0,
            temperature_c: 0.0,
            soil_strain: 0.0,
            pore_water_pressure_kpa: 0.0,
            location: location.to_string(),
        }
    }

    /// Build a reading from an untyped store row.
    ///
    /// Numeric fields accept numbers or numeric strings and fall back to 0.
    /// Missing id, timestamp and location get generated defaults.
    pub fn from_raw(raw: &Value) -> Self {
        let now = Utc::now();
        let number = |key: &str| raw.get(key).and_then(lenient_f64).unwrap_or(0.0);

        let id = raw
            .get("id")
            .and_then(non_empty_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("sensor-{}", now.timestamp_millis()));

        let timestamp = raw
            .get("timestamp")
            .and_then(non_empty_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(now);

        let location = raw
            .get("sensor_location")
            .and_then(non_empty_str)
            .unwrap_or(Self::UNKNOWN_LOCATION)
            .to_string();

        Self {
            id,
            timestamp,
            rainfall_mm: number("Rainfall_mm"),
            rainfall_3day: number("Rainfall_3Day"),
            rainfall_7day: number("Rainfall_7Day"),
            temperature_c: number("Temperature_C"),
            soil_strain: number("Soil_Strain"),
            pore_water_pressure_kpa: number("Pore_Water_Pressure_kPa"),
            location,
        }
    }

    /// Value this reading carries for a display sensor kind, if any.
    ///
    /// Displacement and vibration are not part of the store row.
    pub fn value_for(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Rainfall => Some(self.rainfall_mm),
            SensorKind::Strain => Some(self.soil_strain),
            SensorKind::PorePressure => Some(self.pore_water_pressure_kpa),
            SensorKind::Temperature => Some(self.temperature_c),
            SensorKind::Displacement | SensorKind::Vibration => None,
        }
    }
}

/// Parse a JSON number or numeric string; anything else yields `None`
pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| !v.is_nan())
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// A producer of sensor reading batches, oldest first
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    /// Fetch the latest batch of readings
    async fn fetch(&self) -> Result<Vec<SensorReading>, SensorError>;
}
