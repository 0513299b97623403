// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Three-tier threshold classification and trend detection for single sensors
//!
//! Everything here is pure. Display code calls it per reading; it does not
//! take part in evacuation decisions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Change between consecutive readings that still counts as stable.
/// Absorbs sensor jitter.
pub const TREND_DEAD_BAND: f64 = 0.1;

/// Invalid threshold configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("thresholds must be strictly ascending (safe {safe} < moderate {moderate} < high {high})")]
    NotAscending { safe: f64, moderate: f64, high: f64 },
}

/// Display sensor kinds on a mining site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Displacement,
    Strain,
    PorePressure,
    Rainfall,
    Temperature,
    Vibration,
}

impl SensorKind {
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Displacement,
        SensorKind::Strain,
        SensorKind::PorePressure,
        SensorKind::Rainfall,
        SensorKind::Temperature,
        SensorKind::Vibration,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Displacement => "Displacement Sensor",
            SensorKind::Strain => "Strain Gauge",
            SensorKind::PorePressure => "Pore Pressure",
            SensorKind::Rainfall => "Rainfall Monitor",
            SensorKind::Temperature => "Temperature Sensor",
            SensorKind::Vibration => "Vibration Monitor",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Displacement => "mm",
            SensorKind::Strain => "μɛ",
            SensorKind::PorePressure => "kPa",
            SensorKind::Rainfall => "mm/h",
            SensorKind::Temperature => "°C",
            SensorKind::Vibration => "mm/s",
        }
    }

    /// Factory tiers used when the configuration does not override them
    pub fn default_thresholds(&self) -> Thresholds {
        let (safe, moderate, high) = match self {
            SensorKind::Displacement => (5.0, 8.0, 12.0),
            SensorKind::Strain => (100.0, 200.0, 300.0),
            SensorKind::PorePressure => (100.0, 150.0, 200.0),
            SensorKind::Rainfall => (5.0, 15.0, 25.0),
            SensorKind::Temperature => (40.0, 50.0, 60.0),
            SensorKind::Vibration => (5.0, 10.0, 15.0),
        };
        Thresholds { safe, moderate, high }
    }
}

/// Validated safe < moderate < high boundaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct Thresholds {
    safe: f64,
    moderate: f64,
    high: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    safe: f64,
    moderate: f64,
    high: f64,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = ThresholdError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Thresholds::new(raw.safe, raw.moderate, raw.high)
    }
}

impl Thresholds {
    pub fn new(safe: f64, moderate: f64, high: f64) -> Result<Self, ThresholdError> {
        // NaN fails both comparisons
        if safe < moderate && moderate < high {
            Ok(Self { safe, moderate, high })
        } else {
            Err(ThresholdError::NotAscending { safe, moderate, high })
        }
    }

    pub fn safe(&self) -> f64 { self.safe }
    pub fn moderate(&self) -> f64 { self.moderate }
    pub fn high(&self) -> f64 { self.high }
}

/// Status tier of a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Safe,
    Moderate,
    High,
}

impl SensorStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Safe => "Safe",
            SensorStatus::Moderate => "Moderate Risk",
            SensorStatus::High => "High Risk",
        }
    }
}

/// Direction of change between two readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Up => "Increasing",
            Trend::Down => "Decreasing",
            Trend::Stable => "Stable",
        }
    }
}

/// Classify a reading against its tiers
pub fn classify(value: f64, thresholds: &Thresholds) -> SensorStatus {
    if value >= thresholds.high {
        SensorStatus::High
    } else if value >= thresholds.moderate {
        SensorStatus::Moderate
    } else {
        SensorStatus::Safe
    }
}

/// Compare two consecutive readings
pub fn trend(previous: f64, current: f64) -> Trend {
    let delta = current - previous;
    if delta > TREND_DEAD_BAND {
        Trend::Up
    } else if delta < -TREND_DEAD_BAND {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// Fill fraction of a gauge whose full scale is the high tier, in [0, 1]
pub fn gauge_fraction(value: f64, thresholds: &Thresholds) -> f64 {
    (value / thresholds.high).clamp(0.0, 1.0)
}

/// Everything a sensor card shows for one reading
#[derive(Debug, Clone, Serialize)]
pub struct SensorDisplay {
    pub kind: SensorKind,
    pub value: f64,
    pub status: SensorStatus,
    pub trend: Trend,
    pub gauge: f64,
}

impl SensorDisplay {
    /// Without a previous value the trend is stable
    pub fn evaluate(kind: SensorKind, value: f64, previous: Option<f64>, thresholds: &Thresholds) -> Self {
        Self {
            kind,
            value,
            status: classify(value, thresholds),
            trend: previous.map_or(Trend::Stable, |p| trend(p, value)),
            gauge: gauge_fraction(value, thresholds),
        }
    }
}
