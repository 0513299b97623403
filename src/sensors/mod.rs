//! Sensor module - reading model, threshold tiers and reading sources

mod traits;
mod thresholds;
mod remote;
mod simulator;

pub use traits::{SensorError, SensorReading, SensorSource};
pub use thresholds::{
    classify, gauge_fraction, trend, SensorDisplay, SensorKind, SensorStatus, ThresholdError,
    Thresholds, Trend, TREND_DEAD_BAND,
};
pub use remote::{RecordingSource, RemoteSensorStore};
pub use simulator::SensorSimulator;

pub(crate) use traits::lenient_f64;
