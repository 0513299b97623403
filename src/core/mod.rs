//! Core module - engine, scheduling and event distribution

mod engine;
mod scheduler;
mod event_bus;

pub use engine::{CycleReport, Engine};
pub use scheduler::Scheduler;
pub use event_bus::{EventBus, Event, EventPayload, EventType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::RiskPrediction;

/// System-wide state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemState {
    pub running: bool,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub total_readings: u64,
    pub uptime_seconds: u64,
    pub last_cycle: Option<DateTime<Utc>>,
    pub last_prediction: Option<RiskPrediction>,
}
