// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! minewatch - mining-site environmental monitoring
//!
//! Watches rainfall, soil strain, pore water pressure and temperature,
//! classifies each reading against three-tier thresholds, derives a
//! landslide risk prediction and drives an automatic evacuation lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Monitoring Engine                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────┐   ┌─────────────────────────┐ │
//! │  │ Sensor   │ → │ Risk       │ → │ Evacuation Coordinator  │ │
//! │  │ Source   │   │ Predictor  │   │ triggered → ack → done  │ │
//! │  └──────────┘   └────────────┘   └─────────────────────────┘ │
//! │       ↓                                     ↓                │
//! │  ┌──────────┐   ┌──────────────────────────────────────────┐ │
//! │  │Thresholds│ → │                Event Bus                 │ │
//! │  └──────────┘   └──────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod sensors;
pub mod prediction;
pub mod evacuation;
pub mod operator;
pub mod config;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, EventBus};
pub use sensors::{SensorReading, SensorSource};
pub use prediction::{RiskPrediction, RiskPredictor};
pub use evacuation::{EvacuationCoordinator, EvacuationEvent, EvacuationState};
pub use operator::{ManualAlerts, OperatorCommand};

/// minewatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// minewatch name
pub const NAME: &str = "minewatch";
