// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Evacuation module - automatic evacuation lifecycle
//!
//! ```text
//!   Triggered ──acknowledge──▶ Acknowledged
//!       │                          │
//!       └──resolve / safe──▶ Resolved ◀──resolve / safe──┘
//! ```
//!
//! [`EvacuationCoordinator`] consumes risk predictions, debounces repeated
//! triggers and notifies subscribers once per transition.

mod coordinator;
mod observers;

pub use coordinator::{EvacuationCoordinator, Outcome, TRIGGER_CONFIDENCE};
pub use observers::SubscriptionId;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::RiskPrediction;

/// Lifecycle state of an evacuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvacuationState {
    Triggered,
    Acknowledged,
    Resolved,
}

impl EvacuationState {
    /// Triggered and acknowledged events both count as an ongoing evacuation
    pub fn is_active(&self) -> bool {
        !matches!(self, EvacuationState::Resolved)
    }
}

/// One automatic evacuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacuationEvent {
    pub id: String,
    pub triggered_at: DateTime<Utc>,
    pub source_prediction: RiskPrediction,
    pub state: EvacuationState,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EvacuationEvent {
    fn triggered(prediction: RiskPrediction) -> Self {
        Self {
            id: format!("evac-{}", uuid::Uuid::new_v4()),
            triggered_at: Utc::now(),
            source_prediction: prediction,
            state: EvacuationState::Triggered,
            acknowledged_at: None,
            resolved_at: None,
        }
    }
}

/// Counts over the evacuation history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvacuationStatistics {
    pub total: usize,
    pub triggered: usize,
    pub acknowledged: usize,
    pub resolved: usize,
    pub currently_evacuating: bool,
}
