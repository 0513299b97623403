// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Operator commands - the manual override path into the coordinator,
//! plus manually raised site alarms.
//!
//! The headless binary reads these from stdin, one per line.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::EventBus;
use crate::evacuation::{EvacuationCoordinator, EvacuationEvent};
use crate::prediction::risk_assessment;

/// Manually raised alarm state, kept apart from automatic evacuations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAlertStatus {
    pub alert_active: bool,
    pub evacuation_active: bool,
}

/// Operator-raised alerts and evacuation orders.
///
/// Activations publish a `critical` alert on the event bus. An evacuation
/// order also raises the alert. Both stay active until reset.
pub struct ManualAlerts {
    event_bus: Arc<EventBus>,
    status: Mutex<ManualAlertStatus>,
}

impl ManualAlerts {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            status: Mutex::new(ManualAlertStatus::default()),
        }
    }

    pub fn status(&self) -> ManualAlertStatus {
        *self.status.lock()
    }

    /// Raise the site alert; false if it is already active
    pub fn activate_alert(&self) -> bool {
        let mut status = self.status.lock();
        if status.alert_active {
            return false;
        }
        status.alert_active = true;

        warn!("Manual alert activated");
        self.event_bus
            .publish_alert("critical", "Manual alert activated by operator");
        true
    }

    /// Order a site evacuation; false if one is already ordered
    pub fn activate_evacuation(&self) -> bool {
        let mut status = self.status.lock();
        if status.evacuation_active {
            return false;
        }
        status.evacuation_active = true;
        status.alert_active = true;

        warn!("Manual evacuation ordered");
        self.event_bus.publish_alert(
            "critical",
            "Manual evacuation ordered by operator - all personnel proceed to muster points",
        );
        true
    }

    /// Clear both flags; true if anything was active
    pub fn reset(&self) -> bool {
        let mut status = self.status.lock();
        let was_active = status.alert_active || status.evacuation_active;
        *status = ManualAlertStatus::default();

        if was_active {
            info!("Manual alerts reset");
            self.event_bus.publish_alert("info", "Manual alerts reset by operator");
        }
        was_active
    }
}

/// Commands an operator can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Acknowledge the triggered evacuation
    Acknowledge,

    /// Declare the site safe and end the evacuation
    Resolve,

    /// Show the current evacuation and statistics
    Status,

    /// List every recorded evacuation
    History,

    /// Drop past evacuations from the history
    ClearHistory,

    /// Turn automatic evacuation on or off
    SetAuto(bool),

    /// Raise the manual site alert
    Alert,

    /// Order a manual evacuation
    Evacuate,

    /// Clear manual alert and evacuation
    ResetAlerts,

    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command '{0}' (try 'help')")]
pub struct UnknownCommand(pub String);

impl FromStr for OperatorCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ack" | "acknowledge" => Ok(Self::Acknowledge),
            "resolve" | "safe" => Ok(Self::Resolve),
            "status" | "" => Ok(Self::Status),
            "history" => Ok(Self::History),
            "clear" | "clear-history" => Ok(Self::ClearHistory),
            "enable" | "auto on" => Ok(Self::SetAuto(true)),
            "disable" | "auto off" => Ok(Self::SetAuto(false)),
            "alert" => Ok(Self::Alert),
            "evacuate" => Ok(Self::Evacuate),
            "reset" | "reset-alerts" => Ok(Self::ResetAlerts),
            "help" | "?" => Ok(Self::Help),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl OperatorCommand {
    pub const HELP: &'static str =
        "commands: ack | resolve | status | history | clear | enable | disable | alert | evacuate | reset | help";

    /// Apply the command and describe the result
    pub fn execute(&self, coordinator: &EvacuationCoordinator, alerts: &ManualAlerts) -> String {
        match self {
            Self::Acknowledge => match coordinator.acknowledge() {
                Some(event) => format!("acknowledged {}", event.id),
                None => "no triggered evacuation to acknowledge".to_string(),
            },
            Self::Resolve => match coordinator.resolve() {
                Some(event) => format!("resolved {}", event.id),
                None => "no evacuation in progress".to_string(),
            },
            Self::Status => {
                let stats = coordinator.statistics();
                let manual = alerts.status();
                let current = coordinator
                    .current()
                    .map(|event| describe(&event))
                    .unwrap_or_else(|| "SAFE - no evacuation in progress".to_string());
                format!(
                    "{}\nauto evacuation: {} | total {} (triggered {}, acknowledged {}, resolved {})\nmanual alert: {} | manual evacuation: {}",
                    current,
                    if coordinator.is_enabled() { "on" } else { "off" },
                    stats.total,
                    stats.triggered,
                    stats.acknowledged,
                    stats.resolved,
                    if manual.alert_active { "ACTIVE" } else { "STANDBY" },
                    if manual.evacuation_active { "EVACUATING" } else { "none" }
                )
            }
            Self::History => {
                let history = coordinator.history();
                if history.is_empty() {
                    "no evacuations recorded".to_string()
                } else {
                    history.iter().map(describe).collect::<Vec<_>>().join("\n")
                }
            }
            Self::ClearHistory => {
                coordinator.clear_history();
                "history cleared".to_string()
            }
            Self::SetAuto(enabled) => {
                coordinator.set_enabled(*enabled);
                format!("auto evacuation {}", if *enabled { "enabled" } else { "disabled" })
            }
            Self::Alert => {
                if alerts.activate_alert() {
                    "manual alert ACTIVE".to_string()
                } else {
                    "manual alert already active".to_string()
                }
            }
            Self::Evacuate => {
                if alerts.activate_evacuation() {
                    "manual evacuation ordered".to_string()
                } else {
                    "manual evacuation already in progress".to_string()
                }
            }
            Self::ResetAlerts => {
                if alerts.reset() {
                    "manual alerts reset".to_string()
                } else {
                    "no manual alerts active".to_string()
                }
            }
            Self::Help => Self::HELP.to_string(),
        }
    }
}

fn describe(event: &EvacuationEvent) -> String {
    format!(
        "{} [{:?}] triggered {} - {}",
        event.id,
        event.state,
        event.triggered_at.format("%Y-%m-%d %H:%M:%S"),
        risk_assessment(&event.source_prediction)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventPayload, EventType};
    use crate::evacuation::EvacuationState;
    use crate::prediction::RiskPrediction;

    fn alerts() -> ManualAlerts {
        ManualAlerts::new(Arc::new(EventBus::new(16)))
    }

    #[test]
    fn test_parse() {
        assert_eq!("ack".parse(), Ok(OperatorCommand::Acknowledge));
        assert_eq!(" RESOLVE \n".parse(), Ok(OperatorCommand::Resolve));
        assert_eq!("auto off".parse(), Ok(OperatorCommand::SetAuto(false)));
        assert_eq!("".parse(), Ok(OperatorCommand::Status));
        assert_eq!("evacuate".parse(), Ok(OperatorCommand::Evacuate));
        assert_eq!("reset".parse(), Ok(OperatorCommand::ResetAlerts));
        assert!("siren".parse::<OperatorCommand>().is_err());
    }

    #[test]
    fn test_manual_lifecycle() {
        let coordinator = EvacuationCoordinator::new();
        let alerts = alerts();
        assert_eq!(
            OperatorCommand::Acknowledge.execute(&coordinator, &alerts),
            "no triggered evacuation to acknowledge"
        );

        coordinator.process_prediction(&RiskPrediction::new(true, 0.9, vec![]));
        let status = OperatorCommand::Status.execute(&coordinator, &alerts);
        assert!(status.contains("HIGH RISK - Confidence: 90.0%"));

        assert!(OperatorCommand::Acknowledge
            .execute(&coordinator, &alerts)
            .starts_with("acknowledged evac-"));
        assert!(OperatorCommand::Resolve
            .execute(&coordinator, &alerts)
            .starts_with("resolved evac-"));
        assert_eq!(coordinator.history()[0].state, EvacuationState::Resolved);

        assert_eq!(OperatorCommand::ClearHistory.execute(&coordinator, &alerts), "history cleared");
        assert_eq!(
            OperatorCommand::History.execute(&coordinator, &alerts),
            "no evacuations recorded"
        );
    }

    #[test]
    fn test_toggle_auto() {
        let coordinator = EvacuationCoordinator::new();
        let alerts = alerts();
        OperatorCommand::SetAuto(false).execute(&coordinator, &alerts);
        assert!(!coordinator.is_enabled());
        assert!(OperatorCommand::Status
            .execute(&coordinator, &alerts)
            .contains("auto evacuation: off"));
    }

    #[test]
    fn test_manual_alert_publishes_critical() {
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe_events();
        let alerts = ManualAlerts::new(Arc::clone(&bus));
        let coordinator = EvacuationCoordinator::new();

        assert_eq!(OperatorCommand::Alert.execute(&coordinator, &alerts), "manual alert ACTIVE");
        assert_eq!(
            OperatorCommand::Alert.execute(&coordinator, &alerts),
            "manual alert already active"
        );
        assert_eq!(
            alerts.status(),
            ManualAlertStatus { alert_active: true, evacuation_active: false }
        );

        let event = events.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::Alert);
        assert!(matches!(event.payload, EventPayload::Alert { ref level, .. } if level == "critical"));
        // The repeated activation published nothing
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_manual_evacuation_and_reset() {
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe_events();
        let alerts = ManualAlerts::new(Arc::clone(&bus));
        let coordinator = EvacuationCoordinator::new();

        assert_eq!(
            OperatorCommand::Evacuate.execute(&coordinator, &alerts),
            "manual evacuation ordered"
        );
        assert_eq!(
            alerts.status(),
            ManualAlertStatus { alert_active: true, evacuation_active: true }
        );
        assert!(OperatorCommand::Status
            .execute(&coordinator, &alerts)
            .contains("manual alert: ACTIVE | manual evacuation: EVACUATING"));
        // Manual orders never enter the automatic history
        assert!(coordinator.history().is_empty());

        assert_eq!(OperatorCommand::ResetAlerts.execute(&coordinator, &alerts), "manual alerts reset");
        assert_eq!(alerts.status(), ManualAlertStatus::default());
        assert_eq!(
            OperatorCommand::ResetAlerts.execute(&coordinator, &alerts),
            "no manual alerts active"
        );

        let levels: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|event| match event.payload {
                EventPayload::Alert { level, .. } => Some(level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec!["critical", "info"]);
    }
}
