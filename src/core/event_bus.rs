// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::evacuation::EvacuationEvent;
use crate::prediction::RiskPrediction;
use crate::sensors::SensorReading;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    SensorReading,
    Prediction,
    Evacuation,
    Alert,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Reading(SensorReading),
    Prediction(RiskPrediction),
    Evacuation(EvacuationEvent),
    Alert { level: String, message: String },
    Error { message: String },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    reading_tx: broadcast::Sender<SensorReading>,
    prediction_tx: broadcast::Sender<RiskPrediction>,
    evacuation_tx: broadcast::Sender<EvacuationEvent>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (reading_tx, _) = broadcast::channel(capacity);
        let (prediction_tx, _) = broadcast::channel(capacity);
        let (evacuation_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            reading_tx,
            prediction_tx,
            evacuation_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_reading(&self, reading: SensorReading) {
        let _ = self.reading_tx.send(reading.clone());
        self.publish_event(EventType::SensorReading, EventPayload::Reading(reading));
    }

    pub fn publish_prediction(&self, prediction: RiskPrediction) {
        let _ = self.prediction_tx.send(prediction.clone());
        self.publish_event(EventType::Prediction, EventPayload::Prediction(prediction));
    }

    pub fn publish_evacuation(&self, event: EvacuationEvent) {
        let _ = self.evacuation_tx.send(event.clone());
        self.publish_event(EventType::Evacuation, EventPayload::Evacuation(event));
    }

    pub fn publish_alert(&self, level: &str, message: &str) {
        self.publish_event(
            EventType::Alert,
            EventPayload::Alert {
                level: level.to_string(),
                message: message.to_string(),
            },
        );
    }

    pub fn publish_error(&self, message: &str) {
        self.publish_event(
            EventType::Error,
            EventPayload::Error {
                message: message.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_readings(&self) -> broadcast::Receiver<SensorReading> {
        self.reading_tx.subscribe()
    }

    pub fn subscribe_predictions(&self) -> broadcast::Receiver<RiskPrediction> {
        self.prediction_tx.subscribe()
    }

    pub fn subscribe_evacuations(&self) -> broadcast::Receiver<EvacuationEvent> {
        self.evacuation_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_alert_reaches_event_stream() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe_events();

        bus.publish_alert("critical", "Evacuate Section B");
        bus.publish_error("store offline");

        let first = events.recv().await.unwrap();
        assert_eq!(first.event_type, EventType::Alert);
        let second = events.recv().await.unwrap();
        assert_eq!(second.event_type, EventType::Error);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_prediction_fanout() {
        let bus = EventBus::new(16);
        let mut predictions = bus.subscribe_predictions();
        let mut events = bus.subscribe_events();

        bus.publish_prediction(RiskPrediction::new(false, 0.2, vec![]));

        assert_eq!(predictions.recv().await.unwrap().confidence, 0.2);
        assert_eq!(events.recv().await.unwrap().event_type, EventType::Prediction);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish_reading(SensorReading::new("Pit 1"));
    }
}
