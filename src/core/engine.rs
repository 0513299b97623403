// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Monitoring engine - polls sensors, predicts risk, drives evacuations

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{EventBus, Scheduler, SystemState};
use crate::config::Config;
use crate::evacuation::{EvacuationCoordinator, Outcome};
use crate::prediction::{
    risk_assessment, FallbackPredictor, PredictionError, RemotePredictor, ResilientPredictor,
    RiskPrediction, RiskPredictor,
};
use crate::sensors::{
    RecordingSource, RemoteSensorStore, SensorDisplay, SensorKind, SensorReading,
    SensorSimulator, SensorSource, SensorStatus,
};

/// Result of one polling cycle
#[derive(Debug, Clone)]
pub enum CycleReport {
    /// Nothing reached the coordinator this cycle
    Skipped { reason: String },
    Completed {
        readings: usize,
        prediction: RiskPrediction,
        outcome: Outcome,
    },
}

/// Wires sensor source → risk predictor → evacuation coordinator
pub struct Engine {
    pub config: Arc<Config>,
    source: Arc<dyn SensorSource>,
    predictor: Arc<dyn RiskPredictor>,
    coordinator: Arc<EvacuationCoordinator>,
    event_bus: Arc<EventBus>,
    state: Arc<RwLock<SystemState>>,
    last_reading: Mutex<Option<SensorReading>>,
    start_time: Instant,
}

impl Engine {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn SensorSource>,
        predictor: Arc<dyn RiskPredictor>,
        coordinator: Arc<EvacuationCoordinator>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        coordinator.set_enabled(config.evacuation.auto_enabled);

        let bus = Arc::clone(&event_bus);
        coordinator.on_evacuation_event(move |event| bus.publish_evacuation(event.clone()));

        Self {
            config,
            source,
            predictor,
            coordinator,
            event_bus,
            state: Arc::new(RwLock::new(SystemState::default())),
            last_reading: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    /// Build the default component graph for a configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let source: Arc<dyn SensorSource> = if config.demo_mode {
            info!("Demo mode: using simulated sensors");
            let simulator: Arc<dyn SensorSource> =
                Arc::new(SensorSimulator::new(&config.sensors.demo_location));
            match RemoteSensorStore::from_config(&config.sensors) {
                Ok(store) => {
                    info!("Recording simulated readings to the sensor store");
                    Arc::new(RecordingSource::new(simulator, store))
                }
                Err(_) => simulator,
            }
        } else {
            Arc::new(RemoteSensorStore::from_config(&config.sensors)?)
        };

        let predictor: Arc<dyn RiskPredictor> = match RemotePredictor::from_config(&config.prediction) {
            Ok(remote) if config.prediction.fallback_enabled => {
                Arc::new(ResilientPredictor::new(Arc::new(remote)))
            }
            Ok(remote) => Arc::new(remote),
            Err(PredictionError::NotConfigured) => {
                info!("No prediction model configured, using rule evaluator");
                Arc::new(FallbackPredictor::new())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(
            Arc::new(config),
            source,
            predictor,
            Arc::new(EvacuationCoordinator::new()),
            Arc::new(EventBus::new(256)),
        ))
    }

    pub fn coordinator(&self) -> &Arc<EvacuationCoordinator> {
        &self.coordinator
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Poll once and feed the result to the coordinator.
    ///
    /// Source or predictor failures skip the cycle; the coordinator is only
    /// called with a real prediction.
    pub async fn run_cycle(&self) -> CycleReport {
        let readings = match self.source.fetch().await {
            Ok(readings) => readings,
            Err(e) => {
                warn!("Sensor fetch from {} failed: {}", self.source.name(), e);
                return self.skip(format!("sensor fetch failed: {}", e)).await;
            }
        };

        let Some(latest) = readings.last().cloned() else {
            debug!("No readings this cycle");
            return self.skip("no readings".to_string()).await;
        };

        self.evaluate_displays(&latest);
        for reading in &readings {
            self.event_bus.publish_reading(reading.clone());
        }

        let prediction = match self.predictor.predict(&readings).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!("Risk prediction from {} failed: {}", self.predictor.name(), e);
                return self.skip(format!("prediction failed: {}", e)).await;
            }
        };

        debug!("{}", risk_assessment(&prediction));
        self.event_bus.publish_prediction(prediction.clone());
        let outcome = self.coordinator.process_prediction(&prediction);

        {
            let mut state = self.state.write().await;
            state.cycles += 1;
            state.total_readings += readings.len() as u64;
            state.last_cycle = Some(Utc::now());
            state.last_prediction = Some(prediction.clone());
            state.uptime_seconds = self.uptime();
        }

        CycleReport::Completed {
            readings: readings.len(),
            prediction,
            outcome,
        }
    }

    async fn skip(&self, reason: String) -> CycleReport {
        self.event_bus.publish_error(&reason);
        {
            let mut state = self.state.write().await;
            state.cycles += 1;
            state.failed_cycles += 1;
            state.last_cycle = Some(Utc::now());
        }
        CycleReport::Skipped { reason }
    }

    /// Classify the latest reading per sensor kind and raise alerts for
    /// high-tier values. Trends compare with the previous cycle.
    pub fn evaluate_displays(&self, latest: &SensorReading) -> Vec<SensorDisplay> {
        let previous = self.last_reading.lock().replace(latest.clone());

        let displays: Vec<SensorDisplay> = SensorKind::ALL
            .iter()
            .filter_map(|&kind| {
                let value = latest.value_for(kind)?;
                let prior = previous.as_ref().and_then(|p| p.value_for(kind));
                Some(SensorDisplay::evaluate(kind, value, prior, self.config.thresholds.get(kind)))
            })
            .collect();

        for card in &displays {
            debug!(
                "{}: {:.2} {} [{}] {}",
                card.kind.label(),
                card.value,
                card.kind.unit(),
                card.status.label(),
                card.trend.label()
            );
            if card.status == SensorStatus::High {
                self.event_bus.publish_alert(
                    "high",
                    &format!(
                        "{} at {} reads {:.2} {}",
                        card.kind.label(),
                        latest.location,
                        card.value,
                        card.kind.unit()
                    ),
                );
            }
        }

        displays
    }

    /// Poll on the configured interval until `shutdown` fires
    pub async fn run(self: Arc<Self>, shutdown: broadcast::Sender<()>) -> Result<()> {
        info!("Starting monitoring engine...");
        let mut shutdown_rx = shutdown.subscribe();
        self.state.write().await.running = true;

        let period = Duration::from_secs(self.config.sensors.poll_interval_secs.max(1));
        let scheduler = Scheduler::new();
        let engine = Arc::clone(&self);
        scheduler
            .add_task("sensor-poll", period, move || {
                let engine = Arc::clone(&engine);
                async move {
                    if let CycleReport::Completed { outcome: Outcome::Triggered(event), .. } =
                        engine.run_cycle().await
                    {
                        info!("Evacuation {} in progress", event.id);
                    }
                }
            })
            .await;

        let handles = scheduler.start(&shutdown).await;
        info!("Polling {} every {:?}", self.source.name(), period);

        let _ = shutdown_rx.recv().await;
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }

        self.state.write().await.running = false;
        info!("Monitoring engine stopped");
        Ok(())
    }

    pub async fn state(&self) -> SystemState {
        let mut state = self.state.read().await.clone();
        state.uptime_seconds = self.uptime();
        state
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::evacuation::EvacuationState;
    use crate::sensors::SensorError;

    /// Replays scripted batches, then repeats the last one
    struct Scripted {
        batches: Mutex<Vec<Result<Vec<SensorReading>, String>>>,
    }

    impl Scripted {
        fn new(batches: Vec<Result<Vec<SensorReading>, String>>) -> Self {
            Self { batches: Mutex::new(batches) }
        }
    }

    #[async_trait]
    impl SensorSource for Scripted {
        fn name(&self) -> &str { "scripted" }

        async fn fetch(&self) -> Result<Vec<SensorReading>, SensorError> {
            let mut batches = self.batches.lock();
            let next = if batches.len() > 1 { batches.remove(0) } else { batches[0].clone() };
            next.map_err(SensorError::Transport)
        }
    }

    struct Down;

    #[async_trait]
    impl RiskPredictor for Down {
        fn name(&self) -> &str { "down" }

        async fn predict(&self, _readings: &[SensorReading]) -> Result<RiskPrediction, PredictionError> {
            Err(PredictionError::Unavailable("503".to_string()))
        }
    }

    fn storm() -> SensorReading {
        let mut r = SensorReading::new("Section B");
        r.rainfall_mm = 30.0;
        r.rainfall_3day = 60.0;
        r.rainfall_7day = 110.0;
        r.soil_strain = 320.0;
        r.pore_water_pressure_kpa = 210.0;
        r
    }

    fn calm() -> SensorReading {
        let mut r = SensorReading::new("Section B");
        r.soil_strain = 120.0;
        r
    }

    fn engine(source: Scripted, predictor: Arc<dyn RiskPredictor>) -> Engine {
        Engine::new(
            Arc::new(Config::default()),
            Arc::new(source),
            predictor,
            Arc::new(EvacuationCoordinator::new()),
            Arc::new(EventBus::new(64)),
        )
    }

    #[tokio::test]
    async fn test_storm_triggers_then_calm_resolves() {
        let engine = engine(
            Scripted::new(vec![Ok(vec![storm()]), Ok(vec![storm()]), Ok(vec![calm()])]),
            Arc::new(FallbackPredictor::new()),
        );
        let mut evacuations = engine.event_bus().subscribe_evacuations();

        let first = engine.run_cycle().await;
        assert!(matches!(first, CycleReport::Completed { outcome: Outcome::Triggered(_), .. }));
        let second = engine.run_cycle().await;
        assert!(matches!(second, CycleReport::Completed { outcome: Outcome::Unchanged, .. }));
        let third = engine.run_cycle().await;
        assert!(matches!(third, CycleReport::Completed { outcome: Outcome::Resolved(_), .. }));

        assert_eq!(evacuations.recv().await.unwrap().state, EvacuationState::Triggered);
        assert_eq!(evacuations.recv().await.unwrap().state, EvacuationState::Resolved);

        let state = engine.state().await;
        assert_eq!(state.cycles, 3);
        assert_eq!(state.failed_cycles, 0);
        assert_eq!(state.total_readings, 3);
    }

    #[tokio::test]
    async fn test_predictor_failure_skips_coordinator() {
        let engine = engine(Scripted::new(vec![Ok(vec![storm()])]), Arc::new(Down));

        let report = engine.run_cycle().await;
        assert!(matches!(report, CycleReport::Skipped { .. }));
        assert!(engine.coordinator().history().is_empty());
        assert_eq!(engine.state().await.failed_cycles, 1);
    }

    #[tokio::test]
    async fn test_missing_data_never_resolves() {
        let engine = engine(
            Scripted::new(vec![
                Ok(vec![storm()]),
                Ok(vec![]),
                Err("connection reset".to_string()),
            ]),
            Arc::new(FallbackPredictor::new()),
        );

        engine.run_cycle().await;
        assert!(matches!(engine.run_cycle().await, CycleReport::Skipped { .. }));
        assert!(matches!(engine.run_cycle().await, CycleReport::Skipped { .. }));
        assert_eq!(
            engine.coordinator().current().unwrap().state,
            EvacuationState::Triggered
        );
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let mut config = Config::default();
        config.evacuation.auto_enabled = false;
        let engine = Engine::new(
            Arc::new(config),
            Arc::new(Scripted::new(vec![Ok(vec![storm()])])),
            Arc::new(FallbackPredictor::new()),
            Arc::new(EvacuationCoordinator::new()),
            Arc::new(EventBus::new(16)),
        );

        let report = engine.run_cycle().await;
        assert!(matches!(report, CycleReport::Completed { outcome: Outcome::Ignored, .. }));
    }

    #[test]
    fn test_displays_and_high_alerts() {
        let engine = engine(Scripted::new(vec![Ok(vec![])]), Arc::new(FallbackPredictor::new()));
        let mut events = engine.event_bus().subscribe_events();

        engine.evaluate_displays(&calm());
        let displays = engine.evaluate_displays(&storm());

        assert_eq!(displays.len(), 4);
        let strain = displays.iter().find(|d| d.kind == SensorKind::Strain).unwrap();
        assert_eq!(strain.status, SensorStatus::High);
        assert_eq!(strain.trend, crate::sensors::Trend::Up);

        // Strain, pore pressure and rainfall are at or above their high tier
        let mut alerts = 0;
        while let Ok(event) = events.try_recv() {
            if event.event_type == crate::core::EventType::Alert {
                alerts += 1;
            }
        }
        assert_eq!(alerts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let engine = Arc::new(engine(
            Scripted::new(vec![Ok(vec![calm()])]),
            Arc::new(FallbackPredictor::new()),
        ));
        let (shutdown, _) = broadcast::channel(1);

        let runner = tokio::spawn(Arc::clone(&engine).run(shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(11)).await;
        shutdown.send(()).unwrap();
        runner.await.unwrap().unwrap();

        let state = engine.state().await;
        assert!(!state.running);
        assert_eq!(state.cycles, 3);
    }
}
