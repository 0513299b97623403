// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Simulated site sensors for demo mode

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::StdRng;

use super::{SensorError, SensorReading, SensorSource};

/// Produces plausible readings with occasional storm episodes
pub struct SensorSimulator {
    location: String,
    state: Mutex<SimState>,
}

struct SimState {
    rng: StdRng,
    sequence: u64,

    // Simulation state
    storm_probability: f64,
    storm_cycles_left: u32,
    rain_history: Vec<f64>,
    soil_strain: f64,
    pore_pressure: f64,
    temperature: f64,
}

impl SensorSimulator {
    pub fn new(location: &str) -> Self {
        Self::with_rng(location, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests and reproducible demos
    pub fn seeded(location: &str, seed: u64) -> Self {
        Self::with_rng(location, StdRng::seed_from_u64(seed))
    }

    fn with_rng(location: &str, rng: StdRng) -> Self {
        Self {
            location: location.to_string(),
            state: Mutex::new(SimState {
                rng,
                sequence: 0,
                storm_probability: 0.05,
                storm_cycles_left: 0,
                rain_history: Vec::new(),
                soil_strain: 120.0,
                pore_pressure: 85.0,
                temperature: 22.0,
            }),
        }
    }

    /// Force a storm lasting `cycles` readings
    pub fn start_storm(&self, cycles: u32) {
        self.state.lock().storm_cycles_left = cycles;
    }

    fn next_reading(&self) -> SensorReading {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.storm_cycles_left == 0 && state.rng.gen_bool(state.storm_probability) {
            state.storm_cycles_left = state.rng.gen_range(5..15);
        }
        let storming = state.storm_cycles_left > 0;
        if storming {
            state.storm_cycles_left -= 1;
        }

        let rainfall = if storming {
            state.rng.gen_range(20.0..45.0)
        } else if state.rng.gen_bool(0.2) {
            state.rng.gen_range(0.0..3.0)
        } else {
            0.0
        };
        state.rain_history.push(rainfall);
        if state.rain_history.len() > 7 {
            state.rain_history.remove(0);
        }

        // Strain and pore pressure lag the rain and relax slowly afterwards
        let (strain_target, pressure_target) = if storming { (340.0, 230.0) } else { (120.0, 85.0) };
        let strain_noise = state.rng.gen_range(-2.0..2.0);
        let pressure_noise = state.rng.gen_range(-1.0..1.0);
        state.soil_strain += (strain_target - state.soil_strain) * 0.25 + strain_noise;
        state.pore_pressure += (pressure_target - state.pore_pressure) * 0.25 + pressure_noise;
        let temperature_noise = state.rng.gen_range(-0.2..0.2);
        state.temperature = (state.temperature + temperature_noise).clamp(10.0, 35.0);

        state.sequence += 1;
        let rain_3day: f64 = state.rain_history.iter().rev().take(3).sum();
        let rain_7day: f64 = state.rain_history.iter().sum();

        let mut reading = SensorReading::new(&self.location);
        reading.id = format!("sim-{}", state.sequence);
        reading.rainfall_mm = rainfall;
        reading.rainfall_3day = rain_3day;
        reading.rainfall_7day = rain_7day;
        reading.temperature_c = state.temperature;
        reading.soil_strain = state.soil_strain.max(0.0);
        reading.pore_water_pressure_kpa = state.pore_pressure.max(0.0);
        reading
    }
}

#[async_trait]
impl SensorSource for SensorSimulator {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch(&self) -> Result<Vec<SensorReading>, SensorError> {
        Ok(vec![self.next_reading()])
    }
}
