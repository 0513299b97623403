// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Rule-based risk scoring over the latest reading

use async_trait::async_trait;

use super::{PredictionError, RiskPrediction, RiskPredictor};
use crate::sensors::SensorReading;

/// Score at or above which the site is considered high risk, in tenths
const HIGH_RISK_TENTHS: u32 = 7;

/// One weighted rule: feature extractor, limit, weight in tenths, factor text
struct RiskRule {
    feature: fn(&SensorReading) -> f64,
    limit: f64,
    weight_tenths: u32,
    factor: &'static str,
}

const RULES: [RiskRule; 5] = [
    RiskRule {
        feature: |r| r.rainfall_mm,
        limit: 25.0,
        weight_tenths: 3,
        factor: "High current rainfall",
    },
    RiskRule {
        feature: |r| r.rainfall_3day,
        limit: 50.0,
        weight_tenths: 2,
        factor: "High 3-day rainfall accumulation",
    },
    RiskRule {
        feature: |r| r.rainfall_7day,
        limit: 100.0,
        weight_tenths: 2,
        factor: "High 7-day rainfall accumulation",
    },
    RiskRule {
        feature: |r| r.soil_strain,
        limit: 300.0,
        weight_tenths: 4,
        factor: "Critical soil strain levels",
    },
    RiskRule {
        feature: |r| r.pore_water_pressure_kpa,
        limit: 200.0,
        weight_tenths: 3,
        factor: "Elevated pore water pressure",
    },
];

/// Local rule evaluator; never fails
#[derive(Debug, Default, Clone)]
pub struct FallbackPredictor;

impl FallbackPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Score a single reading. `None` means nothing has been read yet.
    pub fn evaluate(&self, latest: Option<&SensorReading>) -> RiskPrediction {
        let Some(reading) = latest else {
            return RiskPrediction::new(false, 0.0, vec!["No data available".to_string()]);
        };

        // Whole tenths keep 0.3 + 0.4 exactly on the 0.7 boundary
        let mut score_tenths = 0;
        let mut factors = Vec::new();
        for rule in &RULES {
            if (rule.feature)(reading) > rule.limit {
                score_tenths += rule.weight_tenths;
                factors.push(rule.factor.to_string());
            }
        }

        if factors.is_empty() {
            factors.push("Normal conditions".to_string());
        }

        let confidence = (f64::from(score_tenths) / 10.0).min(1.0);
        RiskPrediction::new(score_tenths >= HIGH_RISK_TENTHS, confidence, factors)
    }
}

#[async_trait]
impl RiskPredictor for FallbackPredictor {
    fn name(&self) -> &str {
        "rules"
    }

    async fn predict(&self, readings: &[SensorReading]) -> Result<RiskPrediction, PredictionError> {
        Ok(self.evaluate(readings.last()))
    }
}
