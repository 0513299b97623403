// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Prediction module - landslide risk predictions from sensor readings
//!
//! Two interchangeable predictors exist: [`RemotePredictor`] calls a model
//! endpoint, [`FallbackPredictor`] scores the latest reading with fixed
//! rules. [`ResilientPredictor`] chains them.

mod fallback;
mod remote;

pub use fallback::*;
pub use remote::*;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::sensors::SensorReading;

/// Prediction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Base URL of the model API; `/predict` is appended
    pub model_api_url: Option<String>,

    /// Optional bearer token
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Use the rule evaluator when the model is unavailable
    pub fallback_enabled: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model_api_url: None,
            api_key: None,
            timeout_secs: 10,
            fallback_enabled: true,
        }
    }
}

/// Errors from a prediction source
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Transport or API failure; never papered over with a default
    #[error("prediction unavailable: {0}")]
    Unavailable(String),

    #[error("prediction model not configured")]
    NotConfigured,

    #[error("no sensor data available")]
    NoData,
}

/// One risk classification, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    #[serde(rename = "risk_level")]
    pub is_high_risk: bool,

    /// In [0, 1]
    pub confidence: f64,

    pub contributing_factors: Vec<String>,

    #[serde(rename = "timestamp")]
    pub produced_at: DateTime<Utc>,
}

impl RiskPrediction {
    pub fn new(is_high_risk: bool, confidence: f64, contributing_factors: Vec<String>) -> Self {
        Self {
            is_high_risk,
            confidence,
            contributing_factors,
            produced_at: Utc::now(),
        }
    }
}

/// Operator-facing summary, e.g. `HIGH RISK - Confidence: 85.0%`
pub fn risk_assessment(prediction: &RiskPrediction) -> String {
    let label = if prediction.is_high_risk { "HIGH RISK" } else { "SAFE" };
    format!("{} - Confidence: {:.1}%", label, prediction.confidence * 100.0)
}

/// Produces a prediction from the most recent readings (oldest first)
#[async_trait]
pub trait RiskPredictor: Send + Sync {
    fn name(&self) -> &str;

    async fn predict(&self, readings: &[SensorReading]) -> Result<RiskPrediction, PredictionError>;
}

/// Remote model first, rule evaluator when it fails
pub struct ResilientPredictor {
    primary: Arc<dyn RiskPredictor>,
    fallback: FallbackPredictor,
}

impl ResilientPredictor {
    pub fn new(primary: Arc<dyn RiskPredictor>) -> Self {
        Self {
            primary,
            fallback: FallbackPredictor::new(),
        }
    }
}

#[async_trait]
impl RiskPredictor for ResilientPredictor {
    fn name(&self) -> &str {
        "resilient"
    }

    async fn predict(&self, readings: &[SensorReading]) -> Result<RiskPrediction, PredictionError> {
        match self.primary.predict(readings).await {
            Ok(prediction) => Ok(prediction),
            Err(e) => {
                warn!("{} predictor failed ({}), using rule evaluator", self.primary.name(), e);
                Ok(self.fallback.evaluate(readings.last()))
            }
        }
    }
}
