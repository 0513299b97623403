// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Client for a remote landslide prediction model

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use super::{PredictionConfig, PredictionError, RiskPrediction, RiskPredictor};
use crate::sensors::{lenient_f64, SensorReading};

/// Request body for `POST {model_api_url}/predict`
#[derive(Debug, Serialize)]
pub struct ModelInput {
    pub features: ModelFeatures,
    pub timestamp: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct ModelFeatures {
    pub rainfall_mm: f64,
    pub rainfall_3day: f64,
    pub rainfall_7day: f64,
    pub temperature_c: f64,
    pub soil_strain: f64,
    pub pore_water_pressure_kpa: f64,
}

impl From<&SensorReading> for ModelInput {
    fn from(latest: &SensorReading) -> Self {
        Self {
            features: ModelFeatures {
                rainfall_mm: latest.rainfall_mm,
                rainfall_3day: latest.rainfall_3day,
                rainfall_7day: latest.rainfall_7day,
                temperature_c: latest.temperature_c,
                soil_strain: latest.soil_strain,
                pore_water_pressure_kpa: latest.pore_water_pressure_kpa,
            },
            timestamp: latest.timestamp.to_rfc3339(),
            location: latest.location.clone(),
        }
    }
}

pub struct RemotePredictor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemotePredictor {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, PredictionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictionError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &PredictionConfig) -> Result<Self, PredictionError> {
        match &config.model_api_url {
            Some(url) if !url.is_empty() => Self::new(
                url,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            ),
            _ => Err(PredictionError::NotConfigured),
        }
    }
}

#[async_trait]
impl RiskPredictor for RemotePredictor {
    fn name(&self) -> &str {
        "remote-model"
    }

    async fn predict(&self, readings: &[SensorReading]) -> Result<RiskPrediction, PredictionError> {
        let latest = readings.last().ok_or(PredictionError::NoData)?;
        let input = ModelInput::from(latest);

        let mut request = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&input);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PredictionError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Model API failed: {}", status);
            return Err(PredictionError::Unavailable(format!("model API returned {}", status)));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| PredictionError::Unavailable(format!("undecodable model response: {}", e)))?;

        let prediction = format_prediction(&raw);
        debug!(
            "Model prediction: high_risk={} confidence={:.2}",
            prediction.is_high_risk, prediction.confidence
        );
        Ok(prediction)
    }
}

/// Normalize whatever the model returned.
///
/// High risk when `risk_level` is truthy or `prediction` is exactly 1.
pub fn format_prediction(raw: &Value) -> RiskPrediction {
    let is_high_risk = raw.get("risk_level").is_some_and(truthy)
        || raw.get("prediction").and_then(Value::as_f64) == Some(1.0);

    let confidence = raw
        .get("confidence")
        .and_then(lenient_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let contributing_factors = raw
        .get("contributing_factors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    RiskPrediction::new(is_high_risk, confidence, contributing_factors)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
