// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! HTTP client for the site sensor store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{SensorError, SensorReading, SensorSource};
use crate::config::SensorConfig;

/// Reads and writes rows under `{base_url}/sensor-data`
pub struct RemoteSensorStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteSensorStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SensorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SensorError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Both the store URL and the API key are required
    pub fn from_config(config: &SensorConfig) -> Result<Self, SensorError> {
        match (&config.store_url, &config.api_key) {
            (Some(url), Some(key)) if !url.is_empty() => Self::new(
                url,
                key,
                Duration::from_secs(config.request_timeout_secs),
            ),
            _ => Err(SensorError::NotConfigured),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/sensor-data", self.base_url)
    }

    /// Fetch all rows the store currently exposes
    pub async fn fetch_sensor_data(&self) -> Result<Vec<SensorReading>, SensorError> {
        let response = self
            .client
            .get(self.endpoint())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SensorError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Sensor store fetch failed: {}", status);
            return Err(SensorError::Transport(format!("fetch failed: {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SensorError::Malformed(e.to_string()))?;

        let readings = transform_rows(&body)?;
        debug!("Fetched {} readings from sensor store", readings.len());
        Ok(readings)
    }

    /// Store a new reading; the timestamp is set to now
    pub async fn insert_reading(&self, reading: &SensorReading) -> Result<(), SensorError> {
        let mut row = reading.clone();
        row.timestamp = Utc::now();

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&row)
            .send()
            .await
            .map_err(|e| SensorError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Sensor store insert failed: {}", status);
            return Err(SensorError::Transport(format!("insert failed: {}", status)));
        }

        Ok(())
    }
}

#[async_trait]
impl SensorSource for RemoteSensorStore {
    fn name(&self) -> &str {
        "remote-store"
    }

    async fn fetch(&self) -> Result<Vec<SensorReading>, SensorError> {
        self.fetch_sensor_data().await
    }
}

/// Copies every reading an inner source produces into the sensor store
pub struct RecordingSource {
    inner: Arc<dyn SensorSource>,
    store: RemoteSensorStore,
    name: String,
}

impl RecordingSource {
    pub fn new(inner: Arc<dyn SensorSource>, store: RemoteSensorStore) -> Self {
        let name = format!("{}+store", inner.name());
        Self { inner, store, name }
    }
}

#[async_trait]
impl SensorSource for RecordingSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// Store failures are logged; the readings are returned regardless
    async fn fetch(&self) -> Result<Vec<SensorReading>, SensorError> {
        let readings = self.inner.fetch().await?;
        for reading in &readings {
            if let Err(e) = self.store.insert_reading(reading).await {
                warn!("Could not record reading {}: {}", reading.id, e);
            }
        }
        Ok(readings)
    }
}

/// Convert the store's JSON array into readings
pub(crate) fn transform_rows(body: &Value) -> Result<Vec<SensorReading>, SensorError> {
    let rows = body
        .as_array()
        .ok_or_else(|| SensorError::Malformed("expected a JSON array".to_string()))?;
    Ok(rows.iter().map(SensorReading::from_raw).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorSimulator;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Minimal HTTP endpoint: accepts one request, answers with `status`
    /// and yields the raw request text.
    async fn serve_once(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + body_len {
                        break;
                    }
                }
            }

            let reply = format!(
                "HTTP/1.1 {}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n[]",
                status
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    #[test]
    fn test_transform_rows() {
        let body = json!([
            { "id": "a", "Soil_Strain": "310.5" },
            { "id": "b", "Rainfall_mm": 30 }
        ]);
        let readings = transform_rows(&body).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].soil_strain, 310.5);
        assert_eq!(readings[1].rainfall_mm, 30.0);
    }

    #[test]
    fn test_transform_rejects_object() {
        let err = transform_rows(&json!({ "rows": [] })).unwrap_err();
        assert!(matches!(err, SensorError::Malformed(_)));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = SensorConfig::default();
        assert!(matches!(
            RemoteSensorStore::from_config(&config),
            Err(SensorError::NotConfigured)
        ));

        let config = SensorConfig {
            store_url: Some("http://localhost:9000/".to_string()),
            api_key: Some("key".to_string()),
            ..SensorConfig::default()
        };
        let store = RemoteSensorStore::from_config(&config).unwrap();
        assert_eq!(store.endpoint(), "http://localhost:9000/sensor-data");
    }

    #[tokio::test]
    async fn test_insert_reading_posts_row() {
        let (base, server) = serve_once("201 Created").await;
        let store = RemoteSensorStore::new(&base, "site-key", Duration::from_secs(5)).unwrap();

        let mut reading = SensorReading::new("North Pit");
        reading.rainfall_mm = 12.5;
        store.insert_reading(&reading).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /sensor-data HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer site-key"));
        assert!(request.contains("\"Rainfall_mm\":12.5"));
        assert!(request.contains("\"sensor_location\":\"North Pit\""));
    }

    #[tokio::test]
    async fn test_insert_reading_rejected() {
        let (base, server) = serve_once("500 Internal Server Error").await;
        let store = RemoteSensorStore::new(&base, "site-key", Duration::from_secs(5)).unwrap();

        let err = store.insert_reading(&SensorReading::new("North Pit")).await.unwrap_err();
        assert!(matches!(err, SensorError::Transport(ref msg) if msg.contains("500")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_recording_source_writes_through() {
        let (base, server) = serve_once("201 Created").await;
        let store = RemoteSensorStore::new(&base, "site-key", Duration::from_secs(5)).unwrap();
        let source = RecordingSource::new(Arc::new(SensorSimulator::seeded("East Wall", 7)), store);
        assert_eq!(source.name(), "simulator+store");

        let readings = source.fetch().await.unwrap();
        assert_eq!(readings.len(), 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /sensor-data"));
        assert!(request.contains("\"sensor_location\":\"East Wall\""));
    }
}
