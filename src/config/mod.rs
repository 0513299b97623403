// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use crate::prediction::PredictionConfig;
use crate::sensors::{SensorKind, Thresholds};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site name shown in logs
    pub site_name: String,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated sensors)
    pub demo_mode: bool,

    /// Sensor store configuration
    pub sensors: SensorConfig,

    /// Risk prediction configuration
    pub prediction: PredictionConfig,

    /// Evacuation configuration
    pub evacuation: EvacuationConfig,

    /// Per-sensor display thresholds
    pub thresholds: ThresholdSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_name: "Mine Site".to_string(),
            log_level: "info".to_string(),
            demo_mode: true,
            sensors: SensorConfig::default(),
            prediction: PredictionConfig::default(),
            evacuation: EvacuationConfig::default(),
            thresholds: ThresholdSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// `log_level` as a tracing level; unrecognised names mean INFO
    pub fn tracing_level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("minewatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Sensor store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Base URL of the sensor store
    pub store_url: Option<String>,

    /// Bearer token for the sensor store
    pub api_key: Option<String>,

    /// Polling interval in seconds
    pub poll_interval_secs: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Location label for simulated readings
    pub demo_location: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            api_key: None,
            poll_interval_secs: 5,
            request_timeout_secs: 10,
            demo_location: "Section A - North Wall".to_string(),
        }
    }
}

/// Evacuation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvacuationConfig {
    /// Let risk predictions trigger evacuations automatically
    pub auto_enabled: bool,
}

impl Default for EvacuationConfig {
    fn default() -> Self {
        Self { auto_enabled: true }
    }
}

/// Display tiers per sensor kind; validated when deserialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub displacement: Thresholds,
    pub strain: Thresholds,
    pub pore_pressure: Thresholds,
    pub rainfall: Thresholds,
    pub temperature: Thresholds,
    pub vibration: Thresholds,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            displacement: SensorKind::Displacement.default_thresholds(),
            strain: SensorKind::Strain.default_thresholds(),
            pore_pressure: SensorKind::PorePressure.default_thresholds(),
            rainfall: SensorKind::Rainfall.default_thresholds(),
            temperature: SensorKind::Temperature.default_thresholds(),
            vibration: SensorKind::Vibration.default_thresholds(),
        }
    }
}

impl ThresholdSettings {
    pub fn get(&self, kind: SensorKind) -> &Thresholds {
        match kind {
            SensorKind::Displacement => &self.displacement,
            SensorKind::Strain => &self.strain,
            SensorKind::PorePressure => &self.pore_pressure,
            SensorKind::Rainfall => &self.rainfall,
            SensorKind::Temperature => &self.temperature,
            SensorKind::Vibration => &self.vibration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip_defaults() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.thresholds, ThresholdSettings::default());
        assert_eq!(parsed.sensors.poll_interval_secs, 5);
        assert!(parsed.evacuation.auto_enabled);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            demo_mode = false

            [sensors]
            store_url = "https://store.example"
            api_key = "k"

            [thresholds.strain]
            safe = 150.0
            moderate = 250.0
            high = 350.0
            "#,
        )
        .unwrap();

        assert!(!parsed.demo_mode);
        assert_eq!(parsed.sensors.store_url.as_deref(), Some("https://store.example"));
        assert_eq!(parsed.sensors.poll_interval_secs, 5);
        assert_eq!(parsed.thresholds.get(SensorKind::Strain).high(), 350.0);
        assert_eq!(parsed.thresholds.rainfall, SensorKind::Rainfall.default_thresholds());
    }

    #[test]
    fn test_rejects_descending_thresholds() {
        let parsed: Result<Config, _> = toml::from_str(
            r#"
            [thresholds.rainfall]
            safe = 25.0
            moderate = 15.0
            high = 5.0
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_load_or_create_writes_file() {
        let dir = std::env::temp_dir().join(format!("minewatch-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.site_name, created.site_name);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_tracing_level_from_file() {
        let config: Config = toml::from_str("log_level = \"debug\"").unwrap();
        assert_eq!(config.tracing_level(), Level::DEBUG);

        let config: Config = toml::from_str("log_level = \"WARN\"").unwrap();
        assert_eq!(config.tracing_level(), Level::WARN);

        let config: Config = toml::from_str("log_level = \"chatty\"").unwrap();
        assert_eq!(config.tracing_level(), Level::INFO);
        assert_eq!(Config::default().tracing_level(), Level::INFO);
    }
}
