//! Bridge configuration document
//!
//! The bridge is configured from a single YAML document covering the
//! collector endpoint, team identity and the polling cadences. Every
//! cadence has a default, so a minimal document only names the collector
//! and the team. Configurations are validated before the bridge starts;
//! a bad document is a [`BridgeError::Config`] up front, never a runtime
//! surprise.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BridgeError, Result};
use crate::sync::EngineOptions;

/// Collector endpoint and credentials.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    /// Base URL of the pit wall collector, without a trailing path.
    pub base_url: String,
    /// Login email for the collector account.
    pub email: String,
    /// Login password for the collector account.
    pub password: String,
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Collector endpoint and credentials.
    pub collector: CollectorConfig,
    /// Team name as registered with the collector.
    pub team: String,
    /// Display name of the active driver.
    pub driver: String,
    /// Whether to record and upload per-lap telemetry traces.
    pub record_laps: bool,
    /// Poll interval in milliseconds while the game is absent or frozen.
    pub slow_cadence_ms: u64,
    /// Poll interval in milliseconds while session data is live.
    pub fast_cadence_ms: u64,
    /// Stall window in milliseconds before session data counts as frozen.
    pub freeze_after_ms: u64,
    /// Upload queue depth before records are dropped.
    pub queue_capacity: usize,
    /// Producer process id, required only for dedicated servers.
    pub producer_pid: Option<u32>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            collector: CollectorConfig::default(),
            team: String::new(),
            driver: String::new(),
            record_laps: true,
            slow_cadence_ms: engine.slow_cadence.as_millis() as u64,
            fast_cadence_ms: engine.fast_cadence.as_millis() as u64,
            freeze_after_ms: engine.freeze_after.as_millis() as u64,
            queue_capacity: 64,
            producer_pid: None,
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a YAML configuration document.
    pub fn from_yaml(document: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml_ng::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|err| {
            BridgeError::config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_yaml(&document)
    }

    /// Validates the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.collector.base_url.is_empty() {
            return Err(BridgeError::config("collector.base_url is required"));
        }
        if !self.collector.base_url.starts_with("http://")
            && !self.collector.base_url.starts_with("https://")
        {
            return Err(BridgeError::config(format!(
                "collector.base_url '{}' must start with http:// or https://",
                self.collector.base_url
            )));
        }
        if self.collector.email.is_empty() {
            return Err(BridgeError::config("collector.email is required"));
        }
        if self.collector.password.is_empty() {
            return Err(BridgeError::config("collector.password is required"));
        }
        if self.team.is_empty() {
            return Err(BridgeError::config("team is required"));
        }
        if normalize_team_id(&self.team).is_empty() {
            return Err(BridgeError::config(format!(
                "team '{}' contains no usable identifier characters",
                self.team
            )));
        }
        if self.driver.is_empty() {
            return Err(BridgeError::config("driver is required"));
        }
        if self.slow_cadence_ms == 0 || self.fast_cadence_ms == 0 {
            return Err(BridgeError::config("cadences must be greater than zero"));
        }
        if self.fast_cadence_ms > self.slow_cadence_ms {
            return Err(BridgeError::config(format!(
                "fast cadence {}ms exceeds slow cadence {}ms",
                self.fast_cadence_ms, self.slow_cadence_ms
            )));
        }
        if self.freeze_after_ms == 0 {
            return Err(BridgeError::config("freeze_after_ms must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(BridgeError::config("queue_capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Engine options derived from the configured cadences.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            slow_cadence: Duration::from_millis(self.slow_cadence_ms),
            fast_cadence: Duration::from_millis(self.fast_cadence_ms),
            freeze_after: Duration::from_millis(self.freeze_after_ms),
            producer_pid: self.producer_pid,
            ..EngineOptions::default()
        }
    }

    /// Collector-facing team identifier derived from the team name.
    pub fn team_id(&self) -> String {
        normalize_team_id(&self.team)
    }
}

/// Normalizes a display name into a collector identifier: lowercased, with
/// every run of non-alphanumeric characters collapsed into a single dash.
pub fn normalize_team_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut gap = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if gap && !id.is_empty() {
                id.push('-');
            }
            gap = false;
            id.push(ch.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    id
}
