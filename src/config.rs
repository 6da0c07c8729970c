//! Agent configuration
//!
//! One [`AgentConfig`] is built at process start (defaults, JSON file, CLI
//! overrides) and handed to the agent by value. Thresholds are static for
//! the process lifetime.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};

/// Default offline buffer capacity (samples)
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Default sampling cadence in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Default link reconnect interval in milliseconds
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5_000;

/// Default pause between buffered publishes during a drain pass
pub const DEFAULT_DRAIN_PAUSE_MS: u64 = 50;

/// Inclusive `{min, max}` bounds for one classified channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Static alert thresholds, one `{min, max}` pair per channel.
///
/// Temperature and heart-rate breaches are critical on either edge; only
/// the high edge of humidity raises (as a warning).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: Bounds,
    pub bpm: Bounds,
    pub humidity: Bounds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: Bounds::new(35.0, 38.0),
            bpm: Bounds::new(50.0, 120.0),
            humidity: Bounds::new(20.0, 80.0),
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Device identifier stamped into every sample and alert
    pub device_id: String,
    /// Offline buffer capacity in samples
    pub buffer_capacity: usize,
    /// Sampling cadence
    pub tick_interval_ms: u64,
    /// Link reconnect pacing
    pub retry_interval_ms: u64,
    /// Pause between buffered publishes during a drain pass
    pub drain_pause_ms: u64,
    /// Drive temperature/humidity/BPM from the oscillation policy instead
    /// of the physical environment sensor
    pub simulation: bool,
    /// Whether the link starts enabled (`wifi on`)
    pub link_enabled: bool,
    /// Topic carrying one JSON object per sample
    pub data_topic: String,
    /// Topic carrying one JSON object per alert
    pub alert_topic: String,
    pub thresholds: Thresholds,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_id: "vigil-001".to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            drain_pause_ms: DEFAULT_DRAIN_PAUSE_MS,
            simulation: true,
            link_enabled: true,
            data_topic: "vigil/telemetry".to_string(),
            alert_topic: "vigil/alerts".to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl AgentConfig {
    /// Load a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, AgentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the agent cannot run with
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.device_id.is_empty() {
            return Err(AgentError::Config("device_id must not be empty".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(AgentError::Config("buffer_capacity must be > 0".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(AgentError::Config("tick_interval_ms must be > 0".into()));
        }
        if self.retry_interval_ms == 0 {
            return Err(AgentError::Config("retry_interval_ms must be > 0".into()));
        }
        for (name, bounds) in [
            ("temperature", self.thresholds.temperature),
            ("bpm", self.thresholds.bpm),
            ("humidity", self.thresholds.humidity),
        ] {
            if bounds.min >= bounds.max {
                return Err(AgentError::Config(format!(
                    "{name} bounds: min {} must be below max {}",
                    bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}
