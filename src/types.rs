//! Core types for the Vigil telemetry pipeline
//!
//! This module defines the data that flows through each stage of a tick:
//! the immutable [`Sample`] snapshot produced by acquisition and the
//! optional [`Alert`] record derived from it by the classifier.

use serde::{Deserialize, Serialize};

/// Transport connectivity observed at the moment a sample was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Online,
    Offline,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Online => "online",
            LinkStatus::Offline => "offline",
        }
    }

    /// Map the dispatch driver's connectivity boolean onto the wire tag
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            LinkStatus::Online
        } else {
            LinkStatus::Offline
        }
    }
}

/// Provenance of the heart-rate value in a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HrSource {
    Manual,
    Auto,
}

impl HrSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HrSource::Manual => "manual",
            HrSource::Auto => "auto",
        }
    }
}

/// Alert severity. `Critical` dominates `Warning` when channels combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Immutable snapshot of one sampling tick.
///
/// Produced once per tick by acquisition and moved by value through
/// classifier and dispatch; whichever stage holds it owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic milliseconds since agent start
    pub timestamp: u64,
    /// Temperature in °C, one decimal
    pub temperature: f64,
    /// Relative humidity in %, one decimal
    pub humidity: f64,
    /// Heart rate in beats per minute
    pub bpm: u16,
    /// Motion intensity in g, two decimals
    pub movement: f64,
    /// Device identifier
    pub device_id: String,
    /// Connectivity at capture time
    pub status: LinkStatus,
    /// Heart-rate source tag
    pub bpm_mode: HrSource,
}

/// Threshold-breach record derived from at most one sample.
///
/// Constructed, dispatched to the transport if connected, then discarded.
/// Alerts are never buffered offline: one raised while the link is down
/// is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: u64,
    pub device_id: String,
    /// Underscore-joined composite tag, e.g. `bpm_high_humidity_high`
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description, pipe-joined on multiple triggers
    pub message: String,
    pub severity: Severity,
    pub temperature: f64,
    pub humidity: f64,
    pub bpm: u16,
    pub movement: f64,
}

/// Round to one decimal place (temperature, humidity)
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places (motion intensity)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
