//! Threshold classification
//!
//! Evaluates one sample against the static per-channel bounds and folds
//! any breaches into a single composite [`Alert`]. Channels are checked in
//! fixed order: temperature, heart rate, humidity.

use crate::config::Thresholds;
use crate::types::{Alert, Sample, Severity};

/// One threshold breach on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    TempHigh,
    TempLow,
    BpmHigh,
    BpmLow,
    HumidityHigh,
}

impl Trigger {
    fn tag(&self) -> &'static str {
        match self {
            Trigger::TempHigh => "temp_high",
            Trigger::TempLow => "temp_low",
            Trigger::BpmHigh => "bpm_high",
            Trigger::BpmLow => "bpm_low",
            Trigger::HumidityHigh => "humidity_high",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            Trigger::HumidityHigh => Severity::Warning,
            _ => Severity::Critical,
        }
    }
}

/// Stateless classifier over a fixed threshold set
pub struct ThresholdClassifier {
    thresholds: Thresholds,
}

impl ThresholdClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Zero or one alert per sample. No breach, no side effect.
    pub fn classify(&self, sample: &Sample) -> Option<Alert> {
        let mut triggers: Vec<(Trigger, String)> = Vec::new();

        let temp = self.thresholds.temperature;
        if sample.temperature > temp.max {
            triggers.push((
                Trigger::TempHigh,
                format!(
                    "Temperature {:.1}C above limit {:.1}C",
                    sample.temperature, temp.max
                ),
            ));
        } else if sample.temperature < temp.min {
            triggers.push((
                Trigger::TempLow,
                format!(
                    "Temperature {:.1}C below limit {:.1}C",
                    sample.temperature, temp.min
                ),
            ));
        }

        let bpm = self.thresholds.bpm;
        if f64::from(sample.bpm) > bpm.max {
            triggers.push((
                Trigger::BpmHigh,
                format!("BPM {} above limit {}", sample.bpm, bpm.max),
            ));
        } else if f64::from(sample.bpm) < bpm.min {
            triggers.push((
                Trigger::BpmLow,
                format!("BPM {} below limit {}", sample.bpm, bpm.min),
            ));
        }

        // Only the high edge of humidity carries an alert tag
        let humidity = self.thresholds.humidity;
        if sample.humidity > humidity.max {
            triggers.push((
                Trigger::HumidityHigh,
                format!(
                    "Humidity {:.1}% above limit {:.1}%",
                    sample.humidity, humidity.max
                ),
            ));
        }

        if triggers.is_empty() {
            return None;
        }

        let severity = triggers
            .iter()
            .map(|(trigger, _)| trigger.severity())
            .max()
            .unwrap_or(Severity::Warning);

        let kind = triggers
            .iter()
            .map(|(trigger, _)| trigger.tag())
            .collect::<Vec<_>>()
            .join("_");

        let message = triggers
            .iter()
            .map(|(_, message)| message.as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        Some(Alert {
            timestamp: sample.timestamp,
            device_id: sample.device_id.clone(),
            kind,
            message,
            severity,
            temperature: sample.temperature,
            humidity: sample.humidity,
            bpm: sample.bpm,
            movement: sample.movement,
        })
    }
}
