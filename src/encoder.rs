//! Wire encoding
//!
//! Serializes samples and alerts into the JSON objects carried on the data
//! and alert topics. Field layout is fixed by the wire schema; see the
//! derives on [`Sample`] and [`Alert`].

use crate::error::AgentError;
use crate::types::{Alert, Sample};

/// JSON encoder for the two transport channels
pub struct WireEncoder;

impl WireEncoder {
    pub fn new() -> Self {
        Self
    }

    /// One JSON object per sample, for the data topic
    pub fn encode_sample(&self, sample: &Sample) -> Result<String, AgentError> {
        serde_json::to_string(sample).map_err(AgentError::Encode)
    }

    /// One JSON object per alert, for the alert topic
    pub fn encode_alert(&self, alert: &Alert) -> Result<String, AgentError> {
        serde_json::to_string(alert).map_err(AgentError::Encode)
    }
}

impl Default for WireEncoder {
    fn default() -> Self {
        Self::new()
    }
}
