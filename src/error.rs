//! Error types for the Vigil agent
//!
//! Only the fallible edges of the pipeline surface errors: JSON encoding
//! and configuration validation. Sensor faults and transport failures are
//! ordinary states handled in-band, never errors — the data plane has no
//! fatal path.

use thiserror::Error;

/// Errors that can occur while building or running the agent
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
