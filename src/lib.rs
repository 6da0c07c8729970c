//! Vigil - single-node data-acquisition and telemetry agent
//!
//! Vigil samples an environmental sensor and an accelerometer once per
//! tick, derives heart rate from motion, classifies the sample against
//! fixed thresholds, and relays everything over a publish/subscribe
//! transport: acquisition → classification → dispatch.
//!
//! The resilience core is the offline buffer: a fixed-capacity ring that
//! absorbs samples while the transport is down and drains them oldest-first
//! once connectivity returns, always keeping the newest data when capacity
//! is exceeded.

pub mod acquisition;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod sensors;
pub mod transport;
pub mod types;

pub use config::{AgentConfig, Thresholds};
pub use dispatch::{CommandReply, StatusReport, TelemetryAgent, TickReport};
pub use error::AgentError;
pub use types::{Alert, Sample};

/// Agent version stamped into status reports
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Agent name used for client identities and logging
pub const AGENT_NAME: &str = "vigil";
