//! Sync/dispatch driver
//!
//! [`TelemetryAgent`] owns every pipeline stage and runs one level-triggered
//! tick at a time: maintain the link → acquire → classify → route the
//! sample (publish or enqueue) → publish any alert → opportunistically
//! drain the buffer. Connectivity is re-evaluated fresh on every tick;
//! reconnection timing belongs to the managed link, not to this driver.

use crate::acquisition::SignalAcquisition;
use crate::buffer::OfflineBuffer;
use crate::classifier::ThresholdClassifier;
use crate::config::AgentConfig;
use crate::console::{Command, HELP_TEXT};
use crate::encoder::WireEncoder;
use crate::error::AgentError;
use crate::sensors::{EnvironmentSensor, MotionSensor};
use crate::transport::{LinkState, ManagedLink, Transport};
use crate::types::{Alert, HrSource, LinkStatus, Sample};
use crate::AGENT_VERSION;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// How the tick's sample left the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Published,
    Buffered,
}

/// Observability record for one completed tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub sample: Sample,
    pub route: Route,
    /// Buffered samples published during the opportunistic drain
    pub drained: usize,
    pub alert: Option<Alert>,
    /// False when an alert was raised but the link was down (alerts are
    /// never buffered) or the publish itself failed
    pub alert_published: bool,
}

/// Snapshot returned by the operator `status` command
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub device_id: String,
    pub version: String,
    pub started_at_utc: DateTime<Utc>,
    pub uptime_ms: u64,
    pub ticks: u64,
    pub link: LinkState,
    pub buffered: usize,
    pub buffer_capacity: usize,
    pub bpm_mode: HrSource,
    pub manual_bpm: Option<u16>,
    pub last_sample: Option<Sample>,
}

/// Reply to one operator command
#[derive(Debug)]
pub enum CommandReply {
    Ack(String),
    Status(Box<StatusReport>),
    Help(&'static str),
}

/// The one acquisition/transport pipeline of the process.
///
/// Single logical thread of execution: a tick runs to completion before
/// the next begins, so no locking is needed anywhere in the pipeline.
pub struct TelemetryAgent {
    config: AgentConfig,
    acquisition: SignalAcquisition,
    classifier: ThresholdClassifier,
    buffer: OfflineBuffer,
    link: ManagedLink,
    encoder: WireEncoder,
    started_at: DateTime<Utc>,
    ticks: u64,
    last_sample: Option<Sample>,
}

impl TelemetryAgent {
    pub fn new(
        config: AgentConfig,
        env: Box<dyn EnvironmentSensor>,
        motion: Box<dyn MotionSensor>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            acquisition: SignalAcquisition::new(env, motion, config.simulation),
            classifier: ThresholdClassifier::new(config.thresholds),
            buffer: OfflineBuffer::new(config.buffer_capacity),
            link: ManagedLink::new(transport, config.retry_interval_ms, config.link_enabled),
            encoder: WireEncoder::new(),
            started_at: Utc::now(),
            ticks: 0,
            last_sample: None,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Run one dispatch tick. `now_ms` is monotonic milliseconds since
    /// agent start, supplied by the external scheduler.
    pub fn tick(&mut self, now_ms: u64) -> Result<TickReport, AgentError> {
        self.ticks += 1;
        let connected = self.link.maintain(now_ms);

        let sample = self.acquisition.sample(
            now_ms,
            LinkStatus::from_connected(connected),
            &self.config.device_id,
        );
        let alert = self.classifier.classify(&sample);
        let payload = self.encoder.encode_sample(&sample)?;

        // Publish directly when connected; a failed direct publish marks
        // the link down and the sample is enqueued instead of lost.
        let route = if connected && self.link.publish(&self.config.data_topic, &payload) {
            Route::Published
        } else {
            self.buffer.enqueue(payload);
            Route::Buffered
        };

        // Alerts go out only if the link was up at classification time,
        // and are dropped otherwise.
        let mut alert_published = false;
        if let Some(alert) = &alert {
            if connected {
                let alert_payload = self.encoder.encode_alert(alert)?;
                alert_published = self.link.publish(&self.config.alert_topic, &alert_payload);
            } else {
                debug!("alert {} suppressed while offline", alert.kind);
            }
        }

        let drained = if self.link.is_connected() && !self.buffer.is_empty() {
            self.drain()
        } else {
            0
        };

        self.last_sample = Some(sample.clone());
        Ok(TickReport {
            sample,
            route,
            drained,
            alert,
            alert_published,
        })
    }

    /// Publish buffered samples oldest-first until the buffer empties or
    /// a publish fails, pausing briefly between entries so a long drain
    /// does not overwhelm the transport.
    fn drain(&mut self) -> usize {
        let pause = Duration::from_millis(self.config.drain_pause_ms);
        let link = &mut self.link;
        let topic = self.config.data_topic.as_str();

        let published = self.buffer.drain_while(|entry| {
            let ok = link.publish(topic, entry);
            if ok && !pause.is_zero() {
                thread::sleep(pause);
            }
            ok
        });

        if published > 0 {
            info!(
                "drained {published} buffered samples, {} remaining",
                self.buffer.len()
            );
        }
        published
    }

    /// Apply one operator command between ticks
    pub fn handle_command(&mut self, command: Command, now_ms: u64) -> CommandReply {
        match command {
            Command::SetBpm(bpm) => {
                self.acquisition.set_manual_bpm(bpm);
                info!("manual bpm override set to {bpm}");
                CommandReply::Ack(format!("manual bpm set to {bpm}"))
            }
            Command::Auto => {
                self.acquisition.clear_manual_bpm();
                info!("manual bpm override cleared");
                CommandReply::Ack("bpm derivation restored".to_string())
            }
            Command::WifiOn => {
                self.link.set_enabled(true);
                CommandReply::Ack("link enabled".to_string())
            }
            Command::WifiOff => {
                self.link.set_enabled(false);
                CommandReply::Ack("link disabled".to_string())
            }
            Command::Status => CommandReply::Status(Box::new(self.status(now_ms))),
            Command::Help => CommandReply::Help(HELP_TEXT),
        }
    }

    pub fn status(&self, now_ms: u64) -> StatusReport {
        StatusReport {
            device_id: self.config.device_id.clone(),
            version: AGENT_VERSION.to_string(),
            started_at_utc: self.started_at,
            uptime_ms: now_ms,
            ticks: self.ticks,
            link: self.link.state(),
            buffered: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            bpm_mode: if self.acquisition.manual_bpm().is_some() {
                HrSource::Manual
            } else {
                HrSource::Auto
            },
            manual_bpm: self.acquisition.manual_bpm(),
            last_sample: self.last_sample.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{FixedEnvironment, MotionReading, PatternMotion};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Shared {
        connect_results: VecDeque<bool>,
        publish_results: VecDeque<bool>,
        published: Vec<(String, String)>,
    }

    struct TestTransport(Rc<RefCell<Shared>>);

    impl Transport for TestTransport {
        fn connect(&mut self, _client_id: &str) -> bool {
            self.0.borrow_mut().connect_results.pop_front().unwrap_or(true)
        }

        fn publish(&mut self, topic: &str, payload: &str) -> bool {
            let mut shared = self.0.borrow_mut();
            let ok = shared.publish_results.pop_front().unwrap_or(true);
            if ok {
                shared.published.push((topic.to_string(), payload.to_string()));
            }
            ok
        }

        fn disconnect(&mut self) {}
    }

    fn test_config(link_enabled: bool) -> AgentConfig {
        AgentConfig {
            simulation: false,
            link_enabled,
            buffer_capacity: 5,
            drain_pause_ms: 0,
            retry_interval_ms: 1_000,
            ..AgentConfig::default()
        }
    }

    fn make_agent(config: AgentConfig) -> (TelemetryAgent, Rc<RefCell<Shared>>) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        let agent = TelemetryAgent::new(
            config,
            Box::new(FixedEnvironment::new(36.5, 45.0)),
            Box::new(PatternMotion::new(vec![MotionReading::at_rest()])),
            Box::new(TestTransport(shared.clone())),
        )
        .unwrap();
        (agent, shared)
    }

    fn data_payloads(shared: &Rc<RefCell<Shared>>) -> Vec<String> {
        shared
            .borrow()
            .published
            .iter()
            .filter(|(topic, _)| topic == "vigil/telemetry")
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    #[test]
    fn test_connected_tick_publishes_directly() {
        let (mut agent, shared) = make_agent(test_config(true));

        let report = agent.tick(1_000).unwrap();

        assert_eq!(report.route, Route::Published);
        assert_eq!(report.drained, 0);
        assert_eq!(agent.buffered(), 0);
        assert_eq!(report.sample.status, LinkStatus::Online);

        let payloads = data_payloads(&shared);
        assert_eq!(payloads.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(value["timestamp"], 1_000);
    }

    #[test]
    fn test_offline_tick_buffers() {
        let (mut agent, shared) = make_agent(test_config(false));

        for k in 1..=3u64 {
            let report = agent.tick(k * 1_000).unwrap();
            assert_eq!(report.route, Route::Buffered);
            assert_eq!(report.sample.status, LinkStatus::Offline);
        }

        assert_eq!(agent.buffered(), 3);
        assert!(shared.borrow().published.is_empty());
    }

    #[test]
    fn test_recovery_publishes_live_sample_then_drains_fifo() {
        let (mut agent, shared) = make_agent(test_config(false));

        agent.tick(1_000).unwrap();
        agent.tick(2_000).unwrap();
        agent.tick(3_000).unwrap();

        agent.handle_command(Command::WifiOn, 3_500);
        let report = agent.tick(4_000).unwrap();

        assert_eq!(report.route, Route::Published);
        assert_eq!(report.drained, 3);
        assert_eq!(agent.buffered(), 0);

        let timestamps: Vec<u64> = data_payloads(&shared)
            .iter()
            .map(|payload| {
                let value: serde_json::Value = serde_json::from_str(payload).unwrap();
                value["timestamp"].as_u64().unwrap()
            })
            .collect();
        // live sample goes out first, then the backlog oldest-first
        assert_eq!(timestamps, vec![4_000, 1_000, 2_000, 3_000]);
    }

    #[test]
    fn test_publish_failure_mid_drain_preserves_backlog() {
        let (mut agent, shared) = make_agent(test_config(false));

        for k in 1..=4u64 {
            agent.tick(k * 1_000).unwrap();
        }
        agent.handle_command(Command::WifiOn, 4_500);

        // live sample ok, first two drained ok, third drain publish fails
        shared
            .borrow_mut()
            .publish_results
            .extend([true, true, true, false]);

        let report = agent.tick(5_000).unwrap();
        assert_eq!(report.route, Route::Published);
        assert_eq!(report.drained, 2);
        assert_eq!(agent.buffered(), 2);
        assert_eq!(agent.link_state(), LinkState::Disconnected);

        // next tick: link reconnects after the retry interval and the
        // remainder drains in order
        let report = agent.tick(6_000).unwrap();
        assert_eq!(report.drained, 2);
        assert_eq!(agent.buffered(), 0);

        let timestamps: Vec<u64> = data_payloads(&shared)
            .iter()
            .map(|payload| {
                let value: serde_json::Value = serde_json::from_str(payload).unwrap();
                value["timestamp"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(timestamps, vec![5_000, 1_000, 2_000, 6_000, 3_000, 4_000]);
    }

    #[test]
    fn test_direct_publish_failure_enqueues_sample() {
        let (mut agent, shared) = make_agent(test_config(true));
        shared.borrow_mut().publish_results.push_back(false);

        let report = agent.tick(1_000).unwrap();

        assert_eq!(report.route, Route::Buffered);
        assert_eq!(agent.buffered(), 1);
        assert_eq!(agent.link_state(), LinkState::Disconnected);
    }

    #[test]
    fn test_alert_published_when_connected() {
        let (mut agent, shared) = make_agent(test_config(true));
        agent.handle_command(Command::SetBpm(130), 0);

        let report = agent.tick(1_000).unwrap();

        let alert = report.alert.expect("bpm=130 must breach");
        assert_eq!(alert.kind, "bpm_high");
        assert!(report.alert_published);

        let alerts: Vec<String> = shared
            .borrow()
            .published
            .iter()
            .filter(|(topic, _)| topic == "vigil/alerts")
            .map(|(_, payload)| payload.clone())
            .collect();
        assert_eq!(alerts.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&alerts[0]).unwrap();
        assert_eq!(value["type"], "bpm_high");
        assert_eq!(value["bpm"], 130);
    }

    #[test]
    fn test_alert_dropped_while_offline() {
        let (mut agent, shared) = make_agent(test_config(false));
        agent.handle_command(Command::SetBpm(130), 0);

        let report = agent.tick(1_000).unwrap();

        assert!(report.alert.is_some());
        assert!(!report.alert_published);
        // the sample is buffered; the alert is gone for good
        assert_eq!(agent.buffered(), 1);
        assert!(shared.borrow().published.is_empty());

        agent.handle_command(Command::WifiOn, 1_500);
        agent.tick(2_000).unwrap();
        let alerts = shared
            .borrow()
            .published
            .iter()
            .filter(|(topic, _)| topic == "vigil/alerts")
            .count();
        assert_eq!(alerts, 1, "only the tick-2 alert, nothing replayed");
    }

    #[test]
    fn test_buffer_overflow_keeps_newest_across_outage() {
        let mut config = test_config(false);
        config.buffer_capacity = 3;
        let (mut agent, _shared) = make_agent(config);

        for k in 1..=5u64 {
            agent.tick(k * 1_000).unwrap();
        }
        assert_eq!(agent.buffered(), 3);
    }

    #[test]
    fn test_status_report() {
        let (mut agent, _shared) = make_agent(test_config(true));
        agent.tick(1_000).unwrap();
        agent.handle_command(Command::SetBpm(75), 1_200);

        let status = agent.status(2_000);
        assert_eq!(status.device_id, "vigil-001");
        assert_eq!(status.ticks, 1);
        assert_eq!(status.uptime_ms, 2_000);
        assert_eq!(status.link, LinkState::Connected);
        assert_eq!(status.buffered, 0);
        assert_eq!(status.buffer_capacity, 5);
        assert_eq!(status.bpm_mode, HrSource::Manual);
        assert_eq!(status.manual_bpm, Some(75));
        assert_eq!(status.last_sample.unwrap().timestamp, 1_000);
    }

    #[test]
    fn test_command_replies() {
        let (mut agent, _shared) = make_agent(test_config(true));

        match agent.handle_command(Command::SetBpm(90), 0) {
            CommandReply::Ack(message) => assert!(message.contains("90")),
            other => panic!("unexpected reply: {other:?}"),
        }
        match agent.handle_command(Command::Help, 0) {
            CommandReply::Help(text) => assert!(text.contains("wifi on")),
            other => panic!("unexpected reply: {other:?}"),
        }
        match agent.handle_command(Command::Status, 0) {
            CommandReply::Status(status) => assert_eq!(status.bpm_mode, HrSource::Manual),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config(true);
        config.buffer_capacity = 0;
        let shared = Rc::new(RefCell::new(Shared::default()));
        let result = TelemetryAgent::new(
            config,
            Box::new(FixedEnvironment::new(36.5, 45.0)),
            Box::new(PatternMotion::new(vec![])),
            Box::new(TestTransport(shared)),
        );
        assert!(result.is_err());
    }
}
