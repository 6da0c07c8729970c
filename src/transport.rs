//! Transport session and link management
//!
//! The network session is an external collaborator behind the [`Transport`]
//! trait: connect, publish, disconnect, each reporting plain success or
//! failure. [`ManagedLink`] wraps a transport and owns the connectivity
//! state machine and reconnection pacing; the dispatch driver consumes only
//! the `is_connected` boolean.

use crate::AGENT_NAME;
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

/// Publish/subscribe session primitive. Implementations own their own
/// timeouts; every call here is blocking-style and bounded by them.
pub trait Transport {
    fn connect(&mut self, client_id: &str) -> bool;
    fn publish(&mut self, topic: &str, payload: &str) -> bool;
    fn disconnect(&mut self);
}

/// Connectivity state machine:
/// `Disabled → Connecting → Connected → Disconnected → Connecting…`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disabled,
    Connecting,
    Connected,
    Disconnected,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disabled => "disabled",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Disconnected => "disconnected",
        }
    }
}

/// Transport wrapper owning enablement, reconnection timing and a unique
/// client identity
pub struct ManagedLink {
    transport: Box<dyn Transport>,
    state: LinkState,
    retry_interval_ms: u64,
    last_attempt_ms: Option<u64>,
    client_id: String,
}

impl ManagedLink {
    pub fn new(transport: Box<dyn Transport>, retry_interval_ms: u64, enabled: bool) -> Self {
        Self {
            transport,
            state: if enabled {
                LinkState::Connecting
            } else {
                LinkState::Disabled
            },
            retry_interval_ms,
            last_attempt_ms: None,
            client_id: format!("{AGENT_NAME}-{}", Uuid::new_v4()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// `wifi on` / `wifi off`. Enabling re-arms an immediate connect
    /// attempt; disabling drops any open session.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.state == LinkState::Disabled {
                info!("link enabled");
                self.state = LinkState::Connecting;
                self.last_attempt_ms = None;
            }
        } else if self.state != LinkState::Disabled {
            if self.state == LinkState::Connected {
                self.transport.disconnect();
            }
            info!("link disabled");
            self.state = LinkState::Disabled;
        }
    }

    /// Called once per tick. Attempts at most one (re)connect per retry
    /// interval. Returns the post-maintenance connectivity.
    pub fn maintain(&mut self, now_ms: u64) -> bool {
        if matches!(self.state, LinkState::Connecting | LinkState::Disconnected)
            && self.retry_due(now_ms)
        {
            self.last_attempt_ms = Some(now_ms);
            if self.transport.connect(&self.client_id) {
                info!("link connected as {}", self.client_id);
                self.state = LinkState::Connected;
            } else {
                debug!(
                    "connect attempt failed, next retry in {} ms",
                    self.retry_interval_ms
                );
                self.state = LinkState::Connecting;
            }
        }
        self.is_connected()
    }

    fn retry_due(&self, now_ms: u64) -> bool {
        match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.retry_interval_ms,
        }
    }

    /// Publish on an open session. A transport failure marks the link
    /// disconnected; the next `maintain` re-enters the connect cycle.
    pub fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if self.state != LinkState::Connected {
            return false;
        }
        if self.transport.publish(topic, payload) {
            true
        } else {
            warn!("publish on {topic} failed, link marked disconnected");
            self.state = LinkState::Disconnected;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Shared {
        connect_attempts: usize,
        connect_results: VecDeque<bool>,
        publish_results: VecDeque<bool>,
        published: Vec<(String, String)>,
        disconnects: usize,
    }

    struct TestTransport(Rc<RefCell<Shared>>);

    impl Transport for TestTransport {
        fn connect(&mut self, _client_id: &str) -> bool {
            let mut shared = self.0.borrow_mut();
            shared.connect_attempts += 1;
            shared.connect_results.pop_front().unwrap_or(true)
        }

        fn publish(&mut self, topic: &str, payload: &str) -> bool {
            let mut shared = self.0.borrow_mut();
            let ok = shared.publish_results.pop_front().unwrap_or(true);
            if ok {
                shared.published.push((topic.to_string(), payload.to_string()));
            }
            ok
        }

        fn disconnect(&mut self) {
            self.0.borrow_mut().disconnects += 1;
        }
    }

    fn make_link(enabled: bool) -> (ManagedLink, Rc<RefCell<Shared>>) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        let link = ManagedLink::new(Box::new(TestTransport(shared.clone())), 5_000, enabled);
        (link, shared)
    }

    #[test]
    fn test_disabled_link_never_connects() {
        let (mut link, shared) = make_link(false);
        assert_eq!(link.state(), LinkState::Disabled);
        assert!(!link.maintain(1_000));
        assert_eq!(shared.borrow().connect_attempts, 0);
    }

    #[test]
    fn test_enabled_link_connects_on_first_maintain() {
        let (mut link, shared) = make_link(true);
        assert_eq!(link.state(), LinkState::Connecting);
        assert!(link.maintain(0));
        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(shared.borrow().connect_attempts, 1);
    }

    #[test]
    fn test_retry_paced_by_interval() {
        let (mut link, shared) = make_link(true);
        shared
            .borrow_mut()
            .connect_results
            .extend([false, false, true]);

        assert!(!link.maintain(0));
        assert!(!link.maintain(1_000)); // too early, no attempt
        assert_eq!(shared.borrow().connect_attempts, 1);

        assert!(!link.maintain(5_000));
        assert_eq!(shared.borrow().connect_attempts, 2);

        assert!(link.maintain(10_000));
        assert_eq!(shared.borrow().connect_attempts, 3);
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[test]
    fn test_publish_failure_marks_disconnected() {
        let (mut link, shared) = make_link(true);
        link.maintain(0);
        shared.borrow_mut().publish_results.push_back(false);

        assert!(!link.publish("vigil/telemetry", "{}"));
        assert_eq!(link.state(), LinkState::Disconnected);

        // back through Connecting once the retry interval elapses
        assert!(link.maintain(5_000));
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[test]
    fn test_publish_while_not_connected_fails_cleanly() {
        let (mut link, shared) = make_link(false);
        assert!(!link.publish("vigil/telemetry", "{}"));
        assert!(shared.borrow().published.is_empty());
    }

    #[test]
    fn test_disable_drops_open_session() {
        let (mut link, shared) = make_link(true);
        link.maintain(0);
        link.set_enabled(false);

        assert_eq!(link.state(), LinkState::Disabled);
        assert_eq!(shared.borrow().disconnects, 1);
        assert!(!link.maintain(10_000));
    }

    #[test]
    fn test_re_enable_rearms_immediate_attempt() {
        let (mut link, shared) = make_link(true);
        link.maintain(0);
        link.set_enabled(false);
        link.set_enabled(true);

        // no interval wait after an explicit enable
        assert!(link.maintain(100));
        assert_eq!(shared.borrow().connect_attempts, 2);
    }

    #[test]
    fn test_client_id_is_unique_per_link() {
        let (a, _) = make_link(false);
        let (b, _) = make_link(false);
        assert_ne!(a.client_id(), b.client_id());
        assert!(a.client_id().starts_with("vigil-"));
    }
}
