//! Scriptable channel implementation for testing
//!
//! This provides an in-memory implementation of `Channel` whose connect,
//! probe and fetch outcomes can be flipped at runtime, so failover scenarios
//! can be exercised without any real transport.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use switchover::mock::{handles, MockChannel};
//! use switchover::ChannelManager;
//!
//! # async fn example() -> switchover::Result<()> {
//! let primary = Arc::new(MockChannel::new("A", 1).failing_connect());
//! let backup = Arc::new(MockChannel::new("B", 2));
//!
//! let manager = ChannelManager::with_defaults(handles(&[&primary, &backup]))?;
//! manager.init().await;
//! assert_eq!(manager.active_channel_id().as_deref(), Some("B"));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use switchover_channel_interface::{Channel, ChannelError, Response, Result};
use tokio::sync::Notify;

/// In-memory channel that serves `{"channel": <id>}` payloads
#[derive(Debug)]
pub struct MockChannel {
    id: String,
    priority: u32,

    connect_ok: AtomicBool,
    available: AtomicBool,
    fetch_ok: AtomicBool,
    failing_fetches: AtomicUsize,
    probe_errors: AtomicBool,

    connect_held: AtomicBool,
    checks_held: AtomicBool,
    release: Notify,

    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    check_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockChannel {
    /// A healthy channel: connects, reports available, serves data
    pub fn new(id: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            priority,
            connect_ok: AtomicBool::new(true),
            available: AtomicBool::new(true),
            fetch_ok: AtomicBool::new(true),
            failing_fetches: AtomicUsize::new(0),
            probe_errors: AtomicBool::new(false),
            connect_held: AtomicBool::new(false),
            checks_held: AtomicBool::new(false),
            release: Notify::new(),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// A channel that refuses connections and reports itself down
    pub fn failing_connect(self) -> Self {
        self.set_connect_ok(false);
        self.set_available(false);
        self
    }

    pub fn set_connect_ok(&self, ok: bool) {
        self.connect_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make probes fail with an error instead of answering
    pub fn set_probe_errors(&self, errors: bool) {
        self.probe_errors.store(errors, Ordering::SeqCst);
    }

    pub fn set_fetch_ok(&self, ok: bool) {
        self.fetch_ok.store(ok, Ordering::SeqCst);
    }

    /// Fail the next `n` fetches, then go back to the `fetch_ok` setting
    pub fn fail_next_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    /// Park every subsequent `connect` until [`MockChannel::release_connect`]
    pub fn hold_connect(&self) {
        self.connect_held.store(true, Ordering::SeqCst);
    }

    /// Let parked and future `connect` calls proceed
    pub fn release_connect(&self) {
        self.connect_held.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Park every subsequent `check_availability` until
    /// [`MockChannel::release_checks`]
    pub fn hold_checks(&self) {
        self.checks_held.store(true, Ordering::SeqCst);
    }

    pub fn release_checks(&self) {
        self.checks_held.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Payload this channel serves
    pub fn payload(&self) -> Value {
        json!({ "channel": self.id })
    }

    async fn wait_until_released(&self, held: &AtomicBool) {
        loop {
            // Registered before the check so a release in between is not lost
            let notified = self.release.notified();
            if !held.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Channel<Value> for MockChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_until_released(&self.connect_held).await;

        if self.connect_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChannelError::Connect(format!("{} refused connection", self.id)))
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn check_availability(&self) -> Result<bool> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_until_released(&self.checks_held).await;

        if self.probe_errors.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable(format!("{} probe timed out", self.id)));
        }
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn get_data(&self) -> Result<Response<Value>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let scripted_failure = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if scripted_failure || !self.fetch_ok.load(Ordering::SeqCst) {
            return Err(ChannelError::Fetch(format!("{} produced no data", self.id)));
        }
        Ok(Response::new(self.payload()))
    }
}

/// Type-erase mock channels into registry handles, keeping their order
pub fn handles(channels: &[&Arc<MockChannel>]) -> Vec<Arc<dyn Channel<Value>>> {
    channels
        .iter()
        .map(|channel| Arc::clone(channel) as Arc<dyn Channel<Value>>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthy_mock() {
        let channel = MockChannel::new("A", 1);

        assert!(channel.connect().await.is_ok());
        assert!(channel.check_availability().await.unwrap());

        let response = channel.get_data().await.unwrap();
        assert_eq!(response.data, json!({ "channel": "A" }));
        assert_eq!(channel.connect_calls(), 1);
        assert_eq!(channel.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_connect_mock() {
        let channel = MockChannel::new("A", 1).failing_connect();

        assert!(matches!(channel.connect().await, Err(ChannelError::Connect(_))));
        assert!(!channel.check_availability().await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_next_fetches() {
        let channel = MockChannel::new("A", 1);
        channel.fail_next_fetches(2);

        assert!(channel.get_data().await.is_err());
        assert!(channel.get_data().await.is_err());
        assert!(channel.get_data().await.is_ok());
        assert_eq!(channel.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_probe_errors() {
        let channel = MockChannel::new("A", 1);
        channel.set_probe_errors(true);
        assert!(matches!(
            channel.check_availability().await,
            Err(ChannelError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_hold_and_release_connect() {
        let channel = Arc::new(MockChannel::new("A", 1));
        channel.hold_connect();

        let pending = tokio::spawn({
            let channel = channel.clone();
            async move { channel.connect().await }
        });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        channel.release_connect();
        assert!(pending.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_hold_and_release_checks() {
        let channel = Arc::new(MockChannel::new("A", 1));
        channel.hold_checks();

        let pending = tokio::spawn({
            let channel = channel.clone();
            async move { channel.check_availability().await }
        });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        assert_eq!(channel.check_calls(), 1);

        // Releasing connects leaves held checks parked
        channel.release_connect();
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        channel.release_checks();
        assert!(pending.await.unwrap().unwrap());
    }
}
