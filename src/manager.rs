//! ChannelManager: priority-ranked failover with a last-known-good fallback
//!
//! # The Switchover Pattern
//!
//! The manager keeps exactly one channel active, watches it, and replaces it
//! with the next best candidate as soon as it degrades. Readers are always
//! answered: with fresh data when some channel can produce it, with the last
//! buffered response otherwise.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────── Channel Registry ◄──────────────┐
//!                  │            (status write path)              │
//!                  ▼                                             │
//! Selector ──► Supervisor::connect ──► active channel ──► Active watch
//!                  ▲                        │              (every 5s)
//!                  │                        ▼                    │
//! get_data ────────┴──── fetch ──► Response Buffer        fails? │
//!    │                                                           │
//!    └── no fresh data? ──► last known good          failover ◄──┘
//!
//! Sweep (every 10s): Unavailable ──probe──► Idle (eligible again)
//! ```
//!
//! ## Guarantees
//!
//! - **One active channel**: at most one channel is `Connected`, and it is the
//!   active one
//! - **Bounded reads**: `get_data` makes at most one reconnect-and-retry cycle
//! - **No surprises**: channel failures become status changes and log lines,
//!   never errors returned to readers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchover::mock::{handles, MockChannel};
//! use switchover::{ChannelManager, DataPriority, ManagerConfig};
//!
//! #[tokio::main]
//! async fn main() -> switchover::Result<()> {
//!     let fiber = Arc::new(MockChannel::new("fiber", 1));
//!     let lte = Arc::new(MockChannel::new("lte", 2));
//!
//!     let manager = ChannelManager::new(handles(&[&fiber, &lte]), ManagerConfig::default())?;
//!     manager.init().await;
//!
//!     if let Some(response) = manager.get_data(DataPriority::Low).await {
//!         println!("{} at {}", response.data, response.timestamp);
//!     }
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::monitor::{self, SweepReport, Watch, WatchOutcome};
use crate::Payload;
use parking_lot::Mutex;
use std::sync::Arc;
use switchover_channel_interface::{Channel, Response};
use switchover_core_resilience::{
    ChannelRegistry, ChannelSnapshot, ChannelStatus, FailureKind, ResilienceError, ResponseBuffer,
};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reconnect-and-retry cycles a single read may spend after a failure
const MAX_RECONNECT_CYCLES: usize = 1;

/// Caller's hint about how much a read matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataPriority {
    /// Worth waiting `high_priority_grace_ms` before giving up on the active channel
    High,
    #[default]
    Low,
}

/// The channel currently serving reads, plus its liveness watch
pub(crate) struct ActiveChannel {
    pub(crate) index: usize,
    watch: Option<Watch>,
}

impl ActiveChannel {
    /// Stop the watch at its next await point (safe from inside the watch)
    fn cancel_watch(&self) {
        if let Some(watch) = &self.watch {
            watch.cancel();
        }
    }

    /// Stop the watch immediately (never from inside the watch itself)
    pub(crate) fn abort_watch(self) {
        if let Some(watch) = self.watch {
            watch.abort();
        }
    }
}

struct Lifecycle {
    running: bool,
    shutdown: CancellationToken,
    sweep: Option<JoinHandle<()>>,
}

/// State shared between the manager handle and its background tasks
pub(crate) struct Inner<T> {
    pub(crate) registry: ChannelRegistry<T>,
    pub(crate) buffer: ResponseBuffer<T>,
    pub(crate) config: ManagerConfig,
    /// Single-flight gate: one permit, taken with `try_acquire`
    pub(crate) connect_gate: Semaphore,
    active: Mutex<Option<ActiveChannel>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<T: Payload> Inner<T> {
    pub(crate) fn active_index(&self) -> Option<usize> {
        self.active.lock().as_ref().map(|active| active.index)
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.lifecycle.lock().shutdown.clone()
    }

    /// Make the channel at `index` the active one and start watching it
    pub(crate) fn promote(self: &Arc<Self>, index: usize) {
        let shutdown = self.shutdown_token();

        {
            let mut slot = self.active.lock();

            if let Some(previous) = slot.take() {
                if previous.index != index {
                    self.registry
                        .transition(previous.index, ChannelStatus::Connected, ChannelStatus::Idle);
                }
                previous.abort_watch();
            }

            self.registry.set_status(index, ChannelStatus::Connected);

            let connected = self.registry.connected();
            if connected != [index] {
                error!(
                    connected = ?connected,
                    active = index,
                    "More than one channel marked connected"
                );
            }
            debug_assert_eq!(connected, vec![index]);

            let watch = if shutdown.is_cancelled() {
                None
            } else {
                Some(monitor::spawn_watch(Arc::clone(self), index, &shutdown))
            };
            *slot = Some(ActiveChannel { index, watch });
        }

        if let Some(channel) = self.registry.channel(index) {
            info!(
                channel = channel.id(),
                priority = channel.priority(),
                "Channel connected and active"
            );
        }
    }

    /// Drop the channel at `index` from active duty after a failure
    ///
    /// Cancels its watch, marks it `Unavailable` and clears the active
    /// reference, all in one critical section. Returns `None` when the channel
    /// is no longer the active one (someone else already handled it).
    pub(crate) fn demote(&self, index: usize, kind: FailureKind) -> Option<ActiveChannel> {
        debug_assert!(kind.triggers_failover(), "{kind} does not retire a channel");

        let mut slot = self.active.lock();
        if slot.as_ref().map(|active| active.index) != Some(index) {
            return None;
        }

        let retired = slot.take()?;
        retired.cancel_watch();
        self.registry.set_status(
            index,
            kind.status_after().unwrap_or(ChannelStatus::Unavailable),
        );

        debug!(
            channel = self.registry.id(index).unwrap_or_default(),
            kind = %kind,
            "Active channel dropped"
        );
        Some(retired)
    }

    /// Start a watch for an active channel that lost its watch while stopped
    fn ensure_watch(self: &Arc<Self>, shutdown: &CancellationToken) {
        let mut slot = self.active.lock();
        if let Some(active) = slot.as_mut() {
            if active.watch.is_none() && !shutdown.is_cancelled() {
                active.watch = Some(monitor::spawn_watch(Arc::clone(self), active.index, shutdown));
            }
        }
    }

    /// Fetch from the channel at `index`, buffering on success
    ///
    /// On failure the channel is demoted (after the grace period for
    /// high-priority reads) and `None` is returned.
    async fn fetch(&self, index: usize, priority: DataPriority) -> Option<Response<T>> {
        let channel = self.registry.channel(index)?.clone();

        match channel.get_data().await {
            Ok(response) => {
                self.buffer.store(response.clone());
                debug!(channel = channel.id(), "Fresh data fetched");
                Some(response)
            }
            Err(e) => {
                warn!(
                    channel = channel.id(),
                    kind = %FailureKind::FetchFailure,
                    error = %e,
                    "Active channel failed to produce data"
                );

                if priority == DataPriority::High {
                    if let Some(grace) = self.config.high_priority_grace() {
                        debug!(
                            channel = channel.id(),
                            grace_ms = grace.as_millis() as u64,
                            "High-priority read, delaying failover"
                        );
                        tokio::time::sleep(grace).await;
                    }
                }

                if let Some(retired) = self.demote(index, FailureKind::FetchFailure) {
                    retired.abort_watch();
                }
                None
            }
        }
    }

    /// Mark the manager running; `None` if it already was
    fn begin_run(&self) -> Option<CancellationToken> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.running {
            return None;
        }

        lifecycle.running = true;
        if lifecycle.shutdown.is_cancelled() {
            lifecycle.shutdown = CancellationToken::new();
        }
        Some(lifecycle.shutdown.clone())
    }

    fn start_sweep(self: &Arc<Self>, shutdown: &CancellationToken) {
        if shutdown.is_cancelled() {
            return;
        }

        let handle = monitor::spawn_sweep(Arc::clone(self), shutdown);
        let mut lifecycle = self.lifecycle.lock();
        if let Some(previous) = lifecycle.sweep.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel every background task, returning their aborted handles
    fn cancel_background(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.running = false;
            lifecycle.shutdown.cancel();
            handles.extend(lifecycle.sweep.take());
        }

        {
            let mut slot = self.active.lock();
            if let Some(active) = slot.as_mut() {
                handles.extend(active.watch.take().map(Watch::into_handle));
            }
        }

        for handle in &handles {
            handle.abort();
        }
        handles
    }
}

/// Priority-ranked channel failover manager
///
/// Construct it with the caller's channels, call [`ChannelManager::init`] to
/// connect and start the recovery sweep, read with
/// [`ChannelManager::get_data`], and [`ChannelManager::stop`] (or drop it) to
/// cancel the background tasks.
pub struct ChannelManager<T: Payload> {
    inner: Arc<Inner<T>>,
}

impl<T: Payload> ChannelManager<T> {
    /// Create a manager over `channels`, in registration order
    ///
    /// Nothing is connected and no task is started until [`init`](Self::init)
    /// or the first read.
    ///
    /// # Errors
    ///
    /// Fails on an empty channel list or an invalid configuration.
    pub fn new(channels: Vec<Arc<dyn Channel<T>>>, config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        let registry = ChannelRegistry::new(channels)?;

        let inner = Inner {
            registry,
            buffer: ResponseBuffer::new(),
            config,
            connect_gate: Semaphore::new(1),
            active: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle {
                running: false,
                shutdown: CancellationToken::new(),
                sweep: None,
            }),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Create a manager with default configuration
    pub fn with_defaults(channels: Vec<Arc<dyn Channel<T>>>) -> Result<Self> {
        Self::new(channels, ManagerConfig::default())
    }

    /// Connect to the best channel and start the recovery sweep
    ///
    /// Idempotent while running. Returns whether a channel is active afterwards.
    pub async fn init(&self) -> bool {
        let Some(shutdown) = self.inner.begin_run() else {
            debug!("Channel manager already running");
            return self.inner.active_index().is_some();
        };

        info!(
            channels = self.inner.registry.len(),
            watch_interval_ms = self.inner.config.active_watch_interval_ms,
            sweep_interval_ms = self.inner.config.sweep_interval_ms,
            "Channel manager starting"
        );

        if self.inner.active_index().is_some() {
            self.inner.ensure_watch(&shutdown);
        } else {
            self.inner.connect().await;
        }

        self.inner.start_sweep(&shutdown);
        self.inner.active_index().is_some()
    }

    /// Run one connection attempt over the current candidates
    ///
    /// Returns `false` immediately when another attempt is in flight, and
    /// `false` after trying every candidate when none connects.
    pub async fn connect(&self) -> bool {
        self.inner.connect().await
    }

    /// Read from the active channel, failing over once if needed
    ///
    /// 1. With no active channel, connect first.
    /// 2. Fetch from the active channel; success is buffered and returned.
    /// 3. On failure, run one reconnect cycle and fetch once more.
    /// 4. Otherwise return the last buffered response, or `None` if no fetch
    ///    ever succeeded.
    pub async fn get_data(&self, priority: DataPriority) -> Option<Response<T>> {
        let mut reconnects = 0;

        loop {
            let active = match self.inner.active_index() {
                Some(index) => Some(index),
                None => {
                    self.inner.connect().await;
                    self.inner.active_index()
                }
            };

            if let Some(index) = active {
                if let Some(response) = self.inner.fetch(index, priority).await {
                    return Some(response);
                }
            }

            if reconnects == MAX_RECONNECT_CYCLES {
                break;
            }
            reconnects += 1;
        }

        let fallback = self.inner.buffer.latest();
        match &fallback {
            Some(response) => warn!(
                buffered_at = %response.timestamp,
                "No fresh data available, serving last known response"
            ),
            None => warn!("No fresh data available and nothing buffered"),
        }
        fallback
    }

    /// Probe the active channel once, as a watch tick would
    ///
    /// Returns `None` without an active channel, `Some(true)` if it is
    /// healthy, and `Some(false)` after failing it over.
    pub async fn check_active(&self) -> Option<bool> {
        let index = self.inner.active_index()?;

        match self.inner.check_active(index).await {
            WatchOutcome::Healthy => Some(true),
            WatchOutcome::Demoted(retired) => {
                retired.abort_watch();
                self.inner.connect().await;
                Some(false)
            }
            WatchOutcome::NotActive => None,
        }
    }

    /// Probe every unavailable channel once, as a sweep tick would
    pub async fn sweep(&self) -> SweepReport {
        self.inner.sweep().await
    }

    /// Release the active channel, returning it to `Idle`
    ///
    /// Waits for any in-flight connection attempt, cancels the channel's
    /// watch and calls its `disconnect` (best effort). Returns `false` when
    /// there was no active channel.
    pub async fn disconnect(&self) -> bool {
        let Ok(_permit) = self.inner.connect_gate.acquire().await else {
            return false;
        };

        let released = self.inner.active.lock().take();
        let Some(released) = released else {
            return false;
        };
        let index = released.index;
        released.abort_watch();

        let Some(channel) = self.inner.registry.channel(index).cloned() else {
            return false;
        };

        if let Err(e) = channel.disconnect().await {
            warn!(channel = channel.id(), error = %e, "Disconnect failed, releasing anyway");
        }

        self.inner
            .registry
            .transition(index, ChannelStatus::Connected, ChannelStatus::Idle);
        info!(channel = channel.id(), "Channel released");
        true
    }

    /// Cancel the active-channel watch and the recovery sweep
    ///
    /// Aborts and awaits the sweep and the watch of the active channel. A
    /// watch already failing its channel over is no longer owned by the
    /// manager; it sees the cancelled shutdown token at its next await point
    /// and exits without promoting anything. The manager can be restarted
    /// with [`init`](Self::init).
    pub async fn stop(&self) {
        for handle in self.inner.cancel_background() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(error = %e, "Background task panicked");
                }
            }
        }
        info!("Channel manager stopped");
    }

    /// [`stop`](Self::stop), then [`disconnect`](Self::disconnect)
    pub async fn shutdown(&self) {
        self.stop().await;
        self.disconnect().await;
    }

    /// Id of the active channel, if any
    pub fn active_channel_id(&self) -> Option<String> {
        let index = self.inner.active_index()?;
        self.inner.registry.id(index).map(str::to_string)
    }

    /// Current status of the channel registered under `id`
    pub fn status_of(&self, id: &str) -> Result<ChannelStatus> {
        let index = self.inner.registry.index_of(id)?;
        let status = self
            .inner
            .registry
            .status(index)
            .ok_or_else(|| ResilienceError::UnknownChannel(id.to_string()))?;
        Ok(status)
    }

    /// Diagnostic view of every channel, in registration order
    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        self.inner.registry.snapshot()
    }

    /// The last successfully fetched response
    pub fn buffered(&self) -> Option<Response<T>> {
        self.inner.buffer.latest()
    }

    /// Whether `init` has run and `stop` has not
    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().running
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }
}

impl<T: Payload> Drop for ChannelManager<T> {
    fn drop(&mut self) {
        // Tasks hold the shared state; they must not outlive the handle
        self.inner.cancel_background();
    }
}
