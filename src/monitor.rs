//! Health Monitor: the active-channel watch and the recovery sweep
//!
//! Two independent periodic loops:
//!
//! - **Active watch** (one per active channel): probes the active channel
//!   every `active_watch_interval_ms`; a failed probe demotes it and triggers
//!   a failover.
//! - **Recovery sweep** (one per running manager): probes every
//!   `Unavailable` channel every `sweep_interval_ms` and returns recovered
//!   ones to `Idle`, making them selectable again.
//!
//! Both loops start one full period after they are spawned and delay (rather
//! than burst) when a tick is missed.

use crate::manager::{ActiveChannel, Inner};
use crate::Payload;
use futures::future::join_all;
use std::sync::Arc;
use switchover_core_resilience::probe::ProbeVerdict;
use switchover_core_resilience::{ChannelStatus, FailureKind};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Handle to a running active-channel watch
pub(crate) struct Watch {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Watch {
    /// Ask the watch to stop at its next await point
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Stop the watch now, even mid-probe
    pub(crate) fn abort(self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub(crate) fn into_handle(self) -> JoinHandle<()> {
        self.token.cancel();
        self.handle
    }
}

/// Result of one probe of the active channel
pub(crate) enum WatchOutcome {
    Healthy,
    /// The probe failed and this channel was taken off duty
    Demoted(ActiveChannel),
    /// The channel stopped being active while it was probed
    NotActive,
}

/// Outcome of one recovery sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids of the channels probed, in registration order
    pub probed: Vec<String>,

    /// Ids of the channels moved back to `Idle`
    pub recovered: Vec<String>,
}

fn ticker(period: std::time::Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Spawn the watch for the channel at `index`
///
/// The watch runs on a child of `shutdown`, so stopping the manager stops it
/// too, while demoting the channel stops only this watch.
pub(crate) fn spawn_watch<T: Payload>(
    inner: Arc<Inner<T>>,
    index: usize,
    shutdown: &CancellationToken,
) -> Watch {
    let token = shutdown.child_token();
    let handle = tokio::spawn(run_watch(inner, index, token.clone(), shutdown.clone()));
    Watch { token, handle }
}

async fn run_watch<T: Payload>(
    inner: Arc<Inner<T>>,
    index: usize,
    token: CancellationToken,
    shutdown: CancellationToken,
) {
    let channel = inner.registry.id(index).unwrap_or_default().to_string();
    let mut ticker = ticker(inner.config.active_watch_interval());
    debug!(
        channel = %channel,
        interval_ms = inner.config.active_watch_interval_ms,
        "Active-channel watch started"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => match inner.check_active(index).await {
                WatchOutcome::Healthy => {}
                WatchOutcome::NotActive => break,
                WatchOutcome::Demoted(_) => {
                    // Our own token is cancelled now; only a manager stop may
                    // interrupt the failover
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = inner.connect() => {}
                    }
                    break;
                }
            },
        }
    }

    debug!(channel = %channel, "Active-channel watch stopped");
}

/// Spawn the recovery sweep
pub(crate) fn spawn_sweep<T: Payload>(
    inner: Arc<Inner<T>>,
    shutdown: &CancellationToken,
) -> JoinHandle<()> {
    let token = shutdown.child_token();

    tokio::spawn(async move {
        let mut ticker = ticker(inner.config.sweep_interval());
        info!(
            interval_ms = inner.config.sweep_interval_ms,
            "Recovery sweep started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let report = inner.sweep().await;
                    if !report.probed.is_empty() {
                        debug!(
                            probed = report.probed.len(),
                            recovered = report.recovered.len(),
                            "Recovery sweep finished"
                        );
                    }
                }
            }
        }

        debug!("Recovery sweep stopped");
    })
}

impl<T: Payload> Inner<T> {
    /// Probe the channel at `index` and demote it if the probe fails
    pub(crate) async fn check_active(&self, index: usize) -> WatchOutcome {
        let Some(channel) = self.registry.channel(index).cloned() else {
            return WatchOutcome::NotActive;
        };

        let verdict = ProbeVerdict::from_check(channel.check_availability().await);
        if verdict.is_available() {
            trace!(channel = channel.id(), "Active channel healthy");
            return WatchOutcome::Healthy;
        }

        match self.demote(index, FailureKind::AvailabilityCheckFailure) {
            Some(retired) => {
                warn!(
                    channel = channel.id(),
                    kind = %FailureKind::AvailabilityCheckFailure,
                    reason = verdict.reason().unwrap_or_default(),
                    "Active channel failed liveness check, failing over"
                );
                WatchOutcome::Demoted(retired)
            }
            None => {
                debug!(channel = channel.id(), "Channel no longer active, probe ignored");
                WatchOutcome::NotActive
            }
        }
    }

    /// Probe every `Unavailable` channel concurrently
    ///
    /// A channel goes back to `Idle` only if it is still `Unavailable` when
    /// its probe succeeds.
    pub(crate) async fn sweep(&self) -> SweepReport {
        let probes = self
            .registry
            .unavailable()
            .into_iter()
            .filter_map(|index| Some((index, self.registry.channel(index)?.clone())))
            .map(|(index, channel)| async move {
                let verdict = ProbeVerdict::from_check(channel.check_availability().await);
                (index, channel, verdict)
            });

        let mut report = SweepReport::default();
        for (index, channel, verdict) in join_all(probes).await {
            report.probed.push(channel.id().to_string());

            match verdict {
                ProbeVerdict::Available => {
                    if self.registry.transition(
                        index,
                        ChannelStatus::Unavailable,
                        ChannelStatus::Idle,
                    ) {
                        info!(channel = channel.id(), "Channel recovered, eligible again");
                        report.recovered.push(channel.id().to_string());
                    }
                }
                ProbeVerdict::ReportedDown => {
                    debug!(channel = channel.id(), "Channel still unavailable");
                }
                ProbeVerdict::Failed { reason } => {
                    warn!(channel = channel.id(), reason = %reason, "Recovery probe failed");
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use crate::logging::init_test_logging;
    use crate::mock::{handles, MockChannel};
    use crate::{ChannelManager, ChannelStatus, DataPriority, SweepReport};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn manager(channels: &[&Arc<MockChannel>]) -> ChannelManager<Value> {
        init_test_logging();
        ChannelManager::with_defaults(handles(channels)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_with_nothing_unavailable() {
        let a = Arc::new(MockChannel::new("A", 1));
        let manager = manager(&[&a]);

        assert_eq!(manager.sweep().await, SweepReport::default());
        assert_eq!(a.check_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_restores_recovered_channels() {
        let a = Arc::new(MockChannel::new("A", 1).failing_connect());
        let b = Arc::new(MockChannel::new("B", 2).failing_connect());
        let c = Arc::new(MockChannel::new("C", 3));
        let manager = manager(&[&a, &b, &c]);
        manager.connect().await;

        a.set_available(true);
        let report = manager.sweep().await;

        assert_eq!(report.probed, vec!["A", "B"]);
        assert_eq!(report.recovered, vec!["A"]);
        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Idle);
        assert_eq!(manager.status_of("B").unwrap(), ChannelStatus::Unavailable);
        // Recovery never touches the active channel
        assert_eq!(manager.active_channel_id().as_deref(), Some("C"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_treats_probe_error_as_unavailable() {
        let a = Arc::new(MockChannel::new("A", 1).failing_connect());
        let b = Arc::new(MockChannel::new("B", 2));
        let manager = manager(&[&a, &b]);
        manager.connect().await;

        a.set_available(true);
        a.set_probe_errors(true);
        let report = manager.sweep().await;

        assert!(report.recovered.is_empty());
        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_skips_channel_restored_mid_probe() {
        let a = Arc::new(MockChannel::new("A", 1).failing_connect());
        let b = Arc::new(MockChannel::new("B", 2));
        let manager = Arc::new(manager(&[&a, &b]));
        manager.connect().await;

        a.set_available(true);
        a.hold_checks();

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.sweep().await }
        });
        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.sweep().await }
        });
        while a.check_calls() < 2 {
            tokio::task::yield_now().await;
        }

        // The first sweep to finish restores A, the other finds it Idle
        a.release_checks();
        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(first.probed, vec!["A"]);
        assert_eq!(second.probed, vec!["A"]);
        assert_eq!(first.recovered.len() + second.recovered.len(), 1);
        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_fails_over_on_schedule() {
        let a = Arc::new(MockChannel::new("A", 1));
        let b = Arc::new(MockChannel::new("B", 2));
        let manager = manager(&[&a, &b]);
        manager.init().await;

        a.set_available(false);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(manager.active_channel_id().as_deref(), Some("A"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.active_channel_id().as_deref(), Some("B"));
        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Unavailable);
        assert_eq!(manager.status_of("B").unwrap(), ChannelStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_follows_new_active_channel() {
        let a = Arc::new(MockChannel::new("A", 1));
        let b = Arc::new(MockChannel::new("B", 2));
        let manager = manager(&[&a, &b]);
        manager.init().await;

        // Fetch failure moves the manager to B without waiting for a tick
        a.set_fetch_ok(false);
        manager.get_data(DataPriority::Low).await.unwrap();
        assert_eq!(manager.active_channel_id().as_deref(), Some("B"));

        let a_checks = a.check_calls();
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        // The old watch is gone; the sweep has not run yet
        assert_eq!(a.check_calls(), a_checks);
        assert_eq!(b.check_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_sweep_recovers_channel() {
        let a = Arc::new(MockChannel::new("A", 1).failing_connect());
        let b = Arc::new(MockChannel::new("B", 2));
        let manager = manager(&[&a, &b]);
        manager.init().await;
        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Unavailable);

        a.set_available(true);
        tokio::time::sleep(Duration::from_millis(10_100)).await;

        assert_eq!(manager.status_of("A").unwrap(), ChannelStatus::Idle);
        // Recovered channels wait for the next connection attempt
        assert_eq!(manager.active_channel_id().as_deref(), Some("B"));
    }
}
