//! Connection Supervisor: single-flight connection attempts
//!
//! At most one attempt runs at a time. A caller that finds an attempt in
//! flight does not queue behind it; it is told `false` straight away and can
//! fall back to buffered data.

use crate::manager::Inner;
use crate::Payload;
use std::sync::Arc;
use switchover_core_resilience::{select_candidates, ChannelStatus, FailureKind};
use tracing::{debug, warn};

impl<T: Payload> Inner<T> {
    /// Try each candidate in selector order until one connects
    ///
    /// Candidates that refuse are marked `Unavailable` and left to the sweep.
    /// The gate permit is released when this future completes or is dropped.
    pub(crate) async fn connect(self: &Arc<Self>) -> bool {
        let Ok(_permit) = self.connect_gate.try_acquire() else {
            debug!("Connection attempt already in flight");
            return false;
        };

        if let Some(index) = self.active_index() {
            debug!(
                channel = self.registry.id(index).unwrap_or_default(),
                "Channel already active"
            );
            return true;
        }

        let candidates = select_candidates(&self.registry);
        debug!(candidates = candidates.len(), "Connection attempt started");

        for index in candidates {
            let Some(channel) = self.registry.channel(index).cloned() else {
                continue;
            };

            match channel.connect().await {
                Ok(()) => {
                    self.promote(index);
                    return true;
                }
                Err(e) => {
                    self.registry.set_status(index, ChannelStatus::Unavailable);
                    warn!(
                        channel = channel.id(),
                        priority = channel.priority(),
                        kind = %FailureKind::ConnectFailure,
                        error = %e,
                        "Channel refused connection"
                    );
                }
            }
        }

        warn!(
            kind = %FailureKind::NoChannelsAvailable,
            "No channel could be connected"
        );
        false
    }
}
