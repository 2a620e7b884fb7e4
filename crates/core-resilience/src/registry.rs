//! Channel Registry: the ordered set of channel handles and their status
//!
//! The registry is a pure data holder. It never talks to a channel; it only
//! remembers, for each caller-supplied handle, where that channel sits in the
//! `Idle -> Connected -> Unavailable -> Idle` cycle.
//!
//! # Single writer path
//!
//! Status is written from three independent actors (the connection
//! supervisor, the active-channel watch and the recovery sweep). All of them
//! go through [`ChannelRegistry::set_status`] or [`ChannelRegistry::transition`],
//! which share one write primitive, so every transition is logged in one place
//! and the "at most one Connected channel" invariant stays auditable.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! # use switchover_channel_interface::{Channel, Response, Result};
//! # struct Link(&'static str, u32);
//! # #[async_trait::async_trait]
//! # impl Channel<()> for Link {
//! #     fn id(&self) -> &str { self.0 }
//! #     fn priority(&self) -> u32 { self.1 }
//! #     async fn connect(&self) -> Result<()> { Ok(()) }
//! #     async fn check_availability(&self) -> Result<bool> { Ok(true) }
//! #     async fn get_data(&self) -> Result<Response<()>> { Ok(Response::new(())) }
//! # }
//! use switchover_core_resilience::registry::{ChannelRegistry, ChannelStatus};
//!
//! let channels: Vec<Arc<dyn Channel<()>>> = vec![Arc::new(Link("a", 1)), Arc::new(Link("b", 2))];
//! let registry = ChannelRegistry::new(channels).unwrap();
//!
//! assert_eq!(registry.status(0), Some(ChannelStatus::Idle));
//! registry.set_status(0, ChannelStatus::Connected);
//! assert_eq!(registry.connected(), vec![0]);
//! ```

use crate::error::ResilienceError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use switchover_channel_interface::Channel;
use tracing::debug;

/// Where a channel currently sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Eligible for selection
    Idle,
    /// Connected and serving as the active channel
    Connected,
    /// Failed; excluded from selection until a sweep restores it
    Unavailable,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelStatus::Idle => "idle",
            ChannelStatus::Connected => "connected",
            ChannelStatus::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of one registered channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Position in registration order
    pub index: usize,
    pub id: String,
    pub priority: u32,
    pub status: ChannelStatus,
}

struct Entry<T> {
    channel: Arc<dyn Channel<T>>,
    status: RwLock<ChannelStatus>,
}

/// Ordered collection of caller-owned channel handles plus their status
pub struct ChannelRegistry<T> {
    entries: Vec<Entry<T>>,
}

impl<T: 'static> ChannelRegistry<T> {
    /// Build a registry from the caller's channels, in registration order
    ///
    /// Every channel starts `Idle`. The handles are shared, not copied.
    ///
    /// # Errors
    ///
    /// Returns `ResilienceError::EmptyRegistry` for an empty sequence.
    pub fn new(channels: Vec<Arc<dyn Channel<T>>>) -> Result<Self, ResilienceError> {
        if channels.is_empty() {
            return Err(ResilienceError::EmptyRegistry);
        }

        let entries = channels
            .into_iter()
            .map(|channel| Entry {
                channel,
                status: RwLock::new(ChannelStatus::Idle),
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle of the channel at `index`
    pub fn channel(&self, index: usize) -> Option<&Arc<dyn Channel<T>>> {
        self.entries.get(index).map(|entry| &entry.channel)
    }

    /// Current status of the channel at `index`
    pub fn status(&self, index: usize) -> Option<ChannelStatus> {
        self.entries.get(index).map(|entry| *entry.status.read())
    }

    /// Id of the channel at `index`
    pub fn id(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.channel.id())
    }

    /// Look up a channel's position by id (first match in registration order)
    pub fn index_of(&self, id: &str) -> Result<usize, ResilienceError> {
        self.entries
            .iter()
            .position(|entry| entry.channel.id() == id)
            .ok_or_else(|| ResilienceError::UnknownChannel(id.to_string()))
    }

    /// Unconditionally set the status of the channel at `index`
    ///
    /// Returns the previous status, or `None` if `index` is out of range.
    /// Setting the status a channel already has is a no-op.
    pub fn set_status(&self, index: usize, status: ChannelStatus) -> Option<ChannelStatus> {
        let entry = self.entries.get(index)?;
        let mut current = entry.status.write();
        Some(Self::apply(entry, &mut current, status))
    }

    /// Move the channel at `index` from `from` to `to`
    ///
    /// Returns `false` (and changes nothing) when the channel is not in `from`
    /// anymore, e.g. because another actor moved it while a probe was running.
    pub fn transition(&self, index: usize, from: ChannelStatus, to: ChannelStatus) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let mut current = entry.status.write();
        if *current != from {
            return false;
        }
        Self::apply(entry, &mut current, to);
        true
    }

    fn apply(
        entry: &Entry<T>,
        current: &mut ChannelStatus,
        status: ChannelStatus,
    ) -> ChannelStatus {
        let previous = *current;
        if previous != status {
            debug!(
                channel = entry.channel.id(),
                from = %previous,
                to = %status,
                "Channel status changed"
            );
            *current = status;
        }
        previous
    }

    /// Indices of every channel currently in `status`, in registration order
    pub fn with_status(&self, status: ChannelStatus) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| *entry.status.read() == status)
            .map(|(index, _)| index)
            .collect()
    }

    /// Indices of connected channels (at most one while the manager is sound)
    pub fn connected(&self) -> Vec<usize> {
        self.with_status(ChannelStatus::Connected)
    }

    /// Indices of channels waiting for the recovery sweep
    pub fn unavailable(&self) -> Vec<usize> {
        self.with_status(ChannelStatus::Unavailable)
    }

    /// `(status, priority)` of every channel, in registration order
    pub fn ranks(&self) -> Vec<(ChannelStatus, u32)> {
        self.entries
            .iter()
            .map(|entry| (*entry.status.read(), entry.channel.priority()))
            .collect()
    }

    /// Diagnostic view of every channel, in registration order
    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ChannelSnapshot {
                index,
                id: entry.channel.id().to_string(),
                priority: entry.channel.priority(),
                status: *entry.status.read(),
            })
            .collect()
    }
}

impl<T: 'static> fmt::Debug for ChannelRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stub_registry;

    #[test]
    fn test_empty_registry_rejected() {
        let result = ChannelRegistry::<()>::new(Vec::new());
        assert!(matches!(result, Err(ResilienceError::EmptyRegistry)));
    }

    #[test]
    fn test_channels_start_idle() {
        let registry = stub_registry(&[("a", 1), ("b", 2), ("c", 3)]);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.with_status(ChannelStatus::Idle), vec![0, 1, 2]);
        assert!(registry.connected().is_empty());
        assert!(registry.unavailable().is_empty());
    }

    #[test]
    fn test_set_status_returns_previous() {
        let registry = stub_registry(&[("a", 1)]);

        assert_eq!(
            registry.set_status(0, ChannelStatus::Connected),
            Some(ChannelStatus::Idle)
        );
        assert_eq!(
            registry.set_status(0, ChannelStatus::Unavailable),
            Some(ChannelStatus::Connected)
        );
        assert_eq!(registry.status(0), Some(ChannelStatus::Unavailable));
    }

    #[test]
    fn test_set_status_is_idempotent() {
        let registry = stub_registry(&[("a", 1)]);

        registry.set_status(0, ChannelStatus::Unavailable);
        assert_eq!(
            registry.set_status(0, ChannelStatus::Unavailable),
            Some(ChannelStatus::Unavailable)
        );
        assert_eq!(registry.unavailable(), vec![0]);
    }

    #[test]
    fn test_set_status_out_of_range() {
        let registry = stub_registry(&[("a", 1)]);
        assert_eq!(registry.set_status(5, ChannelStatus::Idle), None);
        assert_eq!(registry.status(5), None);
    }

    #[test]
    fn test_transition_requires_expected_status() {
        let registry = stub_registry(&[("a", 1)]);

        // Idle -> Idle is not Unavailable -> Idle
        assert!(!registry.transition(0, ChannelStatus::Unavailable, ChannelStatus::Idle));

        registry.set_status(0, ChannelStatus::Unavailable);
        assert!(registry.transition(0, ChannelStatus::Unavailable, ChannelStatus::Idle));
        assert_eq!(registry.status(0), Some(ChannelStatus::Idle));
    }

    #[test]
    fn test_index_of() {
        let registry = stub_registry(&[("a", 1), ("b", 2)]);

        assert_eq!(registry.index_of("b"), Ok(1));
        assert_eq!(
            registry.index_of("zzz"),
            Err(ResilienceError::UnknownChannel("zzz".to_string()))
        );
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let registry = stub_registry(&[("low", 9), ("high", 1)]);
        registry.set_status(1, ChannelStatus::Connected);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].id, "low");
        assert_eq!(snapshot[0].status, ChannelStatus::Idle);
        assert_eq!(snapshot[1].id, "high");
        assert_eq!(snapshot[1].priority, 1);
        assert_eq!(snapshot[1].status, ChannelStatus::Connected);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ChannelStatus::Unavailable.to_string(), "unavailable");
    }
}
