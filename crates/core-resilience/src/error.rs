//! Error types for the resilience primitives

use crate::registry::ChannelStatus;
use std::fmt;
use thiserror::Error;

/// Errors raised by misuse of the resilience primitives themselves
///
/// Channel faults are *not* errors at this level; they are classified by
/// [`FailureKind`] and turned into status transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// A registry must hold at least one channel
    #[error("Channel registry requires at least one channel")]
    EmptyRegistry,

    /// No channel with this id is registered
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Classification of every failure the failover core can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A candidate refused to connect
    ConnectFailure,

    /// A liveness probe failed or reported the channel down
    AvailabilityCheckFailure,

    /// The active channel could not produce data
    FetchFailure,

    /// Every candidate was exhausted without a connection
    NoChannelsAvailable,
}

impl FailureKind {
    /// Status the offending channel moves to, if the failure is tied to one
    pub fn status_after(&self) -> Option<ChannelStatus> {
        match self {
            FailureKind::ConnectFailure
            | FailureKind::AvailabilityCheckFailure
            | FailureKind::FetchFailure => Some(ChannelStatus::Unavailable),
            FailureKind::NoChannelsAvailable => None,
        }
    }

    /// Whether this failure costs the manager its active channel
    pub fn triggers_failover(&self) -> bool {
        matches!(
            self,
            FailureKind::AvailabilityCheckFailure | FailureKind::FetchFailure
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ConnectFailure => "connect_failure",
            FailureKind::AvailabilityCheckFailure => "availability_check_failure",
            FailureKind::FetchFailure => "fetch_failure",
            FailureKind::NoChannelsAvailable => "no_channels_available",
        };
        f.write_str(name)
    }
}
