/*!
 * Switchover - priority-ranked channel failover
 *
 * Keeps one of several interchangeable data channels active at all times:
 * - Highest-priority available channel wins, ties broken by registration order
 * - Active channel probed every 5s, failed over on the first bad probe
 * - Unavailable channels re-probed every 10s and made eligible again
 * - Single-flight connection attempts
 * - Reads fall back to the last good response when no channel can serve
 *
 * Channel faults never reach the caller as errors; they become status
 * transitions and structured log events.
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod mock;
mod monitor;
mod supervisor;

// Re-export commonly used types
pub use config::{LogLevel, LoggingConfig, ManagerConfig};
pub use error::{Result, SwitchoverError};
pub use manager::{ChannelManager, DataPriority};
pub use monitor::SweepReport;
pub use switchover_channel_interface::{Channel, ChannelError, Response};
pub use switchover_core_resilience::{ChannelSnapshot, ChannelStatus, FailureKind};

/// Data a channel can carry
///
/// Responses are cloned into and out of the buffer and shared with
/// background tasks.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
