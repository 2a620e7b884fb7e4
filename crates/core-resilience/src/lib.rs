//! Switchover Core Resilience: Pure-logic failover primitives
//!
//! # Overview
//!
//! This crate provides the stateful building blocks behind priority-ranked
//! channel failover. It includes:
//!
//! - **Channel Registry**: Caller-owned channel handles plus the status the core assigns them
//! - **Channel Selector**: Ranks `Idle` channels by priority, stable on ties
//! - **Response Buffer**: Last-known-good response used as a stale fallback
//! - **Probe Verdicts**: Classifies liveness checks into available / down
//! - **Failure Taxonomy**: Connect, availability, fetch and exhaustion failures
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - Async runtimes and timers
//! - What a channel actually is (socket, API client, radio link)
//! - Application-specific concerns
//!
//! The supervisor and health tasks that drive these primitives live in the
//! `switchover` crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Channel Registry                  │  ← handles + Idle/Connected/Unavailable
//! │  (single status write path)             │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Channel Selector                  │  ← Idle only, ascending priority
//! │  (pure, stable on ties)                 │
//! └─────────────┬───────────────────────────┘
//!               │ candidates
//!               ▼
//!         Connection Supervisor  ──► active channel ──► Response Buffer
//!                                                       (last known good)
//!
//!  Continuously running (in `switchover`):
//!   Active watch → Probe Verdict → failover
//!   Sweep        → Probe Verdict → Unavailable back to Idle
//! ```
//!
//! # Usage Example
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
//! use switchover_core_resilience::prelude::*;
//!
//! let channels: Vec<Arc<dyn Channel<()>>> = vec![
//!     Arc::new(Link("satellite", 3)),
//!     Arc::new(Link("fiber", 1)),
//!     Arc::new(Link("lte", 2)),
//! ];
//! let registry = ChannelRegistry::new(channels).unwrap();
//! registry.set_status(1, ChannelStatus::Unavailable);
//!
//! // fiber is down, so lte (priority 2) is tried before satellite (priority 3)
//! assert_eq!(select_candidates(&registry), vec![2, 0]);
//! ```

pub mod buffer;
pub mod error;
pub mod probe;
pub mod registry;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use buffer::ResponseBuffer;
pub use error::{FailureKind, ResilienceError};
pub use probe::ProbeVerdict;
pub use registry::{ChannelRegistry, ChannelSnapshot, ChannelStatus};
pub use selector::select_candidates;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use switchover_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::buffer::ResponseBuffer;
    pub use super::error::{FailureKind, ResilienceError};
    pub use super::probe::ProbeVerdict;
    pub use super::registry::{ChannelRegistry, ChannelSnapshot, ChannelStatus};
    pub use super::selector::select_candidates;
}
