//! Switchover Channel Interface: the contract every redundant link implements
//!
//! This crate defines the `Channel` trait, which abstracts one interchangeable
//! communication path (a socket, an API client, a radio link) so the failover
//! core can rank, connect, probe and read from it without knowing what it is.
//!
//! # Architecture
//!
//! The `Channel` trait provides three categories of operations:
//!
//! 1. **Identity**: a stable id for diagnostics and a numeric priority rank
//! 2. **Lifecycle**: connect and (best-effort) disconnect
//! 3. **Service**: liveness probe and data fetch
//!
//! Channel status is deliberately *not* part of the trait. The failover core
//! owns it and is the only writer.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchover_channel_interface::{Channel, ChannelError, Response, Result};
//! use async_trait::async_trait;
//!
//! struct Uplink {
//!     id: String,
//! }
//!
//! #[async_trait]
//! impl Channel<String> for Uplink {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn priority(&self) -> u32 {
//!         1
//!     }
//!
//!     async fn connect(&self) -> Result<()> {
//!         Err(ChannelError::Connect("link down".to_string()))
//!     }
//!
//!     async fn check_availability(&self) -> Result<bool> {
//!         Ok(false)
//!     }
//!
//!     async fn get_data(&self) -> Result<Response<String>> {
//!         Ok(Response::new("telemetry frame".to_string()))
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Connection refused: {0}")]
    Connect(String),

    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// A payload fetched from a channel, stamped with the time it was produced
///
/// Responses are immutable once produced; the failover core clones them into
/// its fallback buffer rather than mutating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    /// Opaque payload
    pub data: T,

    /// When the payload was produced
    ///
    /// Successive responses from one channel are expected to carry
    /// non-decreasing timestamps. Keeping them so is the channel's job: the
    /// core stores whatever it is given.
    pub timestamp: DateTime<Utc>,
}

impl<T> Response<T> {
    /// Create a response stamped with the current wall-clock time
    ///
    /// The wall clock can step backwards. Channels that must guarantee
    /// ordering should stamp with [`Response::at`] from their own monotonic
    /// source.
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a response with an explicit timestamp
    pub fn at(data: T, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// Age of this response relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.timestamp)
    }
}

/// One interchangeable communication channel
///
/// Implementations must be `Send + Sync + 'static`: the failover core shares
/// them between the caller's read path and its background health tasks.
///
/// # Failure semantics
///
/// Every async method is independently fallible. The core never propagates
/// these errors to its own callers; each one is turned into a status change
/// on the channel plus a log line.
#[async_trait]
pub trait Channel<T>: Send + Sync + 'static {
    /// Stable identifier, used for logging and diagnostics only
    fn id(&self) -> &str;

    /// Rank of this channel. Lower values are preferred and tried first.
    fn priority(&self) -> u32;

    /// Establish the connection
    ///
    /// # Errors
    ///
    /// Any error means the connection could not be established.
    async fn connect(&self) -> Result<()>;

    /// Tear the connection down (best effort)
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// Liveness probe
    ///
    /// `Ok(false)` and `Err(_)` both mean "unavailable".
    async fn check_availability(&self) -> Result<bool>;

    /// Fetch the current payload from this channel
    ///
    /// # Errors
    ///
    /// Returns an error when the channel cannot currently produce data.
    async fn get_data(&self) -> Result<Response<T>>;
}
