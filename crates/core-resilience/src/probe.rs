//! Probe verdicts: turning liveness checks into decisions
//!
//! Like the rest of this crate, the probe logic is pure. The caller runs the
//! channel's `check_availability` and hands the outcome over; the verdict says
//! whether the channel is fit for duty and, if not, why.
//!
//! # Example
//!
//! ```
//! use switchover_core_resilience::probe::ProbeVerdict;
//! use switchover_channel_interface::ChannelError;
//!
//! assert!(ProbeVerdict::from_check(Ok(true)).is_available());
//! assert!(!ProbeVerdict::from_check(Ok(false)).is_available());
//!
//! let failed = ProbeVerdict::from_check(Err(ChannelError::Unavailable("timeout".into())));
//! assert_eq!(failed.reason(), Some("Channel unavailable: timeout"));
//! ```

use switchover_channel_interface::ChannelError;

/// Outcome of one liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The channel answered and reported itself available
    Available,

    /// The channel answered, but reported itself down
    ReportedDown,

    /// The probe itself failed
    Failed { reason: String },
}

impl ProbeVerdict {
    /// Classify the result of a `check_availability` call
    ///
    /// `Ok(false)` and `Err(_)` both mean unavailable.
    pub fn from_check(result: Result<bool, ChannelError>) -> Self {
        match result {
            Ok(true) => ProbeVerdict::Available,
            Ok(false) => ProbeVerdict::ReportedDown,
            Err(e) => ProbeVerdict::Failed {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ProbeVerdict::Available)
    }

    /// Human-readable reason for an unavailable verdict
    pub fn reason(&self) -> Option<&str> {
        match self {
            ProbeVerdict::Available => None,
            ProbeVerdict::ReportedDown => Some("channel reported itself unavailable"),
            ProbeVerdict::Failed { reason } => Some(reason.as_str()),
        }
    }
}
