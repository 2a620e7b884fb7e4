//! Channel Selector: ranks connection candidates
//!
//! A candidate is a channel whose status is `Idle`. Candidates are ordered by
//! ascending priority; channels sharing a priority keep their registration
//! order (the sort is stable). Selection is pure and may run at any time.

use crate::registry::{ChannelRegistry, ChannelStatus};

/// Registry indices of every connection candidate, best first
pub fn select_candidates<T: 'static>(registry: &ChannelRegistry<T>) -> Vec<usize> {
    rank(&registry.ranks())
}

/// Rank `(status, priority)` pairs given in registration order
///
/// Returns the positions of the `Idle` entries sorted by priority, stable on
/// ties.
pub fn rank(entries: &[(ChannelStatus, u32)]) -> Vec<usize> {
    let mut candidates: Vec<(usize, u32)> = entries
        .iter()
        .enumerate()
        .filter(|(_, (status, _))| *status == ChannelStatus::Idle)
        .map(|(index, (_, priority))| (index, *priority))
        .collect();

    // sort_by_key is stable
    candidates.sort_by_key(|&(_, priority)| priority);

    candidates.into_iter().map(|(index, _)| index).collect()
}
