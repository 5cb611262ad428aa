//! Phase clock: wall-clock time to elapsed seconds for the current phase.
//!
//! Pure functions of their inputs -- scheduling the one-second cadence is
//! the caller's job, and stopping a session must cancel it.

use chrono::{DateTime, Utc};

/// Elapsed whole seconds for a phase that began at `start_time`, carrying
/// `paused_elapsed_secs` over any pause/resume boundary.
///
/// When `paused`, the clock is frozen at the carried value. When `now`
/// precedes `start_time` (clock skew), elapsed clamps to the carried value
/// rather than going negative.
pub fn elapsed_secs(
    now: DateTime<Utc>,
    start_time: DateTime<Utc>,
    paused_elapsed_secs: u64,
    paused: bool,
) -> u64 {
    if paused {
        return paused_elapsed_secs;
    }
    let delta = now.signed_duration_since(start_time).num_seconds();
    if delta < 0 {
        return paused_elapsed_secs;
    }
    paused_elapsed_secs.saturating_add(delta as u64)
}
