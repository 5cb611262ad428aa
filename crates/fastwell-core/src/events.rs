use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, SessionState};

/// Every state change in the engine produces an Event.
/// The CLI prints them; the service turns some of them into notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        plan_label: String,
        phase: Phase,
        target_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase reached its target (or was switched manually) and flipped.
    PhaseSwitched {
        from: Phase,
        to: Phase,
        elapsed_secs: u64,
        manual: bool,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    PlanChanged {
        old_plan: String,
        new_plan: String,
        at: DateTime<Utc>,
    },
    /// One-shot session reached its fasting target.
    SessionCompleted {
        session_id: String,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionStopped {
        at: DateTime<Utc>,
    },
    /// Another whole hour of the current phase has elapsed.
    HourElapsed {
        hour_mark: i64,
        remaining_hours: u64,
        remaining_minutes: u64,
        at: DateTime<Utc>,
    },
    /// Thirty minutes remain in the current phase.
    FinalStretch {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        phase: Option<Phase>,
        plan_label: Option<String>,
        elapsed_secs: u64,
        target_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}
