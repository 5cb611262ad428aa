//! Fasting session state machine.
//!
//! The engine is wall-clock based. It does not use internal threads --
//! the caller is responsible for calling `tick_at()` once per second while
//! a session is active and unpaused, and for cancelling that cadence when
//! the session stops.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Fasting <-> Eating -> Idle          (alternating)
//! Idle -> Fasting -> Completed -> Idle        (one-shot)
//! ```
//!
//! Every transition takes an explicit `now` so long-duration behavior is
//! testable; the un-suffixed wrappers use `Utc::now()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clock;
use super::plan::{FastingPlan, Phase};
use crate::events::Event;

/// Width of the 30-minute-warning window in seconds. The check assumes a
/// one-second tick cadence; a coarser caller can miss the window entirely.
const FINAL_STRETCH_SECS: u64 = 1800;
const FINAL_STRETCH_WINDOW: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// The persisted session record. One JSON blob in the store; at most one
/// non-completed session exists at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingSession {
    pub id: String,
    /// Start of the *current* phase, not the whole session. Reset on every
    /// phase flip and on resume.
    pub start_time: DateTime<Utc>,
    pub plan: FastingPlan,
    pub phase: Phase,
    pub paused: bool,
    /// Elapsed seconds carried over a pause/resume boundary.
    #[serde(default)]
    pub paused_elapsed_secs: u64,
    /// Hour count already notified; -1 when no hourly notification has
    /// fired in this phase. Only increases within a phase.
    #[serde(default = "default_hour_mark")]
    pub last_notified_hour_mark: i64,
    #[serde(default)]
    pub completed: bool,
    /// Complete after the first fasting target instead of alternating.
    #[serde(default)]
    pub one_shot: bool,
}

fn default_hour_mark() -> i64 {
    -1
}

/// Core fasting state machine.
///
/// Commands return `Some(Event)` when they apply and `None` otherwise;
/// `tick_at` returns zero or more events because the hourly and
/// thirty-minute checks are independent and may both fire on one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FastingEngine {
    session: Option<FastingSession>,
}

impl FastingEngine {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Resume from a previously persisted record, if any.
    pub fn from_session(session: Option<FastingSession>) -> Self {
        Self { session }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&FastingSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Idle,
            Some(s) if s.completed => SessionState::Completed,
            Some(s) if s.paused => SessionState::Paused,
            Some(_) => SessionState::Running,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Elapsed whole seconds of the current phase at `now`; 0 when idle.
    pub fn elapsed_secs_at(&self, now: DateTime<Utc>) -> u64 {
        match &self.session {
            Some(s) => clock::elapsed_secs(now, s.start_time, s.paused_elapsed_secs, s.paused),
            None => 0,
        }
    }

    /// Target duration of the current phase in seconds; 0 when idle.
    pub fn target_secs(&self) -> u64 {
        match &self.session {
            Some(s) => s.plan.phase_target_secs(s.phase),
            None => 0,
        }
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress_at(&self, now: DateTime<Utc>) -> f64 {
        let target = self.target_secs();
        if target == 0 {
            return 0.0;
        }
        (self.elapsed_secs_at(now) as f64 / target as f64).min(1.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            phase: self.phase(),
            plan_label: self.session.as_ref().map(|s| s.plan.label.clone()),
            elapsed_secs: self.elapsed_secs_at(now),
            target_secs: self.target_secs(),
            progress_pct: self.phase_progress_at(now) * 100.0,
            at: now,
        }
    }

    pub fn snapshot(&self) -> Event {
        self.snapshot_at(Utc::now())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Idle -> Fasting. No-op if a session is already in flight.
    pub fn start_at(
        &mut self,
        plan: FastingPlan,
        one_shot: bool,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if self.session.is_some() {
            return None;
        }
        let session = FastingSession {
            id: Uuid::new_v4().to_string(),
            start_time: now,
            plan,
            phase: Phase::Fasting,
            paused: false,
            paused_elapsed_secs: 0,
            last_notified_hour_mark: -1,
            completed: false,
            one_shot,
        };
        let event = Event::SessionStarted {
            session_id: session.id.clone(),
            plan_label: session.plan.label.clone(),
            phase: session.phase,
            target_secs: session.plan.phase_target_secs(session.phase),
            at: now,
        };
        self.session = Some(session);
        Some(event)
    }

    pub fn start(&mut self, plan: FastingPlan, one_shot: bool) -> Option<Event> {
        self.start_at(plan, one_shot, Utc::now())
    }

    /// Call once per second while running. A tick that lands exactly on the
    /// target second flips on that tick (`>=`), not the next.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state() != SessionState::Running {
            return Vec::new();
        }
        let elapsed = self.elapsed_secs_at(now);
        let target = self.target_secs();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        if elapsed >= target {
            if session.one_shot {
                session.completed = true;
                return vec![Event::SessionCompleted {
                    session_id: session.id.clone(),
                    elapsed_secs: elapsed,
                    at: now,
                }];
            }
            return vec![flip_phase(session, now, elapsed, false)];
        }

        evaluate_reminders(session, now, elapsed, target)
    }

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(Utc::now())
    }

    /// Running -> Paused. Idempotent: pausing an already-paused session
    /// leaves the frozen elapsed value untouched.
    pub fn pause_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state() != SessionState::Running {
            return None;
        }
        let elapsed = self.elapsed_secs_at(now);
        let session = self.session.as_mut()?;
        session.paused = true;
        session.paused_elapsed_secs = elapsed;
        Some(Event::SessionPaused {
            elapsed_secs: elapsed,
            at: now,
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(Utc::now())
    }

    /// Paused -> Running. Resets `start_time` to `now`; the carried
    /// `paused_elapsed_secs` makes elapsed continue seamlessly.
    pub fn resume_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state() != SessionState::Paused {
            return None;
        }
        let session = self.session.as_mut()?;
        session.paused = false;
        session.start_time = now;
        Some(Event::SessionResumed {
            elapsed_secs: session.paused_elapsed_secs,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        self.resume_at(Utc::now())
    }

    /// Manual early flip, regardless of elapsed vs target.
    pub fn switch_phase_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state() != SessionState::Running {
            return None;
        }
        let elapsed = self.elapsed_secs_at(now);
        let session = self.session.as_mut()?;
        Some(flip_phase(session, now, elapsed, true))
    }

    pub fn switch_phase(&mut self) -> Option<Event> {
        self.switch_phase_at(Utc::now())
    }

    /// Swap the plan without resetting elapsed time. The next tick
    /// re-evaluates completion against the new target, so a plan shorter
    /// than what has already elapsed flips immediately.
    pub fn change_plan_at(&mut self, plan: FastingPlan, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.completed {
            return None;
        }
        let old_plan = std::mem::replace(&mut session.plan, plan);
        Some(Event::PlanChanged {
            old_plan: old_plan.label,
            new_plan: session.plan.label.clone(),
            at: now,
        })
    }

    pub fn change_plan(&mut self, plan: FastingPlan) -> Option<Event> {
        self.change_plan_at(plan, Utc::now())
    }

    /// Any state -> Idle. The persisted record is cleared by the caller.
    pub fn stop_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.session.take()?;
        Some(Event::SessionStopped { at: now })
    }

    pub fn stop(&mut self) -> Option<Event> {
        self.stop_at(Utc::now())
    }
}

fn flip_phase(session: &mut FastingSession, now: DateTime<Utc>, elapsed: u64, manual: bool) -> Event {
    let from = session.phase;
    session.phase = from.opposite();
    session.start_time = now;
    session.paused_elapsed_secs = 0;
    session.last_notified_hour_mark = -1;
    Event::PhaseSwitched {
        from,
        to: session.phase,
        elapsed_secs: elapsed,
        manual,
        at: now,
    }
}

/// Hourly and thirty-minute checks. Independent by design: both may fire
/// on the same tick when remaining time crosses both thresholds in one
/// cadence.
fn evaluate_reminders(
    session: &mut FastingSession,
    now: DateTime<Utc>,
    elapsed: u64,
    target: u64,
) -> Vec<Event> {
    let mut events = Vec::new();
    let remaining = target - elapsed;

    let hour = (elapsed / 3600) as i64;
    if hour > session.last_notified_hour_mark && hour > 0 {
        session.last_notified_hour_mark = hour;
        events.push(Event::HourElapsed {
            hour_mark: hour,
            remaining_hours: remaining / 3600,
            remaining_minutes: (remaining % 3600) / 60,
            at: now,
        });
    }

    // Single-tick-wide window at 1 Hz: remaining in (1795, 1800].
    if remaining <= FINAL_STRETCH_SECS && remaining > FINAL_STRETCH_SECS - FINAL_STRETCH_WINDOW {
        events.push(Event::FinalStretch {
            remaining_secs: remaining,
            at: now,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap()
    }

    fn started() -> FastingEngine {
        let mut engine = FastingEngine::new();
        engine
            .start_at(FastingPlan::sixteen_eight(), false, t0())
            .unwrap();
        engine
    }

    #[test]
    fn start_only_from_idle() {
        let mut engine = started();
        assert_eq!(engine.state(), SessionState::Running);
        assert_eq!(engine.phase(), Some(Phase::Fasting));
        assert!(engine.start_at(FastingPlan::omad(), false, t0()).is_none());
    }

    #[test]
    fn tick_before_target_is_quiet() {
        let mut engine = started();
        let events = engine.tick_at(t0() + Duration::seconds(59));
        assert!(events.is_empty());
        assert_eq!(engine.phase(), Some(Phase::Fasting));
    }

    #[test]
    fn exact_target_second_flips() {
        let mut engine = started();
        let at_target = t0() + Duration::hours(16);
        let events = engine.tick_at(at_target);
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::PhaseSwitched { from, to, manual, .. } => {
                assert_eq!(*from, Phase::Fasting);
                assert_eq!(*to, Phase::Eating);
                assert!(!manual);
            }
            other => panic!("expected PhaseSwitched, got {other:?}"),
        }
        let session = engine.session().unwrap();
        assert_eq!(session.start_time, at_target);
        assert_eq!(session.paused_elapsed_secs, 0);
        assert_eq!(session.last_notified_hour_mark, -1);
    }

    #[test]
    fn one_shot_completes_instead_of_flipping() {
        let mut engine = FastingEngine::new();
        engine
            .start_at(FastingPlan::sixteen_eight(), true, t0())
            .unwrap();
        let events = engine.tick_at(t0() + Duration::hours(16));
        assert!(matches!(events[0], Event::SessionCompleted { .. }));
        assert_eq!(engine.state(), SessionState::Completed);
        assert_eq!(engine.phase(), Some(Phase::Fasting));
        // Completed sessions stop ticking.
        assert!(engine.tick_at(t0() + Duration::hours(17)).is_empty());
    }

    #[test]
    fn pause_is_idempotent() {
        let mut engine = started();
        let now = t0() + Duration::seconds(3600);
        engine.pause_at(now).unwrap();
        assert!(engine.pause_at(now + Duration::seconds(50)).is_none());
        assert_eq!(engine.session().unwrap().paused_elapsed_secs, 3600);
    }

    #[test]
    fn pause_resume_continues_seamlessly() {
        let mut engine = started();
        engine.pause_at(t0() + Duration::seconds(3600)).unwrap();
        let resume_at = t0() + Duration::seconds(3600) + Duration::minutes(10);
        engine.resume_at(resume_at).unwrap();
        assert_eq!(engine.elapsed_secs_at(resume_at), 3600);
        assert_eq!(
            engine.elapsed_secs_at(resume_at + Duration::seconds(5)),
            3605
        );
    }

    #[test]
    fn ticks_do_nothing_while_paused() {
        let mut engine = started();
        engine.pause_at(t0() + Duration::seconds(10)).unwrap();
        assert!(engine.tick_at(t0() + Duration::hours(20)).is_empty());
        assert_eq!(engine.phase(), Some(Phase::Fasting));
    }

    #[test]
    fn manual_switch_ignores_target() {
        let mut engine = started();
        let now = t0() + Duration::seconds(120);
        let event = engine.switch_phase_at(now).unwrap();
        match event {
            Event::PhaseSwitched { manual, elapsed_secs, .. } => {
                assert!(manual);
                assert_eq!(elapsed_secs, 120);
            }
            other => panic!("expected PhaseSwitched, got {other:?}"),
        }
        assert_eq!(engine.phase(), Some(Phase::Eating));
    }

    #[test]
    fn shrinking_plan_flips_on_next_tick() {
        let mut engine = started();
        let now = t0() + Duration::hours(15);
        engine
            .change_plan_at(FastingPlan::parse("14:10").unwrap(), now)
            .unwrap();
        // 15h elapsed >= new 14h target.
        let events = engine.tick_at(now + Duration::seconds(1));
        assert!(matches!(events[0], Event::PhaseSwitched { .. }));
        assert_eq!(engine.phase(), Some(Phase::Eating));
    }

    #[test]
    fn change_plan_when_idle_is_noop() {
        let mut engine = FastingEngine::new();
        assert!(engine.change_plan_at(FastingPlan::omad(), t0()).is_none());
    }

    #[test]
    fn stop_clears_session() {
        let mut engine = started();
        assert!(engine.stop_at(t0() + Duration::hours(1)).is_some());
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.stop_at(t0()).is_none());
    }

    #[test]
    fn hourly_reminder_fires_once_per_hour() {
        let mut engine = started();
        let events = engine.tick_at(t0() + Duration::seconds(3601));
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::HourElapsed { hour_mark, remaining_hours, remaining_minutes, .. } => {
                assert_eq!(*hour_mark, 1);
                assert_eq!(*remaining_hours, 14);
                assert_eq!(*remaining_minutes, 59);
            }
            other => panic!("expected HourElapsed, got {other:?}"),
        }
        // Same hour: quiet.
        assert!(engine.tick_at(t0() + Duration::seconds(3700)).is_empty());
        assert!(engine.tick_at(t0() + Duration::seconds(7199)).is_empty());
        // Next hour mark fires again.
        let events = engine.tick_at(t0() + Duration::seconds(7201));
        assert!(matches!(events[0], Event::HourElapsed { hour_mark: 2, .. }));
    }

    #[test]
    fn final_stretch_window_is_single_tick_wide() {
        let mut engine = started();
        let target = 16 * 3600;
        let events = engine.tick_at(t0() + Duration::seconds(target - 1800));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::FinalStretch { remaining_secs: 1800, .. })));
        // Past the window: quiet.
        assert!(engine
            .tick_at(t0() + Duration::seconds(target - 1794))
            .is_empty());
    }

    #[test]
    fn hourly_and_final_stretch_may_share_a_tick() {
        // 2:22 plan: fasting target 7200s. At elapsed 5402s, remaining is
        // 1798s (inside the window) and the hour mark crosses 1.
        let mut engine = FastingEngine::new();
        engine
            .start_at(FastingPlan::parse("2:22").unwrap(), false, t0())
            .unwrap();
        let events = engine.tick_at(t0() + Duration::seconds(5402));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::HourElapsed { .. }));
        assert!(matches!(events[1], Event::FinalStretch { .. }));
    }

    #[test]
    fn snapshot_reports_progress() {
        let mut engine = started();
        let now = t0() + Duration::hours(8);
        match engine.snapshot_at(now) {
            Event::StateSnapshot { state, elapsed_secs, target_secs, progress_pct, .. } => {
                assert_eq!(state, SessionState::Running);
                assert_eq!(elapsed_secs, 8 * 3600);
                assert_eq!(target_secs, 16 * 3600);
                assert!((progress_pct - 50.0).abs() < 1e-9);
            }
            other => panic!("expected StateSnapshot, got {other:?}"),
        }
        engine.stop_at(now).unwrap();
        match engine.snapshot_at(now) {
            Event::StateSnapshot { state, elapsed_secs, .. } => {
                assert_eq!(state, SessionState::Idle);
                assert_eq!(elapsed_secs, 0);
            }
            other => panic!("expected StateSnapshot, got {other:?}"),
        }
    }
}
