//! Session service: the engine plus its collaborators.
//!
//! The service owns the state machine and is the *only* caller of the
//! persistence adapter. It loads the persisted record exactly once at
//! construction, saves after every state-mutating transition, and clears
//! on stop. Persistence is best-effort: a failed write is logged and the
//! in-memory state machine advances anyway. Notifications derived from
//! engine events go through the injected [`Notifier`], fire-and-forget.

use chrono::{DateTime, NaiveDate, Utc};

use crate::events::Event;
use crate::notify::{Notification, Notifier, ReminderLedger};
use crate::storage::{NotificationsConfig, SessionStore};
use crate::timer::{FastingEngine, FastingPlan, Phase};

pub struct SessionService {
    engine: FastingEngine,
    store: Box<dyn SessionStore>,
    notifier: Box<dyn Notifier>,
    notifications: NotificationsConfig,
    ledger: ReminderLedger,
}

impl SessionService {
    /// Build the service, resuming an in-flight session from the store.
    /// An unreadable store falls back to Idle rather than failing.
    pub fn new(
        store: Box<dyn SessionStore>,
        notifier: Box<dyn Notifier>,
        notifications: NotificationsConfig,
    ) -> Self {
        let session = match store.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persisted session, starting idle");
                None
            }
        };
        Self {
            engine: FastingEngine::from_session(session),
            store,
            notifier,
            notifications,
            ledger: ReminderLedger::new(),
        }
    }

    pub fn engine(&self) -> &FastingEngine {
        &self.engine
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Event {
        self.engine.snapshot_at(now)
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn start_at(
        &mut self,
        plan: FastingPlan,
        one_shot: bool,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let event = self.engine.start_at(plan, one_shot, now)?;
        self.persist();
        self.dispatch(&event);
        Some(event)
    }

    pub fn pause_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.pause_at(now)?;
        self.persist();
        Some(event)
    }

    pub fn resume_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.resume_at(now)?;
        self.persist();
        Some(event)
    }

    pub fn switch_phase_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.switch_phase_at(now)?;
        self.persist();
        self.dispatch(&event);
        Some(event)
    }

    pub fn change_plan_at(&mut self, plan: FastingPlan, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.change_plan_at(plan, now)?;
        self.persist();
        Some(event)
    }

    pub fn stop_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let event = self.engine.stop_at(now)?;
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        Some(event)
    }

    /// One evaluation of the per-second loop. Persists only when the tick
    /// mutated the session (phase flip or completion), never on a quiet
    /// tick.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let events = self.engine.tick_at(now);
        if events
            .iter()
            .any(|e| matches!(e, Event::PhaseSwitched { .. } | Event::SessionCompleted { .. }))
        {
            self.persist();
        }
        for event in &events {
            self.dispatch(event);
        }
        events
    }

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(Utc::now())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist(&self) {
        let Some(session) = self.engine.session() else {
            return;
        };
        if let Err(e) = self.store.save(session) {
            tracing::warn!(error = %e, "failed to persist session, continuing in memory");
        }
    }

    fn dispatch(&mut self, event: &Event) {
        if !self.notifications.enabled {
            return;
        }
        let Some(notification) = self.notification_for(event) else {
            return;
        };
        if let Some((key, day)) = self.reminder_key(event) {
            if !self.ledger.should_fire(&key, day) {
                return;
            }
        }
        self.notifier.emit(&notification);
    }

    /// Ledger key for reminder-class events. Qualified by phase and hour
    /// mark so a 16:8 day notifies in both windows, while repeats of the
    /// same reminder stay silent for the rest of the day. The 30-minute
    /// window spans several 1 Hz ticks; only the first one gets through.
    fn reminder_key(&self, event: &Event) -> Option<(String, NaiveDate)> {
        let phase = self.engine.phase()?;
        match event {
            Event::HourElapsed { hour_mark, at, .. } => Some((
                format!("fasting-hourly:{}:{hour_mark}", phase.as_str()),
                at.date_naive(),
            )),
            Event::FinalStretch { at, .. } => Some((
                format!("fasting-final-stretch:{}", phase.as_str()),
                at.date_naive(),
            )),
            _ => None,
        }
    }

    fn notification_for(&self, event: &Event) -> Option<Notification> {
        match event {
            Event::SessionStarted { plan_label, .. } => Some(Notification::new(
                "Fast started",
                format!("Your {plan_label} fast is underway."),
                "fasting-started",
            )),
            Event::PhaseSwitched { to, .. } => {
                let mut n = match to {
                    Phase::Eating => Notification::new(
                        "Fast complete!",
                        "Your eating window is open.",
                        "fasting-phase",
                    ),
                    Phase::Fasting => Notification::new(
                        "Eating window closed",
                        "Your next fast has begun.",
                        "fasting-phase",
                    ),
                }
                .sticky();
                n.vibrate = self.notifications.vibration;
                Some(n)
            }
            Event::HourElapsed {
                hour_mark,
                remaining_hours,
                remaining_minutes,
                ..
            } if self.notifications.hourly => {
                let phase = self.engine.phase()?;
                Some(Notification::new(
                    format!("{hour_mark}h into your {} window", phase.as_str()),
                    format!("{remaining_hours}h {remaining_minutes}m remaining."),
                    "fasting-hourly",
                ))
            }
            Event::FinalStretch { .. } if self.notifications.final_stretch => {
                let phase = self.engine.phase()?;
                Some(Notification::new(
                    "Final stretch",
                    format!("30 minutes left in your {} window.", phase.as_str()),
                    "fasting-final-stretch",
                ))
            }
            Event::SessionCompleted { elapsed_secs, .. } => {
                let mut n = Notification::new(
                    "Fast complete!",
                    format!("You fasted for {}h {}m. Well done.",
                        elapsed_secs / 3600,
                        (elapsed_secs % 3600) / 60
                    ),
                    "fasting-complete",
                )
                .sticky();
                n.vibrate = self.notifications.vibration;
                Some(n)
            }
            _ => None,
        }
    }
}
