//! Notification emitter contract.
//!
//! The engine never talks to a delivery platform. It hands fully-formed
//! [`Notification`] values to a [`Notifier`], fire-and-forget: a failed or
//! denied emission is skipped and never blocks timer progression.
//!
//! Rate limiting lives in two places:
//! - fasting reminders (hour marks, the thirty-minute warning) are deduped
//!   by the engine's own rules;
//! - reminder-class tags (e.g. daily check-ins) go through a
//!   [`ReminderLedger`] that allows one emission per tag per calendar day.

mod ledger;

pub use ledger::ReminderLedger;

use serde::{Deserialize, Serialize};

/// A user-visible alert. `tag` groups repeat emissions of the same kind;
/// the remaining options map onto whatever the delivery platform supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default)]
    pub vibrate: bool,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag: tag.into(),
            icon: None,
            require_interaction: false,
            vibrate: false,
        }
    }

    /// Phase-boundary alerts stay on screen until acted on.
    pub fn sticky(mut self) -> Self {
        self.require_interaction = true;
        self.vibrate = true;
        self
    }
}

/// Delivery seam. Implementations must not block and must not fail loudly.
pub trait Notifier {
    fn emit(&self, notification: &Notification);
}

/// Logs notifications through tracing and stderr. The default for the CLI,
/// where the terminal is the only delivery surface; stdout is reserved for
/// the JSON event stream.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn emit(&self, notification: &Notification) {
        tracing::info!(
            tag = %notification.tag,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
        eprintln!("[{}] {}", notification.title, notification.body);
    }
}

/// Swallows everything. For tests and headless use.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn emit(&self, _notification: &Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_sets_interaction_flags() {
        let n = Notification::new("Fast complete", "Time to eat", "phase-change").sticky();
        assert!(n.require_interaction);
        assert!(n.vibrate);
        assert!(n.icon.is_none());
    }
}
