use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Once-per-(tag, calendar-day) gate for reminder-class notifications.
///
/// The ledger only answers "may this fire today?"; it knows nothing about
/// delivery. Serializable so callers can persist it across restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderLedger {
    fired: HashMap<String, NaiveDate>,
}

impl ReminderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and allows the first emission of `tag` on `day`; rejects
    /// repeats on the same day.
    pub fn should_fire(&mut self, tag: &str, day: NaiveDate) -> bool {
        match self.fired.get(tag) {
            Some(last) if *last == day => false,
            _ => {
                self.fired.insert(tag.to_string(), day);
                true
            }
        }
    }

    /// Drop entries from previous days to keep the map small.
    pub fn prune(&mut self, today: NaiveDate) {
        self.fired.retain(|_, day| *day == today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn one_per_tag_per_day() {
        let mut ledger = ReminderLedger::new();
        assert!(ledger.should_fire("meds-morning", day(1)));
        assert!(!ledger.should_fire("meds-morning", day(1)));
        // Different tag, same day.
        assert!(ledger.should_fire("meds-evening", day(1)));
        // Same tag, next day.
        assert!(ledger.should_fire("meds-morning", day(2)));
    }

    #[test]
    fn prune_keeps_today_only() {
        let mut ledger = ReminderLedger::new();
        ledger.should_fire("a", day(1));
        ledger.should_fire("b", day(2));
        ledger.prune(day(2));
        // "a" was pruned, so it may fire again even on day 1's date.
        assert!(ledger.should_fire("a", day(1)));
        assert!(!ledger.should_fire("b", day(2)));
    }
}
