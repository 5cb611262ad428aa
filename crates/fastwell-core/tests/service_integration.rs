//! Service-level scenarios: persistence round-trips through real SQLite
//! and notification dispatch with a recording notifier.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fastwell_core::storage::{Database, KvSessionStore, NotificationsConfig};
use fastwell_core::{
    FastingPlan, Notification, Notifier, SessionService, SessionState,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 19, 0, 0).unwrap()
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Rc<RefCell<Vec<Notification>>>,
}

impl Notifier for RecordingNotifier {
    fn emit(&self, notification: &Notification) {
        self.sent.borrow_mut().push(notification.clone());
    }
}

fn service_with(
    db: Rc<Database>,
    sent: Rc<RefCell<Vec<Notification>>>,
) -> SessionService {
    SessionService::new(
        Box::new(KvSessionStore::new(db)),
        Box::new(RecordingNotifier { sent }),
        NotificationsConfig::default(),
    )
}

#[test]
fn session_survives_restart() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));

    let mut svc = service_with(db.clone(), sent.clone());
    svc.start_at(FastingPlan::eighteen_six(), false, t0())
        .unwrap();
    svc.pause_at(t0() + Duration::hours(2)).unwrap();
    drop(svc);

    // "Page reload": a fresh service over the same store.
    let svc = service_with(db, sent);
    assert_eq!(svc.engine().state(), SessionState::Paused);
    let far_future = t0() + Duration::hours(50);
    assert_eq!(svc.engine().elapsed_secs_at(far_future), 2 * 3600);
}

#[test]
fn stop_clears_the_store() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));

    let mut svc = service_with(db.clone(), sent.clone());
    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    svc.stop_at(t0() + Duration::hours(1)).unwrap();
    drop(svc);

    let svc = service_with(db, sent);
    assert_eq!(svc.engine().state(), SessionState::Idle);
}

#[test]
fn hourly_notification_fires_once_with_remaining_time() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut svc = service_with(db, sent.clone());

    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    sent.borrow_mut().clear(); // drop the "started" notification

    svc.tick_at(t0() + Duration::seconds(3601));
    {
        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tag, "fasting-hourly");
        assert!(sent[0].body.contains("14h 59m"), "body: {}", sent[0].body);
    }

    // No repeat until the next hour mark.
    svc.tick_at(t0() + Duration::seconds(3602));
    svc.tick_at(t0() + Duration::seconds(7199));
    assert_eq!(sent.borrow().len(), 1);
    svc.tick_at(t0() + Duration::seconds(7200));
    assert_eq!(sent.borrow().len(), 2);
}

#[test]
fn final_stretch_fires_in_its_window_only() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut svc = service_with(db, sent.clone());

    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    let target = 16 * 3600;

    svc.tick_at(t0() + Duration::seconds(target - 1800));
    assert!(sent
        .borrow()
        .iter()
        .any(|n| n.tag == "fasting-final-stretch"));

    let count = sent.borrow().len();
    svc.tick_at(t0() + Duration::seconds(target - 1794));
    assert_eq!(sent.borrow().len(), count);
}

#[test]
fn final_stretch_notifies_once_across_the_window() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut svc = service_with(db, sent.clone());

    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    let target = 16 * 3600;

    // Every second of the window lands a tick. The event fires each time;
    // the notification must not.
    for offset in (target - 1800)..=(target - 1796) {
        svc.tick_at(t0() + Duration::seconds(offset));
    }
    let stretch = sent
        .borrow()
        .iter()
        .filter(|n| n.tag == "fasting-final-stretch")
        .count();
    assert_eq!(stretch, 1);
}

#[test]
fn phase_flip_notifies_sticky() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut svc = service_with(db, sent.clone());

    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    svc.tick_at(t0() + Duration::hours(16));

    let sent = sent.borrow();
    let flip = sent.iter().find(|n| n.tag == "fasting-phase").unwrap();
    assert!(flip.require_interaction);
    assert!(flip.title.contains("Fast complete"));
}

#[test]
fn disabled_notifications_stay_silent() {
    let db = Rc::new(Database::open_memory().unwrap());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let mut svc = SessionService::new(
        Box::new(KvSessionStore::new(db)),
        Box::new(RecordingNotifier { sent: sent.clone() }),
        NotificationsConfig {
            enabled: false,
            ..NotificationsConfig::default()
        },
    );

    svc.start_at(FastingPlan::sixteen_eight(), false, t0())
        .unwrap();
    svc.tick_at(t0() + Duration::hours(16));
    assert!(sent.borrow().is_empty());
}
