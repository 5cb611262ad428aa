use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use fastwell_core::notify::TerminalNotifier;
use fastwell_core::storage::{Config, Database, KvSessionStore};
use fastwell_core::{Event, FastingPlan, SessionService, SessionState};

#[derive(Subcommand)]
pub enum FastAction {
    /// Start a fasting session
    Start {
        /// Plan label, e.g. "16:8", "18:6", "20:4", "23:1" or custom "F:E"
        #[arg(long)]
        plan: Option<String>,
        /// Complete after the first fasting target instead of alternating
        #[arg(long)]
        one_shot: bool,
    },
    /// Pause the clock
    Pause,
    /// Resume a paused session
    Resume,
    /// Flip phase early (end the fast / close the eating window now)
    Switch,
    /// Change the plan without resetting elapsed time
    Plan {
        /// New plan label
        label: String,
    },
    /// Stop the session and clear the persisted record
    Stop,
    /// Print the current session state as JSON
    Status,
    /// Run one evaluation of the per-second loop
    Tick,
    /// Tick once per second until the session ends or Ctrl-C
    Watch,
}

/// Build the service over the shared database. The service resumes any
/// in-flight session from the kv store.
fn open_service(db: Rc<Database>) -> SessionService {
    let config = Config::load_or_default();
    SessionService::new(
        Box::new(KvSessionStore::new(db)),
        Box::new(TerminalNotifier),
        config.notifications,
    )
}

pub fn run(action: FastAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Rc::new(Database::open()?);
    let mut service = open_service(db.clone());
    let now = Utc::now();

    match action {
        FastAction::Start { plan, one_shot } => {
            let config = Config::load_or_default();
            let label = plan.unwrap_or(config.behavior.default_plan);
            let plan = FastingPlan::parse(&label)?;
            let one_shot = one_shot || config.behavior.one_shot;
            match service.start_at(plan, one_shot, now) {
                Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
                None => {
                    eprintln!("a session is already in flight; stop it first");
                    std::process::exit(1);
                }
            }
        }
        FastAction::Pause => {
            let event = service.pause_at(now);
            print_or_status(&service, event)?;
        }
        FastAction::Resume => {
            let event = service.resume_at(now);
            print_or_status(&service, event)?;
        }
        FastAction::Switch => {
            let event = service.switch_phase_at(now);
            record_history(&db, &service, event.as_slice());
            print_or_status(&service, event)?;
        }
        FastAction::Plan { label } => {
            let plan = FastingPlan::parse(&label)?;
            let event = service.change_plan_at(plan, now);
            print_or_status(&service, event)?;
        }
        FastAction::Stop => {
            let event = service.stop_at(now);
            print_or_status(&service, event)?;
        }
        FastAction::Status => {
            println!(
                "{}",
                serde_json::to_string_pretty(&service.snapshot_at(now))?
            );
        }
        FastAction::Tick => {
            let events = service.tick_at(now);
            record_history(&db, &service, &events);
            for event in &events {
                println!("{}", serde_json::to_string_pretty(event)?);
            }
            if events.is_empty() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&service.snapshot_at(now))?
                );
            }
        }
        FastAction::Watch => watch(db, service)?,
    }
    Ok(())
}

fn print_or_status(
    service: &SessionService,
    event: Option<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
        None => println!("{}", serde_json::to_string_pretty(&service.snapshot())?),
    }
    Ok(())
}

/// Completed phases go to the history table. The phase started
/// `elapsed_secs` before the event timestamp.
fn record_history(db: &Database, service: &SessionService, events: &[Event]) {
    for event in events {
        let (phase, elapsed_secs, at) = match event {
            Event::PhaseSwitched { from, elapsed_secs, at, .. } => (*from, *elapsed_secs, *at),
            Event::SessionCompleted { elapsed_secs, at, .. } => {
                let Some(phase) = service.engine().phase() else {
                    continue;
                };
                (phase, *elapsed_secs, *at)
            }
            _ => continue,
        };
        let plan_label = service
            .engine()
            .session()
            .map(|s| s.plan.label.clone())
            .unwrap_or_default();
        let started_at: DateTime<Utc> = at - chrono::Duration::seconds(elapsed_secs as i64);
        if let Err(e) = db.record_phase(phase, &plan_label, elapsed_secs / 60, started_at, at) {
            tracing::warn!(error = %e, "failed to record phase history");
        }
    }
}

/// The 1 Hz tick loop. At most one cadence is alive at a time; Ctrl-C or
/// the session leaving the Running state cancels it.
fn watch(db: Rc<Database>, mut service: SessionService) -> Result<(), Box<dyn std::error::Error>> {
    if service.engine().state() != SessionState::Running {
        eprintln!("no running session to watch");
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let events = service.tick();
                    record_history(&db, &service, &events);
                    for event in &events {
                        match serde_json::to_string(event) {
                            Ok(json) => println!("{json}"),
                            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                        }
                    }
                    if service.engine().state() != SessionState::Running {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("watch cancelled");
                    break;
                }
            }
        }
    });
    Ok(())
}
