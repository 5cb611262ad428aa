//! # Fastwell Core Library
//!
//! This library provides the core business logic for the Fastwell
//! intermittent-fasting tracker. It implements a CLI-first philosophy where
//! all operations are available via a standalone CLI binary over this
//! library.
//!
//! ## Architecture
//!
//! - **Fasting Engine**: A wall-clock-based state machine that requires the
//!   caller to invoke `tick_at()` once per second while a session is active
//! - **Session Service**: Wires the engine to persistence and notifications;
//!   the only caller of the persistence adapter
//! - **Storage**: SQLite-based session/history storage and TOML-based
//!   configuration
//! - **Notify**: Notification emitter contract with daily dedup for
//!   reminder-class tags
//!
//! ## Key Components
//!
//! - [`FastingEngine`]: Core fasting state machine
//! - [`SessionService`]: Engine + store + notifier
//! - [`Database`]: History and active-session persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod notify;
pub mod service;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use notify::{Notification, Notifier, ReminderLedger};
pub use service::SessionService;
pub use storage::{Config, Database, KvSessionStore, SessionStore, Stats};
pub use timer::{FastingEngine, FastingPlan, FastingSession, Phase, SessionState};
