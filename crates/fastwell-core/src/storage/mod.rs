mod config;
pub mod database;
mod store;

pub use config::{BehaviorConfig, Config, NotificationsConfig};
pub use database::{Database, PhaseRecord, Stats};
pub use store::{KvSessionStore, SessionStore};

use std::path::PathBuf;

/// Returns `~/.config/fastwell[-dev]/` based on FASTWELL_ENV.
///
/// Set FASTWELL_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FASTWELL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("fastwell-dev")
    } else {
        base_dir.join("fastwell")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
