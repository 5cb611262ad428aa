//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The default fasting plan
//! - Notification preferences
//! - Session behavior (alternating vs one-shot)
//!
//! Configuration is stored at `~/.config/fastwell/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hourly progress reminders during a phase.
    #[serde(default = "default_true")]
    pub hourly: bool,
    /// Thirty-minute-remaining warning.
    #[serde(default = "default_true")]
    pub final_stretch: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

/// Session behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Plan label used when `fast start` is given no plan.
    #[serde(default = "default_plan")]
    pub default_plan: String,
    /// Complete after the first fasting target instead of alternating.
    #[serde(default)]
    pub one_shot: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/fastwell/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_true() -> bool {
    true
}
fn default_plan() -> String {
    "16:8".into()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hourly: true,
            final_stretch: true,
            vibration: true,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            default_plan: default_plan(),
            one_shot: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: NotificationsConfig::default(),
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Config {
    /// Location of the config file on disk.
    pub fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// as the existing type, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(&*self)?;
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err("config key is empty".into());
        }

        let mut current = &mut json;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| format!("unknown config key: {key}"))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| format!("unknown config key: {key}"))?;
                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse::<bool>()?),
                    serde_json::Value::Number(_) => {
                        serde_json::Value::Number(value.parse::<u64>()?.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };
                obj.insert(part.to_string(), new_value);
            } else {
                current = current
                    .get_mut(part)
                    .ok_or_else(|| format!("unknown config key: {key}"))?;
            }
        }

        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }
}
