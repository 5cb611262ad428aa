//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - Completed fasting/eating phases (session history)
//! - Fasting statistics (daily and all-time)
//! - Key-value store holding the active session record

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

use super::data_dir;

/// One completed phase in the history table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    pub phase: String,
    pub plan_label: String,
    pub duration_min: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_phases: u64,
    pub total_fasting_min: u64,
    pub total_eating_min: u64,
    pub completed_fasts: u64,
    pub longest_fast_min: u64,
    pub today_fasts: u64,
    pub today_fasting_min: u64,
}

/// SQLite database for session history and the active-session kv store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/fastwell/fastwell.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("fastwell.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS phases (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                phase       TEXT NOT NULL,
                plan_label  TEXT NOT NULL DEFAULT '',
                duration_min INTEGER NOT NULL,
                started_at  TEXT NOT NULL,
                ended_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Indexes for the stats queries
            CREATE INDEX IF NOT EXISTS idx_phases_ended_at ON phases(ended_at);
            CREATE INDEX IF NOT EXISTS idx_phases_phase ON phases(phase);
            CREATE INDEX IF NOT EXISTS idx_phases_ended_at_phase ON phases(ended_at, phase);",
        )?;
        Ok(())
    }

    /// Record a completed phase to the history table.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_phase(
        &self,
        phase: Phase,
        plan_label: &str,
        duration_min: u64,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO phases (phase, plan_label, duration_min, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                phase.as_str(),
                plan_label,
                duration_min,
                started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent completed phases, newest first.
    pub fn recent_phases(&self, limit: u32) -> Result<Vec<PhaseRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, plan_label, duration_min, started_at, ended_at
             FROM phases ORDER BY ended_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, phase, plan_label, duration_min, started_at, ended_at) = row?;
            records.push(PhaseRecord {
                id,
                phase,
                plan_label,
                duration_min,
                started_at: parse_rfc3339(&started_at)?,
                ended_at: parse_rfc3339(&ended_at)?,
            });
        }
        Ok(records)
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_min), 0), COALESCE(MAX(duration_min), 0)
             FROM phases
             WHERE ended_at >= ?1
             GROUP BY phase",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![format!("{today}T00:00:00+00:00")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        for row in rows {
            let (phase, count, minutes, longest) = row?;
            stats.total_phases += count;
            match phase.as_str() {
                "fasting" => {
                    stats.completed_fasts += count;
                    stats.total_fasting_min += minutes;
                    stats.longest_fast_min = stats.longest_fast_min.max(longest);
                    stats.today_fasts += count;
                    stats.today_fasting_min += minutes;
                }
                "eating" => {
                    stats.total_eating_min += minutes;
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_min), 0), COALESCE(MAX(duration_min), 0)
             FROM phases
             GROUP BY phase",
        )?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut stats = Stats::default();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        for row in rows {
            let (phase, count, minutes, longest) = row?;
            stats.total_phases += count;
            match phase.as_str() {
                "fasting" => {
                    stats.completed_fasts += count;
                    stats.total_fasting_min += minutes;
                    stats.longest_fast_min = stats.longest_fast_min.max(longest);
                }
                "eating" => {
                    stats.total_eating_min += minutes;
                }
                _ => {}
            }
        }

        // Today's fasts
        let mut stmt2 = self.conn.prepare(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM phases
             WHERE phase = 'fasting' AND ended_at >= ?1",
        )?;
        let row = stmt2.query_row(params![format!("{today}T00:00:00+00:00")], |row| {
            Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?))
        })?;
        stats.today_fasts = row.0;
        stats.today_fasting_min = row.1;

        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(Phase::Fasting, "16:8", 16 * 60, now, now)
            .unwrap();
        db.record_phase(Phase::Eating, "16:8", 8 * 60, now, now)
            .unwrap();
        let stats = db.stats_all().unwrap();
        assert_eq!(stats.completed_fasts, 1);
        assert_eq!(stats.total_fasting_min, 16 * 60);
        assert_eq!(stats.total_eating_min, 8 * 60);
        assert_eq!(stats.longest_fast_min, 16 * 60);
    }

    #[test]
    fn recent_phases_newest_first() {
        let db = Database::open_memory().unwrap();
        let earlier = Utc::now() - chrono::Duration::hours(20);
        let later = Utc::now();
        db.record_phase(Phase::Fasting, "16:8", 960, earlier, earlier)
            .unwrap();
        db.record_phase(Phase::Eating, "16:8", 480, later, later)
            .unwrap();
        let records = db.recent_phases(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, "eating");
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }
}
