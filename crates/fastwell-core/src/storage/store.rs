//! Persistence adapter for the active session.
//!
//! The engine state survives process restarts as a single JSON blob in the
//! kv table. `load` is called exactly once at service construction; `save`
//! after every state-mutating transition; `clear` on stop.

use std::rc::Rc;

use crate::error::StorageError;
use crate::timer::FastingSession;

use super::database::Database;

const SESSION_KEY: &str = "active_session";

/// Narrow seam between the state machine and durable storage. Single local
/// writer; no transactionality required.
pub trait SessionStore {
    fn load(&self) -> Result<Option<FastingSession>, StorageError>;
    fn save(&self, session: &FastingSession) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// SessionStore over the SQLite kv table.
pub struct KvSessionStore {
    db: Rc<Database>,
}

impl KvSessionStore {
    pub fn new(db: Rc<Database>) -> Self {
        Self { db }
    }
}

impl SessionStore for KvSessionStore {
    fn load(&self) -> Result<Option<FastingSession>, StorageError> {
        match self.db.kv_get(SESSION_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::CorruptRecord(e.to_string())),
            None => Ok(None),
        }
    }

    fn save(&self, session: &FastingSession) -> Result<(), StorageError> {
        let json = serde_json::to_string(session)
            .map_err(|e| StorageError::CorruptRecord(e.to_string()))?;
        self.db.kv_set(SESSION_KEY, &json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.db.kv_delete(SESSION_KEY)?;
        Ok(())
    }
}
