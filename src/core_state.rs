//! Shared application state for the HTTP API.
//!
//! One SQLite connection guarded by a `Mutex`; handlers borrow it for the
//! duration of a request. rusqlite connections are not `Sync`, so the lock
//! is the sharing mechanism rather than a pool.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

pub struct AppState {
    conn: Mutex<Connection>,
}

impl AppState {
    /// Open (or create) the clinic database at `path`.
    pub fn new(path: &Path) -> Result<Self, CoreError> {
        let conn = db::open_database(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh in-memory database, used by tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

/// Errors from AppState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_state_opens_migrated_db() {
        let state = AppState::in_memory().unwrap();
        let conn = state.lock_db().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn core_error_display() {
        assert_eq!(CoreError::LockPoisoned.to_string(), "Internal lock error");
    }
}
