pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    /// Not-found constructor used by repositories after zero-row updates.
    pub fn not_found(entity_type: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// True when the underlying SQLite error is a UNIQUE violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}
