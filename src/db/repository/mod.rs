//! Data-access functions. One module per entity family; all functions
//! take a borrowed `Connection` and return `DatabaseError`.

pub mod appointment;
pub mod clinical;
pub mod interaction;
pub mod patient;
pub mod satellite;
pub mod user;

pub use appointment::*;
pub use clinical::*;
pub use interaction::*;
pub use patient::*;
pub use satellite::*;
pub use user::*;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

/// Stored via `NaiveDateTime::to_string()`; the `%.f` accepts rows with
/// and without fractional seconds.
pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
