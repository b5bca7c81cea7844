//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `&rusqlite::Connection`, one sub-module per entity.
//! All public functions are re-exported here.

pub mod appointment;
pub mod consultation;
pub mod health;
pub mod hospital;
pub mod prescription;
pub mod rfid;
pub mod user;

pub use appointment::*;
pub use consultation::*;
pub use health::*;
pub use hospital::*;
pub use prescription::*;
pub use rfid::*;
pub use user::*;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DatabaseError;

/// Parse a stored UUID string, surfacing corruption as a constraint error.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

/// Parse a stored RFC 3339 timestamp.
pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
