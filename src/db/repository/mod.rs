//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`; `Store` wraps them for
//! callers that should not see the connection.

mod company;
mod evidence;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

pub use company::*;
pub use evidence::*;

/// Timestamp layout used in every TEXT datetime column.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
