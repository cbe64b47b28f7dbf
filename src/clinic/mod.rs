//! Clinic rules: accounts, profiles, booking, medical records and reports.
//!
//! Operations take a `rusqlite::Connection` opened for the current request
//! and return `ClinicError`, whose variants map one-to-one onto HTTP
//! statuses at the API boundary.

pub mod accounts;
pub mod booking;
pub mod profiles;
pub mod records;
pub mod reports;

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::{Role, User};

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<rusqlite::Error> for ClinicError {
    fn from(err: rusqlite::Error) -> Self {
        ClinicError::Database(DatabaseError::Sqlite(err))
    }
}

/// Parse a client-supplied id. An id that cannot exist is reported like a
/// missing entity.
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ClinicError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ClinicError::NotFound(not_found.to_string()))
}

/// Role gate: the caller is known but not permitted.
pub fn ensure_role(user: &User, expected: Role) -> Result<(), ClinicError> {
    if user.role == expected {
        Ok(())
    } else {
        Err(ClinicError::Forbidden(format!(
            "Access denied: {expected} role required"
        )))
    }
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<String, ClinicError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClinicError::InvalidRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
