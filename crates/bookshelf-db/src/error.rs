//! Database error types

use std::time::Duration;

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Reference violation: {0}")]
    ForeignKey(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for DbError {
    /// Classify a driver error by the store's error kind, never by message text.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation => return DbError::Duplicate(message),
                ErrorKind::ForeignKeyViolation => return DbError::ForeignKey(message),
                ErrorKind::NotNullViolation => return DbError::Validation(message),
                _ => {}
            }
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::Connection(err),
            other => DbError::Query(other),
        }
    }
}
