//! API error types

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookshelf_db::DbError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Database(e) => match e {
                DbError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                DbError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                DbError::Duplicate(msg) => (StatusCode::CONFLICT, "DUPLICATE", msg.clone()),
                DbError::ForeignKey(msg) => {
                    (StatusCode::CONFLICT, "REFERENCE_VIOLATION", msg.clone())
                }
                DbError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DATABASE_UNAVAILABLE",
                    e.to_string(),
                ),
                DbError::Timeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "DATABASE_TIMEOUT",
                    e.to_string(),
                ),
                DbError::Query(_) | DbError::Migration(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    e.to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!("{}", self);
        }

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_database_errors_map_to_status() {
        let cases = [
            (DbError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DbError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DbError::Duplicate("x".into()), StatusCode::CONFLICT),
            (DbError::ForeignKey("x".into()), StatusCode::CONFLICT),
            (
                DbError::Connection(sqlx_pool_closed()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DbError::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                DbError::Migration("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_of(ApiError::from(err)), expected);
        }
    }

    #[test]
    fn test_not_found_code() {
        let (status, code, message) =
            ApiError::from(DbError::NotFound("author 7 not found".into())).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "author 7 not found");
    }

    fn sqlx_pool_closed() -> bookshelf_db::sqlx::Error {
        bookshelf_db::sqlx::Error::PoolClosed
    }
}
