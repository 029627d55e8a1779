//! Service error type for order-relay
//!
//! One error enum bridges the DB layer (`sqlx::Error`) and the HTTP layer:
//! handlers propagate with `?` and `IntoResponse` picks the status code.
//! Client errors are surfaced verbatim and never logged at error level;
//! database and invariant errors are logged here, once, when rendered.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input validation failure (400)
    #[error("{0}")]
    Validation(String),
    /// Malformed path parameter (400)
    #[error("invalid order id: {0}")]
    InvalidOrderId(String),
    /// Missing resource (404)
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Database or transaction failure (500)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A consistency check on freshly written rows failed (500).
    /// Must never fire in a correct deployment.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOrderId(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"code": <http status>, "message": "..."}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "request failed on database error");
            }
            AppError::Invariant(msg) => {
                tracing::error!(invariant = %msg, "programming invariant violated");
            }
            _ => {}
        }

        let message = match self {
            // Internal detail stays out of the client response
            AppError::Database(_) => "internal server error".to_string(),
            AppError::Invariant(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { code: status.as_u16(), message })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidOrderId("abc".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("order").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::invariant("broken").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_keeps_client_messages_verbatim() {
        let err = AppError::validation("order amount must be positive: got -1");
        assert_eq!(err.to_string(), "order amount must be positive: got -1");

        let err = AppError::NotFound("order");
        assert_eq!(err.to_string(), "order not found");
    }
}
