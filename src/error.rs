use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::ledger::LedgerError;
use crate::services::CoordinatorError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Transfer rejected: {0}")]
    TransferRejected(String),
    #[error("Outcome unknown: {0}")]
    OutcomeUnknown(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::LedgerUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::TransferRejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::OutcomeUnknown(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::DuplicateReference(reference) => {
                AppError::Conflict(format!("duplicate reference {}", reference))
            }
            StoreError::Database(err) => AppError::Database(err),
        }
    }
}

impl From<CoordinatorError> for AppError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::InvalidInput(msg) => AppError::ValidationError(msg),
            CoordinatorError::Ledger(err) => match err {
                LedgerError::TransferRejected(_) => AppError::TransferRejected(err.to_string()),
                LedgerError::InvalidAddress(_)
                | LedgerError::InvalidSecret
                | LedgerError::InvalidAmount(_) => AppError::ValidationError(err.to_string()),
                _ => AppError::LedgerUnavailable(err.to_string()),
            },
            CoordinatorError::UnknownOutcome { .. } => AppError::OutcomeUnknown(e.to_string()),
            CoordinatorError::Integrity { .. } => AppError::Conflict(e.to_string()),
            CoordinatorError::Store(err) => err.into(),
            CoordinatorError::Generation(err) => AppError::InternalError(err.to_string()),
        }
    }
}
