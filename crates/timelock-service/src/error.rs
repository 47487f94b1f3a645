//! Error types for the time-lock service.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lock_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Time-lock service error types.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Missing \"{0}\".")]
    MissingParameter(&'static str),

    /// Both bounds are inclusive.
    #[error("Parameter \"time\" must be a number greater than {min} and lower than {max}.")]
    InvalidDuration { min: u64, max: u64 },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Secret collision: {0}")]
    ConstraintViolation(String),

    #[error("Lock not found.")]
    NotFound,

    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LockError {
    pub fn status(&self) -> StatusCode {
        match self {
            LockError::MissingParameter(_) | LockError::InvalidDuration { .. } => {
                StatusCode::BAD_REQUEST
            }
            LockError::NotFound => StatusCode::NOT_FOUND,
            LockError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            LockError::KeyGeneration(_)
            | LockError::ConstraintViolation(_)
            | LockError::Storage(_)
            | LockError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Server-side failures are reduced
    /// to a generic text; the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            LockError::KeyGeneration(_) => "Error generating key.".to_string(),
            LockError::ConstraintViolation(_) | LockError::Storage(_) | LockError::Internal(_) => {
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
}

impl IntoResponse for LockError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: true,
            message: self.public_message(),
        };
        let mut response = (status, Json(body)).into_response();

        if let LockError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

impl From<StoreError> for LockError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConstraintViolation(msg) => LockError::ConstraintViolation(msg),
            other => LockError::Storage(other),
        }
    }
}
