//! Error types for dcr-bot
//!
//! [`RelayError`] covers failures inside the intake and finalize handlers
//! and never leaves them: each one is rendered into the user's reply.
//! [`ApiError`] is the HTTP-facing error of the webhook server.

use crate::archive::ArchiveError;
use crate::convert::ConversionError;
use crate::transport::TransportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Handler-level failure of one inbound event
#[derive(Debug, Error)]
pub enum RelayError {
    /// Declared or actual size over the limit; nothing was converted
    #[error("file exceeds the {limit} byte limit")]
    FileTooLarge { size: Option<u64>, limit: u64 },

    /// The upload could not be fetched from the transport
    #[error("could not download the file: {0}")]
    Fetch(TransportError),

    /// The conversion engine reported an error
    #[error("{0}")]
    ConversionFailed(#[from] ConversionError),

    /// The conversion did not finish in time and was abandoned
    #[error("conversion timed out after {} seconds", .0.as_secs())]
    ConversionTimedOut(Duration),

    /// The archive could not be built
    #[error("could not build the archive: {0}")]
    Archive(#[from] ArchiveError),

    /// The archive could not be sent back to the user
    #[error("could not send the archive: {0}")]
    Delivery(TransportError),

    /// Scratch area I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
