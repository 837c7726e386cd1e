//! Transport errors and envelope responses

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use springkey_core::{envelope, ActionError, ErrorKind};

use crate::config::ErrorStatusMode;

/// Failures of the transport around an action
///
/// These never reach the caller as text; they collapse to an [`ActionError`]
/// with a fixed message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("Action task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<ApiError> for ActionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Body(_) => ActionError::MALFORMED_REQUEST,
            ApiError::Task(_) => ActionError::INTERNAL,
        }
    }
}

/// HTTP status for an error kind in [`ErrorStatusMode::Http`]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Codec | ErrorKind::Crypto => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Encoding | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A response envelope paired with the configured status policy
pub struct EnvelopeResponse {
    pub envelope: envelope::Response,
    pub mode: ErrorStatusMode,
}

impl EnvelopeResponse {
    pub fn new(envelope: envelope::Response, mode: ErrorStatusMode) -> Self {
        Self { envelope, mode }
    }

    pub fn status(&self) -> StatusCode {
        match (self.mode, self.envelope.error()) {
            (ErrorStatusMode::Http, Some(err)) => status_for(err.kind()),
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for EnvelopeResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.envelope.to_json();

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
