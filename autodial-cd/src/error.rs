//! HTTP error type for autodial-cd
//!
//! Every caller-correctable failure is a 400 with its own code so clients
//! can tell them apart; faults inside the service are 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{CampaignError, InterpretError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No submitted number survived validation (400)
    #[error("No valid phone numbers to call")]
    EmptyQueue,

    /// A campaign is already running (400)
    #[error("A calling campaign is already running")]
    AlreadyRunning,

    /// Cancel requested with nothing running (400)
    #[error("No calling campaign is running")]
    NotRunning,

    /// Command text held no dialable number (400)
    #[error("No phone number found in command")]
    NoNumberFound,

    /// Command text held several candidate numbers (400)
    #[error("Command contains several numbers ({}), cannot tell which one to call", .0.join(", "))]
    AmbiguousCommand(Vec<String>),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// autodial-common error
    #[error("Common error: {0}")]
    Common(#[from] autodial_common::Error),
}

impl From<CampaignError> for ApiError {
    fn from(err: CampaignError) -> Self {
        match err {
            CampaignError::EmptyQueue => ApiError::EmptyQueue,
            CampaignError::AlreadyRunning => ApiError::AlreadyRunning,
            CampaignError::NotRunning => ApiError::NotRunning,
        }
    }
}

impl From<InterpretError> for ApiError {
    fn from(err: InterpretError) -> Self {
        match err {
            InterpretError::NoNumberFound => ApiError::NoNumberFound,
            InterpretError::AmbiguousCommand { candidates } => ApiError::AmbiguousCommand(candidates),
        }
    }
}

impl ApiError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::EmptyQueue => "EMPTY_QUEUE",
            ApiError::AlreadyRunning => "ALREADY_RUNNING",
            ApiError::NotRunning => "NOT_RUNNING",
            ApiError::NoNumberFound => "NO_NUMBER_FOUND",
            ApiError::AmbiguousCommand(_) => "AMBIGUOUS_COMMAND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
