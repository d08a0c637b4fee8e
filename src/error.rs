use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::usb_mode::UsbModeError;

/// Application status codes carried in the `Code` field of every response
pub mod codes {
    pub const OK: i32 = 0;
    /// `mode` missing or empty
    pub const MISSING_MODE: i32 = 1;
    /// `mode` is not one of the supported names
    pub const INVALID_MODE: i32 = 2;
    /// Mode record could not be written or removed
    pub const PERSIST_FAILED: i32 = 3;
    pub const BAD_REQUEST: i32 = 4;
    pub const INTERNAL: i32 = 5;
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("mode parameter must not be empty")]
    MissingMode,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    UsbMode(#[from] UsbModeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Response envelope shared by every API endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "Code")]
    pub code: i32,
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Data")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: codes::OK,
            error: String::new(),
            data: Some(data),
        }
    }
}

impl AppError {
    /// Application status code reported to the client
    pub fn code(&self) -> i32 {
        match self {
            AppError::MissingMode => codes::MISSING_MODE,
            AppError::UsbMode(UsbModeError::InvalidMode(_) | UsbModeError::InvalidName(_)) => {
                codes::INVALID_MODE
            }
            AppError::UsbMode(
                UsbModeError::WriteFailure { .. } | UsbModeError::RemoveFailure { .. },
            ) => codes::PERSIST_FAILED,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            _ => codes::INTERNAL,
        }
    }

    /// Message shown to the client
    fn client_message(&self) -> String {
        match self {
            AppError::UsbMode(
                UsbModeError::WriteFailure { .. } | UsbModeError::RemoveFailure { .. },
            ) => "failed to set mode, please retry".to_string(),
            other => other.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        // Always return 200 OK - failures are reported through the Code field
        StatusCode::OK
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body: ApiResponse<()> = ApiResponse {
            code: self.code(),
            error: self.client_message(),
            data: None,
        };

        tracing::error!(
            error_code = body.code,
            error_message = %self,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
