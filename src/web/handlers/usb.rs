//! USB mode handlers
//!
//! - GET    /api/usb/mode           - current effective mode
//! - POST   /api/usb/mode           - record a new mode
//! - DELETE /api/usb/mode/temporary - drop the temporary override

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use typeshare::typeshare;

use crate::error::{ApiResponse, AppError, Result};
use crate::state::AppState;
use crate::usb_mode::{UsbMode, UsbModeRegistry, UsbModeStatus};

/// Note returned after a successful change; the gadget is never reconfigured live
pub const RESTART_NOTE: &str = "Mode saved, takes effect after restart";

#[typeshare]
#[derive(Debug, Serialize)]
pub struct UsbModeResponse {
    /// Effective mode name, "unknown" when not configured
    pub mode: String,
    /// Stored mode value, negative when not configured
    pub mode_value: i32,
    /// Whether a temporary override record exists
    pub is_temporary: bool,
}

impl From<UsbModeStatus> for UsbModeResponse {
    fn from(status: UsbModeStatus) -> Self {
        Self {
            mode: status.mode_name().to_string(),
            mode_value: status.mode_value(),
            is_temporary: status.is_temporary,
        }
    }
}

#[typeshare]
#[derive(Debug, Default)]
pub struct SetUsbModeRequest {
    pub mode: Option<String>,
    pub permanent: bool,
}

impl SetUsbModeRequest {
    /// Decode a set-mode body leniently.
    ///
    /// The Content-Type header is not checked. A non-string `mode` counts as
    /// missing and a non-bool `permanent` as false; an empty body is treated
    /// as `{}`. Only bodies that are not a JSON object are rejected.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
        let fields = value
            .as_object()
            .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".to_string()))?;

        Ok(Self {
            mode: fields.get("mode").and_then(Value::as_str).map(str::to_string),
            permanent: fields
                .get("permanent")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

#[typeshare]
#[derive(Debug, Serialize)]
pub struct SetUsbModeResponse {
    pub mode: String,
    pub permanent: bool,
    pub message: String,
}

#[typeshare]
#[derive(Debug, Serialize)]
pub struct RevertUsbModeResponse {
    pub mode: String,
    pub mode_value: i32,
    pub is_temporary: bool,
    /// Whether an override was actually removed
    pub reverted: bool,
}

/// Run a registry call on the blocking pool; it locks and does file I/O
async fn with_registry<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&UsbModeRegistry) -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = state.usb_mode.clone();
    tokio::task::spawn_blocking(move || f(&registry))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))
}

/// Get the effective USB mode
pub async fn usb_mode_get(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<UsbModeResponse>>> {
    let status = with_registry(&state, |registry| registry.status()).await?;
    Ok(Json(ApiResponse::ok(status.into())))
}

/// Record a new USB mode, temporarily unless `permanent` is set
pub async fn usb_mode_set(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse<SetUsbModeResponse>>> {
    let req = SetUsbModeRequest::from_body(&body)?;
    let name = req
        .mode
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or(AppError::MissingMode)?;
    let mode: UsbMode = name.parse()?;

    let permanent = req.permanent;
    with_registry(&state, move |registry| registry.set_mode(mode, permanent)).await??;

    Ok(Json(ApiResponse::ok(SetUsbModeResponse {
        mode: mode.name().to_string(),
        permanent: req.permanent,
        message: RESTART_NOTE.to_string(),
    })))
}

/// Drop the temporary override and report the resulting mode
pub async fn usb_mode_revert(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<RevertUsbModeResponse>>> {
    let (reverted, status) = with_registry(&state, |registry| {
        registry
            .clear_temporary()
            .map(|reverted| (reverted, registry.status()))
    })
    .await??;

    Ok(Json(ApiResponse::ok(RevertUsbModeResponse {
        mode: status.mode_name().to_string(),
        mode_value: status.mode_value(),
        is_temporary: status.is_temporary,
        reverted,
    })))
}
