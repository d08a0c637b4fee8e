pub mod usb;

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::ApiResponse;
use crate::state::AppState;

pub use usb::{usb_mode_get, usb_mode_revert, usb_mode_set};

// ============================================================================
// Health & Info
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Stored configuration (command line overrides are not included)
#[derive(Serialize)]
pub struct ConfigResponse {
    pub data_dir: String,
    #[serde(flatten)]
    pub config: AppConfig,
}

/// Get the stored configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ConfigResponse>> {
    Json(ApiResponse::ok(ConfigResponse {
        data_dir: state.data_dir().display().to_string(),
        config: (*state.config.get()).clone(),
    }))
}
