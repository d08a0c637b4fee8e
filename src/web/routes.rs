use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/config", get(handlers::get_config))
        // USB gadget network mode
        .route(
            "/usb/mode",
            get(handlers::usb_mode_get).post(handlers::usb_mode_set),
        )
        .route("/usb/mode/temporary", delete(handlers::usb_mode_revert));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
