//! HTTP route handlers.
//!
//! Routes:
//! - `GET /` - Configuration page
//! - `POST /serviceMode` - Administrative actions
//! - `POST /wifiConfig` - Store WiFi credentials
//! - `GET {livePath}` - Live channel (websocket)

pub mod live;
pub mod service;

use axum::{response::Html, routing::get, Router};
use presslog_core::page;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let live_path = state.config.live_path.clone();
    let config_page = Html(page::render(&live_path));
    Router::new()
        .route("/", get(move || async move { config_page }))
        .merge(service::routes())
        .merge(live::routes(&live_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
