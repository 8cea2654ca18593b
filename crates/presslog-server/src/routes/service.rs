//! Administrative routes.
//!
//! ### `POST /serviceMode`
//! Form field `action`:
//! - `reset` truncates the event log and zeroes the counter
//! - `resetWiFi` forgets the stored credentials and restarts
//!
//! Any other value answers 400.
//!
//! ### `POST /wifiConfig`
//! Form fields `ssid` and `password`. Stores the credentials and restarts.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use presslog_core::service::{
    self, ServiceAction, ServiceError, ServiceForm, ServiceOutcome,
};
use tracing::{info, warn};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/serviceMode", post(service_mode))
        .route("/wifiConfig", post(wifi_config))
}

async fn service_mode(State(state): State<AppState>, body: Bytes) -> Response {
    let result = match ServiceForm::from_body(&body).and_then(|form| form.action()) {
        Ok(ServiceAction::Reset) => {
            let mut logger = state.logger.lock().await;
            service::reset_event_log(&mut *logger)
        }
        Ok(ServiceAction::ResetWifi) => service::reset_wifi(state.credentials.as_ref()),
        Err(e) => Err(e),
    };
    respond(&state, result)
}

async fn wifi_config(State(state): State<AppState>, body: Bytes) -> Response {
    let result = service::provision_wifi_form(state.credentials.as_ref(), &body);
    respond(&state, result)
}

/// Map a service result to a plain-text response, requesting a restart if needed.
fn respond(state: &AppState, result: Result<ServiceOutcome, ServiceError>) -> Response {
    match result {
        Ok(outcome) => {
            if outcome == ServiceOutcome::Restart {
                info!("Restart scheduled");
                state.restart.request();
            }
            (StatusCode::OK, outcome.message()).into_response()
        }
        Err(e) => {
            warn!("Service request rejected: {}", e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.to_string()).into_response()
        }
    }
}
