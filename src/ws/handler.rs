//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /echo` — Upgrade the HTTP connection to a channel endpoint.
///
/// Requests that are not valid WebSocket upgrades are logged and rejected
/// with Axum's rejection status; no endpoint is created for them.
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "upgrade error");
            return rejection.into_response();
        }
    };

    let registry = Arc::clone(&state.registry);
    let settings = state.endpoint;
    ws.on_failed_upgrade(|err| tracing::warn!(error = %err, "upgrade error"))
        .on_upgrade(move |socket| run_connection(socket, registry, settings))
}
