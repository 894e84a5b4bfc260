//! Command submission handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CommandRequest, DispatchResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};
use crate::service::DispatchResult;

/// `POST /command` — Push a command to one device or to all of them.
///
/// The body is decoded as UTF-8 JSON regardless of its content type. The
/// pushed payload is `"time now: <timestamp>\n"` followed by the body
/// verbatim.
///
/// # Errors
///
/// Returns [`RelayError::InvalidCommand`] for a malformed body and
/// [`RelayError::DeliveryFailed`] when any recipient could not be written
/// to (the command is still dispatched to everyone else).
#[utoipa::path(
    post,
    path = "/command",
    tag = "Commands",
    summary = "Dispatch a command",
    description = "Sends the command to the endpoint bound to `device_id`. An empty or unknown `device_id` broadcasts to every bound endpoint.",
    request_body = CommandRequest,
    responses(
        (status = 200, description = "Delivered to every recipient", body = DispatchResponse),
        (status = 400, description = "Malformed command body", body = ErrorResponse),
        (status = 404, description = "At least one recipient could not be written to", body = ErrorResponse),
    )
)]
pub async fn submit_command(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    let body = String::from_utf8(body.to_vec()).map_err(|err| {
        tracing::warn!(error = %err, "command decode error");
        RelayError::InvalidCommand(err.to_string())
    })?;
    let request: CommandRequest = serde_json::from_str(&body).inspect_err(|err| {
        tracing::warn!(error = %err, "command decode error");
    })?;
    let command = request.into_command(body);

    let report = state.dispatcher.dispatch(&command).await;

    match report.result {
        DispatchResult::Delivered { .. } => Ok(Json(DispatchResponse::new(&command, &report))),
        DispatchResult::PartialFailure { attempted, failed } => {
            Err(RelayError::DeliveryFailed { attempted, failed })
        }
    }
}

/// Command routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/command", post(submit_command))
}
