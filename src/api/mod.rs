//! HTTP API layer: route handlers, DTOs, and router composition.
//!
//! Routes are mounted at the root to keep the wire contract devices and
//! command senders already use: `POST /command`, plus `GET /` and
//! `GET /health`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "device-relay", description = "Pushes submitted commands to connected devices"),
    paths(
        handlers::command::submit_command,
        handlers::home::home_handler,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::CommandRequest,
        dto::DispatchResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Commands", description = "Command submission"),
        (name = "System", description = "Health and browser test page"),
    )
)]
pub struct ApiDoc;

/// Builds the complete HTTP router with all API endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
