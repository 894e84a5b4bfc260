//! HTTP endpoint handlers organized by resource.

pub mod command;
pub mod home;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all HTTP routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(home::routes())
        .merge(command::routes())
        .merge(system::routes())
}
