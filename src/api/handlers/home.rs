//! Browser test page that opens a channel to the relay.

use axum::Router;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::Html;
use axum::routing::get;

use crate::app_state::AppState;
use crate::server::CHANNEL_PATH;

const HOME_TEMPLATE: &str = include_str!("home.html");
const WS_URL_PLACEHOLDER: &str = "__WS_URL__";

/// `GET /` — HTML page for opening a channel from a browser.
///
/// The channel URL is derived from the request's `Host` header.
#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    summary = "Browser test page",
    responses(
        (status = 200, description = "HTML page", content_type = "text/html", body = String),
    )
)]
pub async fn home_handler(headers: HeaderMap) -> Html<String> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    Html(render_home(&format!("ws://{host}{CHANNEL_PATH}")))
}

/// Fills the template with `ws_url` as a JavaScript string literal.
fn render_home(ws_url: &str) -> String {
    let literal = serde_json::to_string(ws_url)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e");
    HOME_TEMPLATE.replace(WS_URL_PLACEHOLDER, &literal)
}

/// Home page route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(home_handler))
}
