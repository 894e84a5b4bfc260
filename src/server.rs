//! HTTP server assembly and graceful shutdown.
//!
//! Shutdown order: stop accepting, give in-flight requests up to the
//! graceful timeout, then close every channel endpoint still attached.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Path of the channel endpoint.
pub const CHANNEL_PATH: &str = "/echo";

/// Builds the full application router: HTTP API plus the channel endpoint.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api::build_router())
        .route(CHANNEL_PATH, get(ws_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves, then drains.
///
/// In-flight requests get up to `grace` to finish; afterwards every
/// endpoint left in the registry is closed.
///
/// # Errors
///
/// Returns an error if the server fails while accepting or serving.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    request_timeout: Duration,
    grace: Duration,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = std::sync::Arc::clone(&state.registry);
    let app = build_app(state, request_timeout);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = std::pin::pin!(server.into_future());

    let result = tokio::select! {
        result = &mut server => Some(result),
        () = shutdown => None,
    };

    let result = match result {
        Some(result) => result,
        None => {
            tracing::info!(grace_secs = grace.as_secs(), "shutting down");
            let _ = stop_tx.send(());
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("graceful timeout elapsed with requests still in flight");
                    Ok(())
                }
            }
        }
    };

    let closed = registry.close_all().await;
    tracing::info!(closed, "channel endpoints closed");
    result
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
