//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::EndpointSettings;
use crate::domain::DeviceRegistry;
use crate::service::CommandDispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of live channel endpoints and their device bindings.
    pub registry: Arc<DeviceRegistry>,
    /// Dispatcher used by the command submission endpoint.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Settings for newly accepted endpoints.
    pub endpoint: EndpointSettings,
}

impl AppState {
    /// Builds the state around a fresh, empty registry.
    #[must_use]
    pub fn new(endpoint: EndpointSettings) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&registry)));
        Self {
            registry,
            dispatcher,
            endpoint,
        }
    }
}
