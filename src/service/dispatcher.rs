//! Command dispatcher: routes a command to one device or to all of them.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Command, DeviceId, DeviceRegistry, EndpointHandle, Frame};

/// Where a dispatched command went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Sent to the single endpoint bound to this identifier.
    Targeted(DeviceId),
    /// Sent to every bound endpoint.
    Broadcast,
}

impl Route {
    /// Returns the route label used in logs and responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Targeted(_) => "targeted",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    /// Every attempted send succeeded. Holds the number of sends.
    Delivered {
        /// Number of endpoints written to.
        recipients: usize,
    },
    /// At least one send failed. The command still counts as processed.
    PartialFailure {
        /// Number of sends attempted.
        attempted: usize,
        /// Number of sends that failed.
        failed: usize,
    },
}

/// Route and result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Where the command went.
    pub route: Route,
    /// How the sends went.
    pub result: DispatchResult,
    /// Instant stamped into the pushed payload.
    pub dispatched_at: DateTime<Utc>,
}

/// Routes commands to endpoints registered in the [`DeviceRegistry`].
///
/// A command whose target is bound goes to that endpoint only. Anything
/// else (no target, empty target, unknown target) is broadcast to every
/// bound endpoint. Endpoints whose send fails are evicted and closed.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a reference to the inner [`DeviceRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Delivers `command` and reports what happened.
    ///
    /// Never fails as a whole: per-endpoint failures are folded into
    /// [`DispatchResult::PartialFailure`].
    pub async fn dispatch(&self, command: &Command) -> DispatchReport {
        let dispatched_at = Utc::now();
        let frame = Frame::Text(command.push_payload(dispatched_at));

        if let Some(target) = command.target() {
            if let Some(handle) = self.registry.resolve(target).await {
                let ok = self.deliver(target, &handle, frame).await;
                let result = if ok {
                    DispatchResult::Delivered { recipients: 1 }
                } else {
                    DispatchResult::PartialFailure {
                        attempted: 1,
                        failed: 1,
                    }
                };
                tracing::info!(
                    command_id = command.id(),
                    kind = command.kind(),
                    device_id = %target,
                    delivered = ok,
                    "command dispatched"
                );
                return DispatchReport {
                    route: Route::Targeted(target.clone()),
                    result,
                    dispatched_at,
                };
            }
            tracing::debug!(
                command_id = command.id(),
                device_id = %target,
                "target not bound, falling back to broadcast"
            );
        }

        let recipients = self.registry.bound_endpoints().await;
        let attempted = recipients.len();
        let outcomes = join_all(
            recipients
                .iter()
                .map(|(device, handle)| self.deliver(device, handle, frame.clone())),
        )
        .await;
        let failed = outcomes.iter().filter(|ok| !**ok).count();

        tracing::info!(
            command_id = command.id(),
            kind = command.kind(),
            attempted,
            failed,
            "command broadcast"
        );

        let result = if failed == 0 {
            DispatchResult::Delivered {
                recipients: attempted,
            }
        } else {
            DispatchResult::PartialFailure { attempted, failed }
        };
        DispatchReport {
            route: Route::Broadcast,
            result,
            dispatched_at,
        }
    }

    /// Sends one frame, evicting and closing the endpoint on failure.
    async fn deliver(&self, device: &DeviceId, handle: &EndpointHandle, frame: Frame) -> bool {
        match handle.send(frame).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    conn_id = %handle.id(),
                    device_id = %device,
                    error = %err,
                    "write error, evicting endpoint"
                );
                self.registry.evict(handle.id()).await;
                handle.close();
                false
            }
        }
    }
}
