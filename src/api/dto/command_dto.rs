//! Command submission DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Command;
use crate::service::{DispatchReport, DispatchResult, Route};

/// Request body for `POST /command`.
///
/// Every field is optional; missing fields decode as empty or zero.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct CommandRequest {
    /// Target device identifier. Empty or unknown means broadcast.
    pub device_id: String,
    /// Caller-supplied correlation identifier.
    pub id: String,
    /// Opaque kind tag.
    pub kind: i64,
    /// Free-text message body.
    pub message: String,
}

impl CommandRequest {
    /// Converts the decoded request into a domain [`Command`], keeping the
    /// body it was decoded from.
    #[must_use]
    pub fn into_command(self, raw_body: String) -> Command {
        Command::new(self.device_id, self.id, self.kind, self.message, raw_body)
    }
}

/// Response body for a fully delivered `POST /command`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    /// Echo of the request's `id`.
    pub command_id: String,
    /// `"targeted"` or `"broadcast"`.
    pub route: String,
    /// Device the command was routed to, for targeted dispatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Number of endpoints written to.
    pub delivered: usize,
    /// Dispatch timestamp.
    pub dispatched_at: DateTime<Utc>,
}

impl DispatchResponse {
    /// Builds the response for a dispatch of `command`.
    #[must_use]
    pub fn new(command: &Command, report: &DispatchReport) -> Self {
        let delivered = match report.result {
            DispatchResult::Delivered { recipients } => recipients,
            DispatchResult::PartialFailure { attempted, failed } => attempted.saturating_sub(failed),
        };
        let target = match &report.route {
            Route::Targeted(device) => Some(device.to_string()),
            Route::Broadcast => None,
        };
        Self {
            command_id: command.id().to_string(),
            route: report.route.as_str().to_string(),
            target,
            delivered,
            dispatched_at: report.dispatched_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::DeviceId;

    #[test]
    fn missing_fields_default() {
        let Ok(req) = serde_json::from_str::<CommandRequest>(r#"{"message":"hi"}"#) else {
            panic!("partial body should decode");
        };
        assert!(req.device_id.is_empty());
        assert!(req.id.is_empty());
        assert_eq!(req.kind, 0);
        assert_eq!(req.message, "hi");
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let result = serde_json::from_str::<CommandRequest>(r#"{"kind":"seven"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn into_command_keeps_raw_body() {
        let raw = r#"{"device_id":"dev-A","id":"c-9","kind":3,"message":"ping"}"#;
        let Ok(req) = serde_json::from_str::<CommandRequest>(raw) else {
            panic!("valid body");
        };
        let cmd = req.into_command(raw.to_string());
        assert_eq!(cmd.target(), Some(&DeviceId::new("dev-A")));
        assert_eq!(cmd.id(), "c-9");
        assert_eq!(cmd.kind(), 3);
        assert_eq!(cmd.raw_body(), raw);
    }

    #[test]
    fn response_for_targeted_dispatch() {
        let cmd = Command::new("dev-A", "c-1", 0, "ping", "{}");
        let report = DispatchReport {
            route: Route::Targeted(DeviceId::new("dev-A")),
            result: DispatchResult::Delivered { recipients: 1 },
            dispatched_at: Utc::now(),
        };
        let resp = DispatchResponse::new(&cmd, &report);
        assert_eq!(resp.command_id, "c-1");
        assert_eq!(resp.route, "targeted");
        assert_eq!(resp.target.as_deref(), Some("dev-A"));
        assert_eq!(resp.delivered, 1);
        assert_eq!(resp.dispatched_at, report.dispatched_at);
    }
}
