//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). The binary lets `--addr` and
//! `--graceful-timeout` override the two settings operators change most.

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Settings applied to every accepted channel endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Capacity of each endpoint's outbound queue.
    pub queue_capacity: usize,
    /// Maximum time a single send waits for queue space.
    pub send_timeout: Duration,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
        }
    }
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `127.0.0.1:8080`).
    pub listen_addr: SocketAddr,

    /// How long shutdown waits for in-flight requests before closing channels.
    pub graceful_timeout: Duration,

    /// Upper bound on the time spent serving one HTTP request.
    pub request_timeout: Duration,

    /// Per-endpoint queue and send settings.
    pub endpoint: EndpointSettings,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            graceful_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(15),
            endpoint: EndpointSettings::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let graceful_timeout = Duration::from_secs(parse_env(
            "GRACEFUL_TIMEOUT_SECS",
            defaults.graceful_timeout.as_secs(),
        ));
        let request_timeout = Duration::from_secs(parse_env(
            "REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        ));

        let endpoint = EndpointSettings {
            queue_capacity: parse_env("OUTBOUND_QUEUE_CAPACITY", defaults.endpoint.queue_capacity)
                .max(1),
            send_timeout: Duration::from_millis(parse_env(
                "SEND_TIMEOUT_MS",
                DEFAULT_SEND_TIMEOUT_MS,
            )),
        };

        let log_format = parse_log_format(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            listen_addr,
            graceful_timeout,
            request_timeout,
            endpoint,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Accepts `"json"` (case-insensitive); anything else means text.
fn parse_log_format(value: Option<&str>) -> LogFormat {
    match value {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
