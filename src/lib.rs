//! # device-relay
//!
//! Real-time relay between an HTTP command interface and devices holding a
//! WebSocket open to the server.
//!
//! Devices connect to `/echo` and identify themselves by sending their
//! device identifier: every message is echoed back and its content becomes
//! the channel's identifier. Commands posted to `/command` are pushed to the
//! channel bound to the command's `device_id`, or to every bound channel
//! when that identifier is empty or unknown.
//!
//! ## Architecture
//!
//! ```text
//! Devices (WebSocket)        Command senders (HTTP)
//!     │                          │
//!     ├── WS Handler (ws/)       ├── REST Handlers (api/)
//!     │                          │
//!     │                          └── CommandDispatcher (service/)
//!     │                                  │
//!     └──────────── DeviceRegistry (domain/) ──── EndpointHandle per channel
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
