//! WebSocket layer: upgrade handling and the per-connection read loop.
//!
//! The endpoint at `/echo` turns each upgraded connection into a channel
//! endpoint registered with the [`crate::domain::DeviceRegistry`].

pub mod connection;
pub mod handler;
