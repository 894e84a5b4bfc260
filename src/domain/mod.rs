//! Domain layer: identifiers, commands, endpoints, and the registry.
//!
//! This module contains the relay's core model: connection and device
//! identity, the outbound handle of a channel endpoint, commands submitted
//! for delivery, and the registry that binds device identifiers to live
//! endpoints.

pub mod command;
pub mod connection_id;
pub mod device_id;
pub mod device_registry;
pub mod endpoint;

pub use command::Command;
pub use connection_id::ConnectionId;
pub use device_id::DeviceId;
pub use device_registry::{Binding, DeviceRegistry};
pub use endpoint::{EndpointHandle, Frame};
