//! Service layer: command routing over the device registry.
//!
//! Contains [`CommandDispatcher`], which resolves a command's target in the
//! [`crate::domain::DeviceRegistry`] and writes the push payload to one or
//! all bound endpoints.

pub mod dispatcher;

pub use dispatcher::{CommandDispatcher, DispatchReport, DispatchResult, Route};
