//! Directory of live channel endpoints and their device bindings.
//!
//! [`DeviceRegistry`] tracks every attached endpoint by [`ConnectionId`] and
//! the device identifier each one is currently bound to. Both maps live
//! behind a single [`tokio::sync::RwLock`] so they can never disagree.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{ConnectionId, DeviceId, EndpointHandle};

#[derive(Debug)]
struct Attachment {
    handle: EndpointHandle,
    device: Option<DeviceId>,
}

#[derive(Debug, Default)]
struct Directory {
    endpoints: HashMap<ConnectionId, Attachment>,
    devices: HashMap<DeviceId, ConnectionId>,
}

impl Directory {
    /// Drops `device -> conn_id`, but only while it still points at `conn_id`.
    fn release(&mut self, device: &DeviceId, conn_id: ConnectionId) {
        if self.devices.get(device) == Some(&conn_id) {
            self.devices.remove(device);
        }
    }
}

/// Outcome of [`DeviceRegistry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The identifier now points at the endpoint.
    Bound,
    /// Bound, taking the identifier over from another endpoint. That
    /// endpoint stays attached but unbound, and is not closed.
    Displaced(ConnectionId),
    /// The endpoint is not attached (never attached, evicted, or closed at
    /// shutdown). Nothing changed.
    NotAttached,
}

/// Shared connection registry.
///
/// # Invariants
///
/// - A device identifier maps to at most one endpoint.
/// - An endpoint is bound to at most one device identifier; binding a new
///   one replaces the old.
/// - Every bound endpoint is attached. Evicting an endpoint removes its
///   binding, and only [`attach`](Self::attach) brings it back.
///
/// No lock is held across an `.await` other than the lock acquisition
/// itself, so sends to endpoints always happen outside the lock.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    inner: RwLock<Directory>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted endpoint with no device bound yet.
    pub async fn attach(&self, handle: EndpointHandle) {
        let mut dir = self.inner.write().await;
        dir.endpoints.insert(
            handle.id(),
            Attachment {
                handle,
                device: None,
            },
        );
    }

    /// Binds `device` to the given endpoint.
    ///
    /// Any previous identifier of this endpoint is released. An endpoint
    /// that is not attached is left alone.
    pub async fn bind(&self, device: DeviceId, handle: &EndpointHandle) -> Binding {
        let conn_id = handle.id();
        let mut dir = self.inner.write().await;

        let Some(attachment) = dir.endpoints.get_mut(&conn_id) else {
            return Binding::NotAttached;
        };
        let previous = attachment.device.replace(device.clone());
        if let Some(previous) = previous {
            dir.release(&previous, conn_id);
        }

        match dir.devices.insert(device, conn_id) {
            Some(other) if other != conn_id => {
                if let Some(attachment) = dir.endpoints.get_mut(&other) {
                    attachment.device = None;
                }
                Binding::Displaced(other)
            }
            _ => Binding::Bound,
        }
    }

    /// Removes the binding for `device`. The endpoint stays attached.
    ///
    /// Returns the connection that was bound, if any.
    pub async fn unbind(&self, device: &DeviceId) -> Option<ConnectionId> {
        let mut dir = self.inner.write().await;
        let conn_id = dir.devices.remove(device)?;
        if let Some(attachment) = dir.endpoints.get_mut(&conn_id) {
            attachment.device = None;
        }
        Some(conn_id)
    }

    /// Removes an endpoint and its binding.
    ///
    /// Returns the device identifier it was bound to, if any. Evicting an
    /// unknown connection is a no-op.
    pub async fn evict(&self, conn_id: ConnectionId) -> Option<DeviceId> {
        let mut dir = self.inner.write().await;
        let attachment = dir.endpoints.remove(&conn_id)?;
        let device = attachment.device?;
        dir.release(&device, conn_id);
        Some(device)
    }

    /// Returns the endpoint currently bound to `device`.
    pub async fn resolve(&self, device: &DeviceId) -> Option<EndpointHandle> {
        let dir = self.inner.read().await;
        let conn_id = dir.devices.get(device)?;
        dir.endpoints
            .get(conn_id)
            .map(|attachment| attachment.handle.clone())
    }

    /// Returns the device identifier bound to a connection.
    pub async fn device_of(&self, conn_id: ConnectionId) -> Option<DeviceId> {
        let dir = self.inner.read().await;
        dir.endpoints
            .get(&conn_id)
            .and_then(|attachment| attachment.device.clone())
    }

    /// Returns a snapshot of every bound endpoint with its identifier.
    pub async fn bound_endpoints(&self) -> Vec<(DeviceId, EndpointHandle)> {
        let dir = self.inner.read().await;
        dir.devices
            .iter()
            .filter_map(|(device, conn_id)| {
                dir.endpoints
                    .get(conn_id)
                    .map(|attachment| (device.clone(), attachment.handle.clone()))
            })
            .collect()
    }

    /// Detaches every endpoint and asks each one to close.
    ///
    /// Returns the number of endpoints closed.
    pub async fn close_all(&self) -> usize {
        let drained = {
            let mut dir = self.inner.write().await;
            dir.devices.clear();
            std::mem::take(&mut dir.endpoints)
        };
        for attachment in drained.values() {
            attachment.handle.close();
        }
        drained.len()
    }

    /// Returns the number of attached endpoints, bound or not.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.endpoints.len()
    }

    /// Returns the number of bound device identifiers.
    pub async fn device_count(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    /// Returns `true` if no endpoint is attached.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.endpoints.is_empty()
    }

    /// Checks the registry invariants, for tests.
    #[cfg(test)]
    pub(crate) async fn is_consistent(&self) -> bool {
        let dir = self.inner.read().await;
        let forward = dir.devices.iter().all(|(device, conn_id)| {
            dir.endpoints
                .get(conn_id)
                .is_some_and(|attachment| attachment.device.as_ref() == Some(device))
        });
        let backward = dir.endpoints.iter().all(|(conn_id, attachment)| {
            attachment
                .device
                .as_ref()
                .is_none_or(|device| dir.devices.get(device) == Some(conn_id))
        });
        forward && backward
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::Frame;

    fn endpoint() -> (EndpointHandle, mpsc::Receiver<Frame>) {
        EndpointHandle::channel(ConnectionId::new(), 8, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn attach_does_not_bind() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;

        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.device_count().await, 0);
        assert!(registry.device_of(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn bind_and_resolve() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;

        let binding = registry.bind(DeviceId::new("dev-A"), &handle).await;
        assert_eq!(binding, Binding::Bound);

        let Some(resolved) = registry.resolve(&DeviceId::new("dev-A")).await else {
            panic!("dev-A should resolve");
        };
        assert_eq!(resolved.id(), handle.id());
        assert!(registry.is_consistent().await);
    }

    #[tokio::test]
    async fn rebinding_replaces_previous_identifier() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;

        registry.bind(DeviceId::new("first"), &handle).await;
        registry.bind(DeviceId::new("second"), &handle).await;

        assert!(registry.resolve(&DeviceId::new("first")).await.is_none());
        assert!(registry.resolve(&DeviceId::new("second")).await.is_some());
        assert_eq!(registry.device_count().await, 1);
        assert!(registry.is_consistent().await);
    }

    #[tokio::test]
    async fn latest_binding_wins() {
        let registry = DeviceRegistry::new();
        let (a, _rx_a) = endpoint();
        let (b, _rx_b) = endpoint();
        registry.attach(a.clone()).await;
        registry.attach(b.clone()).await;

        registry.bind(DeviceId::new("shared"), &a).await;
        let binding = registry.bind(DeviceId::new("shared"), &b).await;
        assert_eq!(binding, Binding::Displaced(a.id()));

        let Some(resolved) = registry.resolve(&DeviceId::new("shared")).await else {
            panic!("shared should resolve");
        };
        assert_eq!(resolved.id(), b.id());
        assert!(registry.device_of(a.id()).await.is_none());
        assert_eq!(registry.connection_count().await, 2);
        assert!(!a.is_closed());
        assert!(registry.is_consistent().await);
    }

    #[tokio::test]
    async fn rebinding_same_identifier_is_not_displacement() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;
        registry.bind(DeviceId::new("dev"), &handle).await;
        let binding = registry.bind(DeviceId::new("dev"), &handle).await;
        assert_eq!(binding, Binding::Bound);
        assert_eq!(registry.device_count().await, 1);
        assert!(registry.is_consistent().await);
    }

    #[tokio::test]
    async fn empty_identifier_binds() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;
        registry.bind(DeviceId::new(""), &handle).await;

        assert_eq!(registry.device_of(handle.id()).await, Some(DeviceId::new("")));
    }

    #[tokio::test]
    async fn bind_ignores_unattached_endpoint() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();

        let binding = registry.bind(DeviceId::new("dev"), &handle).await;

        assert_eq!(binding, Binding::NotAttached);
        assert!(registry.is_empty().await);
        assert!(registry.resolve(&DeviceId::new("dev")).await.is_none());
    }

    #[tokio::test]
    async fn evicted_endpoint_cannot_rebind() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;
        registry.bind(DeviceId::new("dev"), &handle).await;
        registry.evict(handle.id()).await;

        let binding = registry.bind(DeviceId::new("dev"), &handle).await;

        assert_eq!(binding, Binding::NotAttached);
        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(registry.device_count().await, 0);
    }

    #[tokio::test]
    async fn unbind_keeps_endpoint_attached() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;
        registry.bind(DeviceId::new("dev"), &handle).await;

        assert_eq!(registry.unbind(&DeviceId::new("dev")).await, Some(handle.id()));
        assert_eq!(registry.unbind(&DeviceId::new("dev")).await, None);
        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.device_count().await, 0);
        assert!(registry.is_consistent().await);
    }

    #[tokio::test]
    async fn evict_removes_endpoint_and_binding() {
        let registry = DeviceRegistry::new();
        let (handle, _rx) = endpoint();
        registry.attach(handle.clone()).await;
        registry.bind(DeviceId::new("dev"), &handle).await;

        assert_eq!(registry.evict(handle.id()).await, Some(DeviceId::new("dev")));
        assert!(registry.is_empty().await);
        assert!(registry.resolve(&DeviceId::new("dev")).await.is_none());
        assert!(registry.evict(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn evicting_displaced_endpoint_keeps_new_binding() {
        let registry = DeviceRegistry::new();
        let (a, _rx_a) = endpoint();
        let (b, _rx_b) = endpoint();
        registry.attach(a.clone()).await;
        registry.attach(b.clone()).await;
        registry.bind(DeviceId::new("shared"), &a).await;
        registry.bind(DeviceId::new("shared"), &b).await;

        assert!(registry.evict(a.id()).await.is_none());
        let Some(resolved) = registry.resolve(&DeviceId::new("shared")).await else {
            panic!("binding of b must survive");
        };
        assert_eq!(resolved.id(), b.id());
    }

    #[tokio::test]
    async fn bound_endpoints_skips_unbound() {
        let registry = DeviceRegistry::new();
        let (a, _rx_a) = endpoint();
        let (b, _rx_b) = endpoint();
        registry.attach(a.clone()).await;
        registry.attach(b.clone()).await;
        registry.bind(DeviceId::new("dev-A"), &a).await;

        let bound = registry.bound_endpoints().await;
        assert_eq!(bound.len(), 1);
        assert!(
            bound
                .iter()
                .all(|(device, handle)| device.as_str() == "dev-A" && handle.id() == a.id())
        );
    }

    #[tokio::test]
    async fn close_all_closes_every_endpoint() {
        let registry = DeviceRegistry::new();
        let (a, _rx_a) = endpoint();
        let (b, _rx_b) = endpoint();
        registry.attach(a.clone()).await;
        registry.attach(b.clone()).await;
        registry.bind(DeviceId::new("dev-B"), &b).await;

        assert_eq!(registry.close_all().await, 2);
        assert!(registry.is_empty().await);
        assert_eq!(registry.device_count().await, 0);
        assert!(a.is_closed());
        assert!(b.is_closed());

        assert_eq!(
            registry.bind(DeviceId::new("dev-B"), &b).await,
            Binding::NotAttached
        );
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_binds_and_evictions_stay_consistent() {
        let registry = Arc::new(DeviceRegistry::new());
        let mut tasks = Vec::new();

        for task in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (handle, _rx) = endpoint();
                registry.attach(handle.clone()).await;
                for round in 0..200 {
                    let device = DeviceId::new(format!("dev-{}", (task + round) % 5));
                    registry.bind(device.clone(), &handle).await;
                    let _ = registry.resolve(&device).await;
                    let _ = registry.bound_endpoints().await;
                }
                if task % 2 == 0 {
                    registry.evict(handle.id()).await;
                }
            }));
        }
        for task in tasks {
            assert!(task.await.is_ok());
        }

        assert!(registry.is_consistent().await);
        assert_eq!(registry.connection_count().await, 8);
        assert!(registry.device_count().await <= 5);
    }
}
