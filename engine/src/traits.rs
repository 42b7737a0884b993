//! Collaborator seams: the remote store and the local blob store.
//!
//! The engine has no knowledge of HTTP or of any storage format beyond
//! "string in, string out". Implementations live with the host: an HTTP
//! client for the remote side, platform key-value storage for the local
//! side. Tests plug in scriptable fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::item::RemoteItem;
use crate::ItemId;

/// The authoritative remote store.
///
/// Every call succeeds or fails atomically; failures are uniform (the
/// engine draws no distinction between kinds of remote failure).
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// List all remote items.
    async fn list(&self) -> Result<Vec<RemoteItem>, StoreError>;

    /// Create an item. Idempotent by id: re-creating an existing id is a
    /// success.
    async fn create(&self, item: &RemoteItem) -> Result<(), StoreError>;

    /// Delete an item by id. Deleting an absent id is a success.
    async fn delete(&self, id: &ItemId) -> Result<(), StoreError>;
}

/// The durable local blob store, addressed by a fixed key.
///
/// Stores one serialized snapshot of the full item collection. An absent
/// key means "first run"; a failed `get` means the store is unusable and
/// the engine will not start.
#[async_trait]
pub trait LocalStore: Send + Sync + 'static {
    /// Fetch the blob under `key`, or `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob under `key`.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn list(&self) -> Result<Vec<RemoteItem>, StoreError> {
        (**self).list().await
    }

    async fn create(&self, item: &RemoteItem) -> Result<(), StoreError> {
        (**self).create(item).await
    }

    async fn delete(&self, id: &ItemId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<T: LocalStore + ?Sized> LocalStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}
