//! Capability traits at the seams of the adapter

use super::types::Style;
use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// One remote file store reachable over PUT/GET/DELETE/HEAD
///
/// A client holds no state about any particular attachment: every call is
/// parameterized by a storage path, so one client can serve any number of
/// attachments concurrently.
///
/// # Implementation Requirements
///
/// Implementations must:
/// - Create missing parent collections before writing a file in [`put`](Self::put)
/// - Report a missing file from [`get`](Self::get) as `StorageError::NotFound`
/// - Treat deleting a missing file as success
/// - Confine side effects to their own endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DavClient: Send + Sync {
    /// Base URL of the endpoint, used to derive public URLs
    fn base_url(&self) -> &str;

    /// Stores `body` at `path`, overwriting any existing file
    ///
    /// # Errors
    ///
    /// Returns `RemoteUnavailable` on transport faults and `RemoteRejected`
    /// when the server refuses the collection or file write.
    async fn put(&self, path: &str, body: Bytes) -> StorageResult<()>;

    /// Fetches the content stored at `path`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored at `path`.
    async fn get(&self, path: &str) -> StorageResult<Bytes>;

    /// Removes the file at `path`; a missing file is not an error
    ///
    /// # Errors
    ///
    /// Returns an error on transport faults or unexpected statuses.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Checks whether a file exists at `path` without transferring it
    ///
    /// # Errors
    ///
    /// Returns an error on transport faults or unexpected statuses; a
    /// missing file is `Ok(false)`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// The attachment-management layer that owns the adapter
///
/// It decides which storage path each style maps to and wants to hear when a
/// write flush has completed.
#[cfg_attr(test, mockall::automock)]
pub trait AttachmentHost: Send + Sync {
    /// Name of the assigned file, `None` if no file was ever assigned
    fn original_filename(&self) -> Option<String>;

    /// Storage path for `style`, `None` when the style is not mapped
    fn path(&self, style: &Style) -> Option<String>;

    /// Called once after every queued write reached every server
    fn after_flush_writes(&self);
}
