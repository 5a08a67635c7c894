//! Storage adapter: replicated writes, primary reads

use super::pool::ServerPool;
use super::queue::{DeleteQueue, WriteQueue};
use super::traits::{AttachmentHost, DavClient};
use super::types::{join_url, read_from_start, PendingSource, Style};
use crate::config::StorageConfig;
use crate::error::{ReplicationOp, StorageError, StorageResult};
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

/// What a fan-out applies to each server
enum Replicate<'a> {
    Write(&'a Bytes),
    Delete,
}

impl Replicate<'_> {
    const fn operation(&self) -> ReplicationOp {
        match self {
            Self::Write(_) => ReplicationOp::Write,
            Self::Delete => ReplicationOp::Delete,
        }
    }
}

/// Attachment storage replicated across a [`ServerPool`]
///
/// The host queues writes (style → readable handle) and deletes (storage
/// paths) between flushes. Flushing fans each entry out to every server in
/// pool order and stops at the first failure. Entries that reached every
/// server are dropped from the queue; the failed entry and everything after
/// it stay queued, so the flush can simply be called again.
///
/// Reads, existence checks and public URLs only ever involve the primary.
///
/// # Examples
///
/// ```rust,no_run
/// use dav_replica::config::StorageConfig;
/// use dav_replica::storage::{ReplicatedStorage, ServerPool, StaticHost, Style};
/// use std::io::Cursor;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = StorageConfig::with_servers([
///     "http://webdav1.example.com",
///     "http://webdav2.example.com",
/// ]);
/// let pool = Arc::new(ServerPool::from_config(&config)?);
/// let host = StaticHost::new()
///     .with_filename("image.png")
///     .with_path("original", "/files/original/image.png");
///
/// let mut storage = ReplicatedStorage::from_config(&config, pool, Arc::new(host));
/// storage.queue_write("original", Cursor::new(b"png bytes".to_vec()));
/// storage.flush_writes().await?;
///
/// assert!(storage.exists(&Style::original()).await?);
/// println!("{}", storage.public_url(&Style::original())?);
/// # Ok(())
/// # }
/// ```
pub struct ReplicatedStorage {
    pool: Arc<ServerPool>,
    public_url: Option<String>,
    host: Arc<dyn AttachmentHost>,
    queued_for_write: WriteQueue,
    queued_for_delete: DeleteQueue,
}

impl ReplicatedStorage {
    /// Creates an adapter with empty queues and no public URL override
    #[must_use]
    pub fn new(pool: Arc<ServerPool>, host: Arc<dyn AttachmentHost>) -> Self {
        Self {
            pool,
            public_url: None,
            host,
            queued_for_write: WriteQueue::new(),
            queued_for_delete: DeleteQueue::new(),
        }
    }

    /// Creates an adapter taking the public URL override from `config`
    #[must_use]
    pub fn from_config(
        config: &StorageConfig,
        pool: Arc<ServerPool>,
        host: Arc<dyn AttachmentHost>,
    ) -> Self {
        let storage = Self::new(pool, host);
        match &config.public_url {
            Some(public_url) => storage.with_public_url(public_url.clone()),
            None => storage,
        }
    }

    /// Sets the base URL that replaces the primary's in public URLs
    #[must_use]
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// The server pool this adapter replicates to
    #[must_use]
    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// Queues `source` to be written for `style` on the next flush
    pub fn queue_write(&mut self, style: impl Into<Style>, source: impl PendingSource + 'static) {
        self.queued_for_write.insert(style.into(), Box::new(source));
    }

    /// Queues `path` to be deleted on the next flush
    pub fn queue_delete(&mut self, path: impl Into<String>) {
        self.queued_for_delete.push(path);
    }

    /// Queues several paths for deletion, keeping their order
    pub fn queue_delete_all<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queued_for_delete.extend(paths);
    }

    /// Writes not yet confirmed on every server
    #[must_use]
    pub const fn queued_for_write(&self) -> &WriteQueue {
        &self.queued_for_write
    }

    /// Deletes not yet confirmed on every server
    #[must_use]
    pub const fn queued_for_delete(&self) -> &DeleteQueue {
        &self.queued_for_delete
    }

    /// Whether the file for `style` exists on the primary server
    ///
    /// Returns `false` without contacting any server when no file was ever
    /// assigned to the attachment.
    ///
    /// # Errors
    ///
    /// A failure of the primary is returned as is; it is never read as
    /// "does not exist". `UnmappedStyle` if the host has no path for `style`.
    pub async fn exists(&self, style: &Style) -> StorageResult<bool> {
        if self.host.original_filename().is_none() {
            return Ok(false);
        }

        let path = resolve_path(self.host.as_ref(), style)?;
        self.pool.primary().exists(&path).await
    }

    /// [`exists`](Self::exists) for the `original` style
    ///
    /// # Errors
    ///
    /// See [`exists`](Self::exists).
    pub async fn exists_default(&self) -> StorageResult<bool> {
        self.exists(&Style::original()).await
    }

    /// Writes every queued file to every server
    ///
    /// Each handle is rewound before reading. Entries are processed in queue
    /// order, servers in pool order. When all entries are stored everywhere
    /// the queue is empty and the host's `after_flush_writes` hook runs once.
    ///
    /// # Errors
    ///
    /// Stops at the first failing server. If no server had accepted the
    /// entry yet, that server's error is returned; otherwise
    /// `PartialReplication` names the failed server and the ones that already
    /// hold the file. The hook does not run.
    pub async fn flush_writes(&mut self) -> StorageResult<()> {
        let mut flushed = 0_usize;

        while let Some((style, source)) = self.queued_for_write.front_mut() {
            let style = style.clone();
            let path = resolve_path(self.host.as_ref(), &style)?;
            let body = read_from_start(&mut **source).await?;

            replicate(&self.pool, &path, &Replicate::Write(&body)).await?;
            tracing::debug!(
                style = %style,
                path,
                size = body.len(),
                "Write replicated to all servers"
            );

            self.queued_for_write.pop_front();
            flushed += 1;
        }

        self.host.after_flush_writes();
        tracing::info!(entries = flushed, servers = self.pool.len(), "Flushed queued writes");
        Ok(())
    }

    /// Deletes every queued path from every server
    ///
    /// A file already missing on a server counts as deleted there.
    ///
    /// # Errors
    ///
    /// Same fail-fast policy as [`flush_writes`](Self::flush_writes); the
    /// failed path and every later one stay queued.
    pub async fn flush_deletes(&mut self) -> StorageResult<()> {
        let mut flushed = 0_usize;

        while let Some(path) = self.queued_for_delete.front().map(str::to_string) {
            replicate(&self.pool, &path, &Replicate::Delete).await?;
            tracing::debug!(path, "Delete replicated to all servers");

            self.queued_for_delete.pop_front();
            flushed += 1;
        }

        tracing::info!(entries = flushed, servers = self.pool.len(), "Flushed queued deletes");
        Ok(())
    }

    /// Downloads the file for `style` from the primary into `destination`
    ///
    /// Missing parent directories of `destination` are created. No other
    /// server is consulted, even when the primary fails.
    ///
    /// # Errors
    ///
    /// Returns the primary's error (e.g. `NotFound`), a local `Io` error, or
    /// `UnmappedStyle` if the host has no path for `style`.
    pub async fn copy_to_local_file(
        &self,
        style: &Style,
        destination: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let destination = destination.as_ref();
        let path = resolve_path(self.host.as_ref(), style)?;
        let data = self.pool.primary().get(&path).await?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination, &data).await?;

        tracing::debug!(
            style = %style,
            path,
            destination = %destination.display(),
            size = data.len(),
            "Copied file from primary server"
        );
        Ok(())
    }

    /// Publicly reachable URL for `style`
    ///
    /// The override base wins whenever one is configured; otherwise the
    /// primary's base URL is used. No server is contacted.
    ///
    /// # Errors
    ///
    /// `UnmappedStyle` if the host has no path for `style`.
    pub fn public_url(&self, style: &Style) -> StorageResult<String> {
        let base = self
            .public_url
            .as_deref()
            .unwrap_or_else(|| self.pool.primary().base_url());
        Ok(join_url(base, &resolve_path(self.host.as_ref(), style)?))
    }

    /// [`public_url`](Self::public_url) for the `original` style
    ///
    /// # Errors
    ///
    /// See [`public_url`](Self::public_url).
    pub fn public_url_default(&self) -> StorageResult<String> {
        self.public_url(&Style::original())
    }
}

fn resolve_path(host: &dyn AttachmentHost, style: &Style) -> StorageResult<String> {
    host.path(style)
        .ok_or_else(|| StorageError::UnmappedStyle(style.to_string()))
}

/// Applies `action` to every server in pool order, stopping at the first failure
async fn replicate(pool: &ServerPool, path: &str, action: &Replicate<'_>) -> StorageResult<()> {
    let mut replicated_to = Vec::with_capacity(pool.len());

    for server in pool.all() {
        if let Err(error) = apply(server.as_ref(), path, action).await {
            let failed_server = server.base_url().to_string();
            tracing::warn!(
                operation = %action.operation(),
                path,
                server = %failed_server,
                replicated = replicated_to.len(),
                error = %error,
                "Replication failed"
            );

            if replicated_to.is_empty() {
                return Err(error);
            }
            return Err(StorageError::PartialReplication {
                operation: action.operation(),
                path: path.to_string(),
                failed_server,
                replicated_to,
                source: Box::new(error),
            });
        }
        replicated_to.push(server.base_url().to_string());
    }

    Ok(())
}

async fn apply(server: &dyn DavClient, path: &str, action: &Replicate<'_>) -> StorageResult<()> {
    match action {
        Replicate::Write(body) => server.put(path, Bytes::clone(body)).await,
        Replicate::Delete => match server.delete(path).await {
            Err(error) if error.is_not_found() => {
                tracing::warn!(server = %server.base_url(), path, "File already absent");
                Ok(())
            }
            result => result,
        },
    }
}

impl fmt::Debug for ReplicatedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicatedStorage")
            .field("pool", &self.pool)
            .field("public_url", &self.public_url)
            .field("queued_for_write", &self.queued_for_write)
            .field("queued_for_delete", &self.queued_for_delete)
            .finish_non_exhaustive()
    }
}
