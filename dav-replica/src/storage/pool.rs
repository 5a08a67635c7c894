//! Ordered pool of WebDAV servers

use super::client::HttpDavClient;
use super::traits::DavClient;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use std::fmt;
use std::sync::Arc;

/// Ordered set of servers with one designated primary
///
/// Writes and deletes go to [`all`](Self::all) servers in configured order;
/// reads and existence checks go to the [`primary`](Self::primary) only,
/// whatever its health. The primary is an index into the list rather than a
/// separate type, so moving the role is a configuration change.
///
/// The pool is read-only after construction and can be shared by `Arc`
/// between any number of adapters.
///
/// # Examples
///
/// ```rust
/// use dav_replica::config::StorageConfig;
/// use dav_replica::storage::{DavClient, ServerPool};
///
/// # fn example() -> dav_replica::error::StorageResult<()> {
/// let config = StorageConfig::with_servers([
///     "http://webdav1.example.com",
///     "http://webdav2.example.com",
/// ]);
/// let pool = ServerPool::from_config(&config)?;
///
/// assert_eq!(pool.len(), 2);
/// assert_eq!(pool.primary().base_url(), "http://webdav1.example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ServerPool {
    servers: Vec<Arc<dyn DavClient>>,
    primary_index: usize,
}

impl ServerPool {
    /// Creates a pool from already-built clients; the first is primary
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if `servers` is empty.
    pub fn new(servers: Vec<Arc<dyn DavClient>>) -> StorageResult<Self> {
        if servers.is_empty() {
            return Err(StorageError::NotConfigured(
                "server pool requires at least one server".to_string(),
            ));
        }
        Ok(Self {
            servers,
            primary_index: 0,
        })
    }

    /// Builds one [`HttpDavClient`] per configured server
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` or `InvalidUrl` if the configuration does not
    /// validate.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;

        let servers = config
            .servers
            .iter()
            .map(|server| {
                HttpDavClient::new(server, config)
                    .map(|client| Arc::new(client) as Arc<dyn DavClient>)
            })
            .collect::<StorageResult<Vec<_>>>()?;

        tracing::info!(
            servers = servers.len(),
            primary = %config.servers[0].url,
            "WebDAV server pool ready"
        );
        Self::new(servers)
    }

    /// Moves the primary role to the server at `index`
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if `index` is outside the pool.
    pub fn with_primary(mut self, index: usize) -> StorageResult<Self> {
        if index >= self.servers.len() {
            return Err(StorageError::NotConfigured(format!(
                "primary index {index} outside pool of {} server(s)",
                self.servers.len()
            )));
        }
        self.primary_index = index;
        Ok(self)
    }

    /// The server consulted for every read and existence check
    #[must_use]
    pub fn primary(&self) -> &Arc<dyn DavClient> {
        &self.servers[self.primary_index]
    }

    /// Index of the primary within [`all`](Self::all)
    #[must_use]
    pub const fn primary_index(&self) -> usize {
        self.primary_index
    }

    /// Every server, in configured order
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn DavClient>] {
        &self.servers
    }

    /// Number of servers in the pool
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Always `false`; a pool cannot be built empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Base URLs of every server, in configured order
    #[must_use]
    pub fn base_urls(&self) -> Vec<String> {
        self.servers
            .iter()
            .map(|server| server.base_url().to_string())
            .collect()
    }
}

impl fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPool")
            .field("servers", &self.base_urls())
            .field("primary_index", &self.primary_index)
            .finish()
    }
}
