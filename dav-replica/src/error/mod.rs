//! Error types for replicated attachment storage
//!
//! Every server-level failure keeps its kind as it travels up to the caller.
//! The only case the adapter absorbs is deleting a resource that is already
//! gone.

use std::fmt;
use thiserror::Error;

/// Which fan-out a [`StorageError::PartialReplication`] happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationOp {
    /// A pending write was being stored on every server
    Write,
    /// A pending delete was being removed from every server
    Delete,
}

impl fmt::Display for ReplicationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that can occur during replicated storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// No servers configured, or the primary index points past the pool
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    /// A server or public URL that is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or connection fault talking to one server
    #[error("Server {server} unavailable: {message}")]
    RemoteUnavailable {
        /// Base URL of the server
        server: String,
        /// Transport error description
        message: String,
    },

    /// Server answered with a non-success status
    #[error("Server {server} rejected {path} with status {status}")]
    RemoteRejected {
        /// Base URL of the server
        server: String,
        /// Storage path of the request
        path: String,
        /// HTTP status code returned
        status: u16,
    },

    /// Requested file is not present on the server
    #[error("File not found: {0}")]
    NotFound(String),

    /// The host has no storage path for a style
    #[error("No storage path for style {0}")]
    UnmappedStyle(String),

    /// A fan-out failed after some servers had already applied it
    #[error(
        "Partial {operation} of {path}: failed on {failed_server} after {} server(s) succeeded",
        .replicated_to.len()
    )]
    PartialReplication {
        /// Operation that was being fanned out
        operation: ReplicationOp,
        /// Storage path of the entry that failed
        path: String,
        /// Base URL of the server that failed
        failed_server: String,
        /// Base URLs of the servers that applied the operation, in pool order
        replicated_to: Vec<String>,
        /// Error returned by the failing server
        #[source]
        source: Box<StorageError>,
    },

    /// Local I/O error (pending file handles, local copies)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic storage error
    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Returns `true` when the error means the target file does not exist
    ///
    /// A [`StorageError::RemoteRejected`] with status 404 counts as well, so
    /// custom clients that report raw statuses still get idempotent deletes.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::RemoteRejected { status: 404, .. }
        )
    }

    /// Returns the error reported by the failing server
    ///
    /// For a partial replication this unwraps to the underlying server
    /// error; every other variant returns itself.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::PartialReplication { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
