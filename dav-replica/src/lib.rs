//! dav-replica: attachment storage replicated across WebDAV servers
//!
//! An attachment (one file, possibly rendered in several styles such as an
//! original and a thumbnail) is written to every server of a configured
//! pool, while reads and existence checks go to a single primary server.
//!
//! # Design Principles
//!
//! 1. **Write-all, read-one**: full write redundancy, deterministic reads
//! 2. **Fail fast, stay observable**: a failed fan-out stops immediately and
//!    reports which servers already hold the entry
//! 3. **Retry-safe queues**: only fully replicated entries leave the queue
//! 4. **Explicit configuration**: one immutable [`config::StorageConfig`]
//!    shared by reference, never a global
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dav_replica::prelude::*;
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     dav_replica::observability::init()?;
//!
//!     let config = StorageConfig::load_for_service("my-app")?;
//!     let pool = Arc::new(ServerPool::from_config(&config)?);
//!
//!     let host = StaticHost::new()
//!         .with_filename("image.png")
//!         .with_path("original", "/files/original/image.png")
//!         .with_path("thumb", "/files/thumb/image.png");
//!     let mut storage = ReplicatedStorage::from_config(&config, pool, Arc::new(host));
//!
//!     storage.queue_write("original", Cursor::new(b"...".to_vec()));
//!     storage.queue_write("thumb", Cursor::new(b"...".to_vec()));
//!     storage.flush_writes().await?;
//!
//!     println!("{}", storage.public_url(&Style::new("thumb"))?);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` - the `dav-replica` command-line tool

pub mod config;
pub mod error;
pub mod observability;
pub mod storage;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use dav_replica::prelude::*;
    //! ```

    pub use crate::config::{ServerDescriptor, StorageConfig};
    pub use crate::error::{ReplicationOp, StorageError, StorageResult};
    pub use crate::storage::{
        AttachmentHost, DavClient, HttpDavClient, ReplicatedStorage, ServerPool, StaticHost,
        Style,
    };
}
