//! Replicated attachment storage
//!
//! Writes and deletes fan out to every server in a [`ServerPool`]; reads,
//! existence checks and public URLs are answered by the primary alone.
//!
//! # Components
//!
//! - [`DavClient`] / [`HttpDavClient`]: one remote WebDAV endpoint
//! - [`ServerPool`]: ordered servers, first is primary
//! - [`WriteQueue`] / [`DeleteQueue`]: pending work between flushes
//! - [`AttachmentHost`] / [`StaticHost`]: the attachment layer's side
//! - [`ReplicatedStorage`]: drains the queues and answers reads

pub mod adapter;
pub mod client;
pub mod host;
pub mod pool;
pub mod queue;
pub mod traits;
pub mod types;

pub use adapter::ReplicatedStorage;
pub use client::HttpDavClient;
pub use host::StaticHost;
pub use pool::ServerPool;
pub use queue::{DeleteQueue, WriteQueue};
pub use traits::{AttachmentHost, DavClient};
pub use types::{join_url, parent_collections, PendingSource, Style};
