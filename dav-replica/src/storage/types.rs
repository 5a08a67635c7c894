//! Core types for replicated storage

use std::borrow::Borrow;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::error::StorageResult;

/// Named rendition of an attachment (e.g. `original`, `thumb`)
///
/// # Examples
///
/// ```rust
/// use dav_replica::storage::Style;
///
/// let style = Style::new("thumb");
/// assert_eq!(style.as_str(), "thumb");
/// assert_eq!(Style::default(), Style::original());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Style(String);

impl Style {
    /// Name of the default style
    pub const ORIGINAL: &'static str = "original";

    /// Creates a style from its name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `original` style
    #[must_use]
    pub fn original() -> Self {
        Self::new(Self::ORIGINAL)
    }

    /// Returns the style name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::original()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Style {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Style {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Style {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Readable, rewindable content waiting to be written
///
/// Implemented for anything async-readable and seekable, so both
/// `tokio::fs::File` and in-memory `std::io::Cursor`s can be queued.
pub trait PendingSource: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

impl<T> PendingSource for T where T: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

/// Rewinds `source` and reads its whole content
///
/// The handle may already have been consumed by the host, so reading always
/// starts from offset zero.
pub(crate) async fn read_from_start(
    source: &mut (dyn PendingSource + '_),
) -> StorageResult<bytes::Bytes> {
    source.seek(std::io::SeekFrom::Start(0)).await?;
    let mut buf = Vec::new();
    source.read_to_end(&mut buf).await?;
    Ok(buf.into())
}

/// Joins a base URL and a storage path with exactly one slash between them
///
/// # Examples
///
/// ```rust
/// use dav_replica::storage::join_url;
///
/// assert_eq!(
///     join_url("http://a", "/files/original/image.png"),
///     "http://a/files/original/image.png"
/// );
/// assert_eq!(join_url("http://a/dav/", "files/x.png"), "http://a/dav/files/x.png");
/// ```
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Intermediate collections of a storage path, outermost first
///
/// `/files/original/image.png` yields `/files/` and `/files/original/`.
#[must_use]
pub fn parent_collections(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((_, parents)) = segments.split_last() else {
        return Vec::new();
    };

    let mut collection = String::from("/");
    parents
        .iter()
        .map(|segment| {
            collection.push_str(segment);
            collection.push('/');
            collection.clone()
        })
        .collect()
}
