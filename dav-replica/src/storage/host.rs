//! Host collaborator built from explicit style paths

use super::traits::AttachmentHost;
use super::types::Style;
use std::collections::HashMap;
use std::fmt;

type FlushHook = Box<dyn Fn() + Send + Sync>;

/// An [`AttachmentHost`] whose answers are fixed at construction
///
/// Useful when the attachment layer has already resolved every path, and in
/// tools that address storage paths directly.
///
/// # Examples
///
/// ```rust
/// use dav_replica::storage::{AttachmentHost, StaticHost, Style};
///
/// let host = StaticHost::new()
///     .with_filename("image.png")
///     .with_path("original", "/files/original/image.png")
///     .with_path("thumb", "/files/thumb/image.png");
///
/// assert_eq!(host.path(&Style::new("thumb")).as_deref(), Some("/files/thumb/image.png"));
/// assert_eq!(host.path(&Style::new("medium")), None);
/// assert_eq!(host.original_filename().as_deref(), Some("image.png"));
/// ```
#[derive(Default)]
pub struct StaticHost {
    filename: Option<String>,
    paths: HashMap<Style, String>,
    any_style: Option<String>,
    on_flush: Option<FlushHook>,
}

impl StaticHost {
    /// Creates a host with no filename and no paths
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host for a single file addressed directly by its storage path
    ///
    /// The path answers for every style and also stands in as the filename.
    #[must_use]
    pub fn for_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            filename: Some(path.clone()),
            any_style: Some(path),
            ..Self::default()
        }
    }

    /// Sets the assigned filename
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Maps `style` to `path`
    #[must_use]
    pub fn with_path(mut self, style: impl Into<Style>, path: impl Into<String>) -> Self {
        self.paths.insert(style.into(), path.into());
        self
    }

    /// Runs `hook` after each successful write flush
    #[must_use]
    pub fn on_flush_writes(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_flush = Some(Box::new(hook));
        self
    }
}

impl AttachmentHost for StaticHost {
    fn original_filename(&self) -> Option<String> {
        self.filename.clone()
    }

    fn path(&self, style: &Style) -> Option<String> {
        self.paths.get(style).or(self.any_style.as_ref()).cloned()
    }

    fn after_flush_writes(&self) {
        if let Some(hook) = &self.on_flush {
            hook();
        }
    }
}

impl fmt::Debug for StaticHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticHost")
            .field("filename", &self.filename)
            .field("paths", &self.paths)
            .field("any_style", &self.any_style)
            .field("on_flush", &self.on_flush.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_paths_by_style() {
        let host = StaticHost::new()
            .with_path("original", "/files/original/image.png")
            .with_path("thumb", "/files/thumb/image.png");

        assert_eq!(
            host.path(&Style::original()).as_deref(),
            Some("/files/original/image.png")
        );
        assert_eq!(
            host.path(&Style::new("thumb")).as_deref(),
            Some("/files/thumb/image.png")
        );
        assert!(host.original_filename().is_none());
    }

    #[test]
    fn test_unmapped_style_has_no_path() {
        let host = StaticHost::new().with_path("original", "/files/original/image.png");
        assert_eq!(host.path(&Style::new("medium")), None);

        // An empty host never resolves to the server root
        assert_eq!(StaticHost::new().path(&Style::original()), None);
    }

    #[test]
    fn test_for_path() {
        let host = StaticHost::for_path("/docs/report.pdf");
        assert_eq!(host.original_filename().as_deref(), Some("/docs/report.pdf"));
        assert_eq!(
            host.path(&Style::new("anything")).as_deref(),
            Some("/docs/report.pdf")
        );
    }

    #[test]
    fn test_flush_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let host = StaticHost::new().on_flush_writes(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        host.after_flush_writes();
        host.after_flush_writes();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // No hook configured is fine
        StaticHost::new().after_flush_writes();
    }
}
