//! Pending write and delete queues
//!
//! The host fills these between flushes; the adapter drains them entry by
//! entry and only removes an entry once every server has applied it.

use super::types::{PendingSource, Style};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;

/// Styles waiting to be written, in insertion order
#[derive(Default)]
pub struct WriteQueue {
    entries: IndexMap<Style, Box<dyn PendingSource>>,
}

impl WriteQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `source` for `style`
    ///
    /// Re-queuing a style replaces its handle and keeps its position.
    pub fn insert(&mut self, style: Style, source: Box<dyn PendingSource>) {
        self.entries.insert(style, source);
    }

    /// The oldest entry
    pub fn front_mut(&mut self) -> Option<(&Style, &mut Box<dyn PendingSource>)> {
        self.entries.first_mut()
    }

    /// Drops the oldest entry
    pub fn pop_front(&mut self) -> Option<Style> {
        self.entries.shift_remove_index(0).map(|(style, _)| style)
    }

    /// Queued styles, oldest first
    pub fn styles(&self) -> impl Iterator<Item = &Style> {
        self.entries.keys()
    }

    /// Whether `style` is queued
    #[must_use]
    pub fn contains(&self, style: &str) -> bool {
        self.entries.contains_key(style)
    }

    /// Number of queued entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// Storage paths waiting to be deleted, in insertion order
#[derive(Debug, Default, Clone)]
pub struct DeleteQueue {
    paths: VecDeque<String>,
}

impl DeleteQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a path
    pub fn push(&mut self, path: impl Into<String>) {
        self.paths.push_back(path.into());
    }

    /// The oldest path
    #[must_use]
    pub fn front(&self) -> Option<&str> {
        self.paths.front().map(String::as_str)
    }

    /// Drops the oldest path
    pub fn pop_front(&mut self) -> Option<String> {
        self.paths.pop_front()
    }

    /// Queued paths, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Number of queued paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Discards every path
    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

impl<S: Into<String>> Extend<S> for DeleteQueue {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.paths.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(data: &[u8]) -> Box<dyn PendingSource> {
        Box::new(Cursor::new(data.to_vec()))
    }

    #[test]
    fn test_write_queue_keeps_insertion_order() {
        let mut queue = WriteQueue::new();
        queue.insert(Style::new("original"), source(b"o"));
        queue.insert(Style::new("thumb"), source(b"t"));
        queue.insert(Style::new("medium"), source(b"m"));

        let styles: Vec<&str> = queue.styles().map(Style::as_str).collect();
        assert_eq!(styles, vec!["original", "thumb", "medium"]);
        assert_eq!(queue.front_mut().map(|(s, _)| s.clone()), Some(Style::original()));
    }

    #[test]
    fn test_write_queue_requeue_replaces_in_place() {
        let mut queue = WriteQueue::new();
        queue.insert(Style::new("original"), source(b"first"));
        queue.insert(Style::new("thumb"), source(b"t"));
        queue.insert(Style::new("original"), source(b"second"));

        assert_eq!(queue.len(), 2);
        assert!(queue.contains("original"));
        assert_eq!(queue.pop_front(), Some(Style::original()));
        assert_eq!(queue.pop_front(), Some(Style::new("thumb")));
        assert!(queue.is_empty());
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_delete_queue_fifo() {
        let mut queue = DeleteQueue::new();
        queue.push("/files/original/image.png");
        queue.extend(["/files/thumb/image.png"]);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front(), Some("/files/original/image.png"));
        assert_eq!(
            queue.pop_front().as_deref(),
            Some("/files/original/image.png")
        );
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["/files/thumb/image.png"]);

        queue.clear();
        assert!(queue.is_empty());
    }
}
