//! Thread-safe handle to a [`Document`].
//!
//! The model has a single writer. Callers on other threads (an autosave
//! timer, a file watcher) go through [`SharedDocument`], whose one mutex
//! guards the map and its history together.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{ConceptMap, Document, MapResult};

/// Cloneable, mutex-guarded [`Document`].
///
/// # Example
///
/// ```
/// use cmap_core::{Document, SharedDocument};
///
/// let shared = SharedDocument::new(Document::default());
/// let worker = shared.clone();
///
/// let id = worker
///     .edit(|map| Ok(map.add_concept("Water", 10.0, 10.0, None, None)))
///     .unwrap();
/// assert!(shared.read(|doc| doc.map().node(&id).is_some()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    /// Wrap a document.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure with shared access to the document.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.lock())
    }

    /// Run a closure with exclusive access to the whole session.
    pub fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.lock())
    }

    /// Apply an undoable edit.
    ///
    /// # Errors
    ///
    /// Returns the edit's error; see [`Document::edit`].
    pub fn edit<T, F>(&self, f: F) -> MapResult<T>
    where
        F: FnOnce(&mut ConceptMap) -> MapResult<T>,
    {
        self.lock().edit(f)
    }

    /// Undo the last edit.
    pub fn undo(&self) -> bool {
        self.lock().undo()
    }

    /// Redo the last undone edit.
    pub fn redo(&self) -> bool {
        self.lock().redo()
    }

    /// Copy of the current map.
    #[must_use]
    pub fn snapshot(&self) -> ConceptMap {
        self.lock().map().clone()
    }

    /// Save only if there are unsaved edits.
    ///
    /// Returns the path written, or `None` if nothing needed saving.
    ///
    /// # Errors
    ///
    /// See [`Document::save`].
    pub fn save_if_modified(&self) -> MapResult<Option<PathBuf>> {
        let mut doc = self.lock();
        if !doc.has_unsaved_changes() {
            return Ok(None);
        }
        doc.save().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_edits_from_threads_serialize() {
        let shared = SharedDocument::default();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let worker = shared.clone();
                thread::spawn(move || {
                    worker
                        .edit(|m| Ok(m.add_concept(&format!("C{i}"), 0.0, 0.0, None, None)))
                        .expect("add");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(shared.snapshot().node_count(), 4);
        assert_eq!(shared.read(|doc| doc.history().undo_depth()), 4);
    }

    #[test]
    fn test_undo_through_handle() {
        let shared = SharedDocument::default();
        shared
            .edit(|m| Ok(m.add_concept("A", 0.0, 0.0, None, None)))
            .expect("add");
        assert!(shared.undo());
        assert!(shared.snapshot().is_empty());
        assert!(shared.redo());
        assert_eq!(shared.snapshot().node_count(), 1);
    }

    #[test]
    fn test_save_if_modified_skips_clean_document() {
        let shared = SharedDocument::default();
        assert!(matches!(shared.save_if_modified(), Ok(None)));
    }

    #[test]
    fn test_save_if_modified_writes_to_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("autosave.cxl");
        let shared = SharedDocument::default();
        shared
            .update(|doc| doc.save_as(&path))
            .expect("initial save");
        shared
            .edit(|m| Ok(m.add_concept("A", 0.0, 0.0, None, None)))
            .expect("add");
        let written = shared.save_if_modified().expect("save");
        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert!(matches!(shared.save_if_modified(), Ok(None)));
    }
}
