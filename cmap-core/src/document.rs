//! An open concept map: model, undo history and file state together.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    ClipboardPayload, ConceptMap, CxlDocument, Dialect, DocumentConfig, History, MapResult,
    NodeId,
};

/// One editing session over one concept map.
///
/// All edits go through [`Document::edit`], which records an undo snapshot
/// when the edit succeeds and leaves the map untouched when it fails.
#[derive(Debug, Clone)]
pub struct Document {
    map: ConceptMap,
    history: History,
    file: CxlDocument,
    config: DocumentConfig,
    /// Whether there are edits not yet written to disk.
    has_unsaved_changes: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}

impl Document {
    /// Start a blank appearance-dialect map.
    #[must_use]
    pub fn new(config: DocumentConfig) -> Self {
        let file = CxlDocument::new_map(config.map_size.width, config.map_size.height);
        let map = file
            .read_map()
            .unwrap_or_else(|_| ConceptMap::new(config.map_size.width, config.map_size.height));
        Self::assemble(file, map, config)
    }

    /// Open a CXL file.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Persistence`](crate::MapError::Persistence) or
    /// [`MapError::Parse`](crate::MapError::Parse) if the file cannot be loaded.
    pub fn open(path: impl AsRef<Path>, config: DocumentConfig) -> MapResult<Self> {
        let (file, map) = CxlDocument::load(path)?;
        Ok(Self::assemble(file, map, config))
    }

    /// Replace this session's content with a file.
    ///
    /// On failure the current map and history are left as they were.
    ///
    /// # Errors
    ///
    /// Same as [`Document::open`].
    pub fn reload_from(&mut self, path: impl AsRef<Path>) -> MapResult<()> {
        let (file, map) = CxlDocument::load(path)?;
        *self = Self::assemble(file, map, self.config.clone());
        Ok(())
    }

    fn assemble(file: CxlDocument, map: ConceptMap, config: DocumentConfig) -> Self {
        let map = map.with_node_sizes(config.concept_size, config.linking_phrase_size);
        Self {
            map,
            history: History::new(config.history_limit),
            file,
            config,
            has_unsaved_changes: false,
        }
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// The current map.
    #[must_use]
    pub const fn map(&self) -> &ConceptMap {
        &self.map
    }

    /// Apply an edit as one undoable step.
    ///
    /// # Errors
    ///
    /// Returns the edit's error; the map is restored and no snapshot is kept.
    pub fn edit<T, F>(&mut self, f: F) -> MapResult<T>
    where
        F: FnOnce(&mut ConceptMap) -> MapResult<T>,
    {
        let before = self.map.clone();
        match f(&mut self.map) {
            Ok(value) => {
                let token = self.history.push(before);
                self.has_unsaved_changes = true;
                debug!("Edit recorded at undo depth {}", token.depth());
                Ok(value)
            }
            Err(e) => {
                self.map = before;
                debug!("Edit rejected: {e}");
                Err(e)
            }
        }
    }

    /// Undo the last edit. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.map);
        self.has_unsaved_changes |= undone;
        undone
    }

    /// Redo the last undone edit. Returns `false` if there was none.
    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.map);
        self.has_unsaved_changes |= redone;
        redone
    }

    /// Undo/redo state.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Copy nodes (and the connections among them) to a clipboard payload.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`](crate::MapError::UnknownNode) if a
    /// selected node does not exist.
    pub fn copy(&self, selection: &[NodeId]) -> MapResult<ClipboardPayload> {
        ClipboardPayload::copy(&self.map, selection)
    }

    /// Paste a payload offset by `(dx, dy)` as one undoable step.
    pub fn paste(&mut self, payload: &ClipboardPayload, dx: f64, dy: f64) -> Vec<NodeId> {
        if payload.nodes.is_empty() {
            return Vec::new();
        }
        let before = self.map.clone();
        let pasted = payload.paste_into(&mut self.map, dx, dy);
        let token = self.history.push(before);
        self.has_unsaved_changes = true;
        debug!(
            "Pasted {} nodes at undo depth {}",
            pasted.len(),
            token.depth()
        );
        pasted
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Save to the file the map was loaded from or last saved to.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MissingPath`](crate::MapError::MissingPath) for a
    /// never-saved map, and
    /// [`MapError::Persistence`](crate::MapError::Persistence) on write failure.
    pub fn save(&mut self) -> MapResult<PathBuf> {
        let path = self.file.save(&self.map, None)?;
        self.has_unsaved_changes = false;
        Ok(path)
    }

    /// Save to `path`, which becomes the document's location.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Persistence`](crate::MapError::Persistence) on
    /// write failure.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> MapResult<PathBuf> {
        let path = self.file.save(&self.map, Some(path.as_ref()))?;
        self.has_unsaved_changes = false;
        info!("Document now at {}", path.display());
        Ok(path)
    }

    /// The current map as CXL text, without touching the disk.
    #[must_use]
    pub fn to_cxl_string(&mut self) -> String {
        self.file.render(&self.map)
    }

    /// Dialect the document saves in.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.file.dialect()
    }

    /// Current file location, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.file.path()
    }

    /// Whether there are edits not yet saved.
    #[must_use]
    pub const fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &DocumentConfig {
        &self.config
    }
}
