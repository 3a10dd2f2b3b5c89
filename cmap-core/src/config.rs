//! Document session configuration.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::map::{DEFAULT_CONCEPT_SIZE, DEFAULT_LINKING_PHRASE_SIZE};
use crate::Size;

/// Settings for a [`Document`](crate::Document) session.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentConfig {
    /// Maximum number of undo snapshots kept.
    pub history_limit: usize,
    /// Size of concepts created without an explicit size.
    pub concept_size: Size,
    /// Size of new linking phrases.
    pub linking_phrase_size: Size,
    /// Extent of newly created maps.
    pub map_size: Size,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            concept_size: DEFAULT_CONCEPT_SIZE,
            linking_phrase_size: DEFAULT_LINKING_PHRASE_SIZE,
            map_size: Size::new(800.0, 600.0),
        }
    }

    /// Set the undo depth limit.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
