//! Error types for concept map operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::{ConnectionId, NodeId};

/// Result type for concept map operations.
pub type MapResult<T> = Result<T, MapError>;

/// Direction of a failed file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reading a document from disk.
    Load,
    /// Writing a document to disk.
    Save,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Save => f.write_str("save"),
        }
    }
}

/// Errors that can occur in concept map operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed XML or a document without a `map` element.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Node not found in the map.
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    /// Connection not found in the map.
    #[error("Connection not found: {0}")]
    UnknownConnection(ConnectionId),

    /// The operation would break a graph invariant.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Anchor index outside the 24-point grid.
    #[error("Anchor index {0} out of range 0..24")]
    InvalidAnchor(usize),

    /// Save was requested without a destination path.
    #[error("No destination path configured for save")]
    MissingPath,

    /// File I/O failed.
    #[error("Failed to {direction} {}: {source}", path.display())]
    Persistence {
        /// Whether the document was being loaded or saved.
        direction: Direction,
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Clipboard payload serialization/deserialization error.
    #[error("Clipboard payload error: {0}")]
    Clipboard(#[from] serde_json::Error),
}

impl MapError {
    /// Whether the error rejects a reference to an unknown node or connection.
    #[must_use]
    pub const fn is_reference_error(&self) -> bool {
        matches!(self, Self::UnknownNode(_) | Self::UnknownConnection(_))
    }
}
