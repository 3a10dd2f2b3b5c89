//! Map nodes and connections - the building blocks of a concept map.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AnchorIndex, Rect, Style};

/// Unique identifier for a node.
///
/// Ids read from files are kept verbatim; fresh ids are UUIDs, so an id is
/// never handed out twice within a document's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new unique node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id read from a document.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new unique connection ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id read from a document.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A primary labelled idea.
    Concept,
    /// A relation label mediating between two concepts.
    LinkingPhrase,
}

/// A concept or linking phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Concept or linking phrase.
    pub kind: NodeKind,
    /// Label text.
    pub label: String,
    /// Top-left position and size in document coordinates.
    pub bounds: Rect,
    /// Explicitly pinned style attributes.
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
}

impl Node {
    /// Create a node with a fresh id.
    #[must_use]
    pub fn new(kind: NodeKind, label: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            label: label.into(),
            bounds,
            style: Style::default(),
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Set the pinned style.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Whether this node is a linking phrase.
    #[must_use]
    pub fn is_linker(&self) -> bool {
        self.kind == NodeKind::LinkingPhrase
    }
}

/// Which end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// The `from` end.
    Source,
    /// The `to` end.
    Target,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier.
    pub id: ConnectionId,
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Anchor on the source node.
    pub from_anchor: AnchorIndex,
    /// Anchor on the target node.
    pub to_anchor: AnchorIndex,
    /// Arrowhead at the source end.
    pub arrow_at_start: bool,
    /// Arrowhead at the target end.
    pub arrow_at_end: bool,
}

impl Connection {
    /// Create a connection with the default arrow policy (end arrow only).
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, anchors: (AnchorIndex, AnchorIndex)) -> Self {
        Self {
            id: ConnectionId::new(),
            from,
            to,
            from_anchor: anchors.0,
            to_anchor: anchors.1,
            arrow_at_start: false,
            arrow_at_end: true,
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: ConnectionId) -> Self {
        self.id = id;
        self
    }

    /// Set the arrowheads.
    #[must_use]
    pub fn with_arrows(mut self, at_start: bool, at_end: bool) -> Self {
        self.arrow_at_start = at_start;
        self.arrow_at_end = at_end;
        self
    }

    /// Whether either end touches `node`.
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        self.from == *node || self.to == *node
    }

    /// The node at one end.
    #[must_use]
    pub fn node_at(&self, end: Endpoint) -> &NodeId {
        match end {
            Endpoint::Source => &self.from,
            Endpoint::Target => &self.to,
        }
    }

    /// The anchor at one end.
    #[must_use]
    pub const fn anchor_at(&self, end: Endpoint) -> AnchorIndex {
        match end {
            Endpoint::Source => self.from_anchor,
            Endpoint::Target => self.to_anchor,
        }
    }
}
