//! The concept map graph: nodes, connections and default styles.
//!
//! All mutation goes through [`ConceptMap`] methods. Each method validates its
//! references before touching anything, so a rejected call leaves the map
//! exactly as it was.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::anchor::{
    anchor_in_document, closest_anchor_pair, nearest_anchor_index, AnchorIndex, Point, Rect, Size,
};
use crate::{
    Connection, ConnectionId, DefaultStyles, Endpoint, MapError, MapResult, Node, NodeId,
    NodeKind, ResolvedStyle, Style, TextMetrics,
};

/// Label given to concepts created or relabelled with empty text.
pub const CONCEPT_PLACEHOLDER: &str = "????";

/// Default size of a new concept.
pub const DEFAULT_CONCEPT_SIZE: Size = Size::new(120.0, 60.0);

/// Default size of a new linking phrase.
pub const DEFAULT_LINKING_PHRASE_SIZE: Size = Size::new(90.0, 20.0);

/// Result of [`ConceptMap::insert_linking_phrase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInsertion {
    /// The new linking phrase.
    pub linker: NodeId,
    /// Connection `from -> linker`.
    pub incoming: ConnectionId,
    /// Connection `linker -> to`.
    pub outgoing: ConnectionId,
}

/// Result of [`ConceptMap::delete_node`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRemoval {
    /// The removed node.
    pub node: Node,
    /// Connections removed with it.
    pub connections: Vec<Connection>,
    /// Direct connection created in place of `source -> linker -> target`.
    pub bridge: Option<ConnectionId>,
}

/// A logical relation read off the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposition {
    /// Source concept.
    pub source: NodeId,
    /// Linking phrase between them, absent for direct links.
    pub linker: Option<NodeId>,
    /// Target concept.
    pub target: NodeId,
}

/// A concept map document model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMap {
    /// All nodes, indexed by ID.
    nodes: HashMap<NodeId, Node>,
    /// Node IDs in document order (later entries draw on top).
    order: Vec<NodeId>,
    /// Connections in document order.
    connections: Vec<Connection>,
    /// Document-scope style defaults.
    defaults: DefaultStyles,
    /// Size given to concepts created without one.
    concept_size: Size,
    /// Size given to new linking phrases.
    linking_phrase_size: Size,
    /// Map extent width.
    pub width: f64,
    /// Map extent height.
    pub height: f64,
}

impl Default for ConceptMap {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl ConceptMap {
    /// Create an empty map with the given extent.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            connections: Vec::new(),
            defaults: DefaultStyles::default(),
            concept_size: DEFAULT_CONCEPT_SIZE,
            linking_phrase_size: DEFAULT_LINKING_PHRASE_SIZE,
            width,
            height,
        }
    }

    /// Override the sizes used for new nodes.
    #[must_use]
    pub fn with_node_sizes(mut self, concept: Size, linking_phrase: Size) -> Self {
        self.concept_size = concept;
        self.linking_phrase_size = linking_phrase;
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get a node by ID.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Get a connection by ID.
    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == *id)
    }

    /// All connections in document order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections with either end on `node`.
    pub fn connections_touching<'a>(
        &'a self,
        node: &'a NodeId,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.touches(node))
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether the map has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Document-scope default styles.
    #[must_use]
    pub fn defaults(&self) -> &DefaultStyles {
        &self.defaults
    }

    /// Default record for a node kind.
    #[must_use]
    pub fn default_style(&self, kind: NodeKind) -> &ResolvedStyle {
        match kind {
            NodeKind::Concept => &self.defaults.concept,
            NodeKind::LinkingPhrase => &self.defaults.linking_phrase,
        }
    }

    /// Effective style of a node.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn effective_style(&self, id: &NodeId) -> MapResult<ResolvedStyle> {
        let node = self.require_node(id)?;
        Ok(node.style.resolve(self.default_style(node.kind)))
    }

    /// Document positions of a connection's two endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownConnection`] if the connection does not exist.
    pub fn endpoints(&self, id: &ConnectionId) -> MapResult<(Point, Point)> {
        let conn = self
            .connection(id)
            .ok_or_else(|| MapError::UnknownConnection(id.clone()))?;
        let from = self.require_node(&conn.from)?;
        let to = self.require_node(&conn.to)?;
        Ok((
            anchor_in_document(&from.bounds, conn.from_anchor),
            anchor_in_document(&to.bounds, conn.to_anchor),
        ))
    }

    /// The topmost node containing a document point.
    #[must_use]
    pub fn node_at(&self, point: Point) -> Option<&NodeId> {
        self.order
            .iter()
            .rev()
            .find(|id| self.nodes.get(*id).is_some_and(|n| n.bounds.contains(point)))
    }

    /// Logical relations between concepts.
    ///
    /// Each linking phrase yields one proposition per (incoming concept,
    /// outgoing concept) pair; direct concept-to-concept connections yield
    /// one each.
    #[must_use]
    pub fn propositions(&self) -> Vec<Proposition> {
        let is_concept = |id: &NodeId| {
            self.nodes
                .get(id)
                .is_some_and(|n| n.kind == NodeKind::Concept)
        };
        let mut out = Vec::new();
        for linker in self.nodes().filter(|n| n.is_linker()) {
            let sources = self
                .connections
                .iter()
                .filter(|c| c.to == linker.id && is_concept(&c.from));
            for incoming in sources {
                let targets = self
                    .connections
                    .iter()
                    .filter(|c| c.from == linker.id && is_concept(&c.to));
                for outgoing in targets {
                    out.push(Proposition {
                        source: incoming.from.clone(),
                        linker: Some(linker.id.clone()),
                        target: outgoing.to.clone(),
                    });
                }
            }
        }
        for conn in &self.connections {
            if is_concept(&conn.from) && is_concept(&conn.to) {
                out.push(Proposition {
                    source: conn.from.clone(),
                    linker: None,
                    target: conn.to.clone(),
                });
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Node operations
    // -----------------------------------------------------------------------

    /// Add a concept. Empty labels are replaced with [`CONCEPT_PLACEHOLDER`].
    pub fn add_concept(
        &mut self,
        label: &str,
        x: f64,
        y: f64,
        size: Option<Size>,
        style: Option<Style>,
    ) -> NodeId {
        let label = if label.is_empty() {
            CONCEPT_PLACEHOLDER
        } else {
            label
        };
        let size = size.unwrap_or(self.concept_size);
        let node = Node::new(
            NodeKind::Concept,
            label,
            Rect::new(x, y, size.width, size.height),
        )
        .with_style(style.unwrap_or_default());
        tracing::debug!("Add concept {} {label:?} at ({x}, {y})", node.id);
        self.insert_node(node)
    }

    /// Add a free linking phrase. Labels may be empty.
    pub fn add_linking_phrase(&mut self, label: &str, x: f64, y: f64) -> NodeId {
        let size = self.linking_phrase_size;
        let node = Node::new(
            NodeKind::LinkingPhrase,
            label,
            Rect::new(x, y, size.width, size.height),
        );
        tracing::debug!("Add linking phrase {} {label:?} at ({x}, {y})", node.id);
        self.insert_node(node)
    }

    /// Move a node's top-left corner. Connections follow through their anchors.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn move_node(&mut self, id: &NodeId, x: f64, y: f64) -> MapResult<()> {
        let node = self.require_node_mut(id)?;
        node.bounds.x = x;
        node.bounds.y = y;
        tracing::debug!("Move node {id} to ({x}, {y})");
        Ok(())
    }

    /// Resize a node, clamped to the minimum reported by `metrics`.
    ///
    /// Returns the size actually applied.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn resize_node(
        &mut self,
        id: &NodeId,
        size: Size,
        metrics: &dyn TextMetrics,
    ) -> MapResult<Size> {
        let style = self.effective_style(id)?;
        let node = self.require_node_mut(id)?;
        let minimum = metrics.minimum_size(&node.label, &style);
        let applied = size.max(minimum);
        if applied != size {
            tracing::debug!("Resize of {id} clamped to {applied:?}");
        }
        node.bounds.width = applied.width;
        node.bounds.height = applied.height;
        Ok(applied)
    }

    /// Change a node's label, growing the node if the text no longer fits.
    ///
    /// Empty text on a concept is replaced with [`CONCEPT_PLACEHOLDER`];
    /// returns `true` when that substitution happened.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn relabel(
        &mut self,
        id: &NodeId,
        text: &str,
        metrics: &dyn TextMetrics,
    ) -> MapResult<bool> {
        let style = self.effective_style(id)?;
        let node = self.require_node_mut(id)?;
        let substituted = text.is_empty() && node.kind == NodeKind::Concept;
        node.label = if substituted {
            CONCEPT_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        };
        let minimum = metrics.minimum_size(&node.label, &style);
        let grown = node.bounds.size().max(minimum);
        node.bounds.width = grown.width;
        node.bounds.height = grown.height;
        tracing::debug!("Relabel {id} to {:?}", node.label);
        Ok(substituted)
    }

    /// Delete a node and cascade to its connections.
    ///
    /// A linking phrase with exactly one incoming and one outgoing connection
    /// (`source -> linker -> target`) is bridged: both connections are
    /// replaced by a direct `source -> target` connection with the default
    /// arrow policy. Any other node simply loses every connection touching it.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn delete_node(&mut self, id: &NodeId) -> MapResult<NodeRemoval> {
        let kind = self.require_node(id)?.kind;
        let bridge_ends = if kind == NodeKind::LinkingPhrase {
            self.bridge_ends(id)
        } else {
            None
        };

        let (removed, kept): (Vec<Connection>, Vec<Connection>) =
            std::mem::take(&mut self.connections)
                .into_iter()
                .partition(|c| c.touches(id));
        self.connections = kept;
        self.order.retain(|n| n != id);
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| MapError::UnknownNode(id.clone()))?;

        let bridge = bridge_ends.map(|(source, target)| {
            let anchors = self.auto_anchors(&source, &target);
            let conn = Connection::new(source, target, anchors);
            let conn_id = conn.id.clone();
            self.connections.push(conn);
            conn_id
        });

        tracing::debug!(
            "Deleted node {id} with {} connections{}",
            removed.len(),
            if bridge.is_some() { " (bridged)" } else { "" }
        );
        Ok(NodeRemoval {
            node,
            connections: removed,
            bridge,
        })
    }

    /// Replace a node's pinned style attributes with those set in `patch`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn set_node_style(&mut self, id: &NodeId, patch: &Style) -> MapResult<()> {
        self.require_node_mut(id)?.style.merge(patch);
        tracing::debug!("Pinned style on {id}: {patch:?}");
        Ok(())
    }

    /// Unpin every style attribute so the node follows the defaults again.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if the node does not exist.
    pub fn reset_node_style(&mut self, id: &NodeId) -> MapResult<()> {
        self.require_node_mut(id)?.style = Style::default();
        Ok(())
    }

    /// Replace the default record for a node kind.
    ///
    /// Takes effect on every node that has not pinned the attribute.
    pub fn set_default_style(&mut self, kind: NodeKind, style: ResolvedStyle) {
        match kind {
            NodeKind::Concept => self.defaults.concept = style,
            NodeKind::LinkingPhrase => self.defaults.linking_phrase = style,
        }
    }

    /// Replace both default records.
    pub fn set_defaults(&mut self, defaults: DefaultStyles) {
        self.defaults = defaults;
    }

    // -----------------------------------------------------------------------
    // Connection operations
    // -----------------------------------------------------------------------

    /// Connect two concepts directly.
    ///
    /// Missing anchors are computed with [`closest_anchor_pair`].
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] for an unknown endpoint, and
    /// [`MapError::InvalidOperation`] for a self-connection or when either
    /// endpoint is a linking phrase (those only join through
    /// [`ConceptMap::insert_linking_phrase`]).
    pub fn connect(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        from_anchor: Option<AnchorIndex>,
        to_anchor: Option<AnchorIndex>,
    ) -> MapResult<ConnectionId> {
        let source = self.require_node(from)?;
        let target = self.require_node(to)?;
        if from == to {
            return Err(MapError::InvalidOperation(format!(
                "cannot connect node {from} to itself"
            )));
        }
        if source.is_linker() || target.is_linker() {
            return Err(MapError::InvalidOperation(
                "linking phrases are connected through insert_linking_phrase".to_string(),
            ));
        }
        let (auto_from, auto_to) = self.auto_anchors(from, to);
        let conn = Connection::new(
            from.clone(),
            to.clone(),
            (
                from_anchor.unwrap_or(auto_from),
                to_anchor.unwrap_or(auto_to),
            ),
        );
        let id = conn.id.clone();
        tracing::debug!("Connect {from} -> {to} as {id}");
        self.connections.push(conn);
        Ok(id)
    }

    /// Put a new linking phrase between two concepts.
    ///
    /// The linking phrase is centred on the midpoint of the two node centres
    /// and joined as `from -> linker` (no arrow) and `linker -> to` (arrow at
    /// the end). Existing connections are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] for an unknown endpoint and
    /// [`MapError::InvalidOperation`] if the endpoints are equal or either is
    /// a linking phrase.
    pub fn insert_linking_phrase(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        label: &str,
    ) -> MapResult<LinkInsertion> {
        let source = self.require_node(from)?;
        let target = self.require_node(to)?;
        if from == to {
            return Err(MapError::InvalidOperation(format!(
                "cannot link node {from} to itself"
            )));
        }
        if source.is_linker() || target.is_linker() {
            return Err(MapError::InvalidOperation(
                "linking phrases cannot be chained".to_string(),
            ));
        }
        let (a, b) = (source.bounds.center(), target.bounds.center());
        let size = self.linking_phrase_size;
        let x = (a.x + b.x) / 2.0 - size.width / 2.0;
        let y = (a.y + b.y) / 2.0 - size.height / 2.0;

        let linker = self.insert_node(Node::new(
            NodeKind::LinkingPhrase,
            label,
            Rect::new(x, y, size.width, size.height),
        ));
        let incoming = Connection::new(from.clone(), linker.clone(), self.auto_anchors(from, &linker))
            .with_arrows(false, false);
        let outgoing = Connection::new(linker.clone(), to.clone(), self.auto_anchors(&linker, to))
            .with_arrows(false, true);
        let result = LinkInsertion {
            linker,
            incoming: incoming.id.clone(),
            outgoing: outgoing.id.clone(),
        };
        self.connections.push(incoming);
        self.connections.push(outgoing);
        tracing::debug!(
            "Inserted linking phrase {} {label:?} between {from} and {to}",
            result.linker
        );
        Ok(result)
    }

    /// Create a concept at a drop point and connect it from `from`.
    ///
    /// With `linker` set the two are joined through a new linking phrase,
    /// otherwise directly.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if `from` does not exist and
    /// [`MapError::InvalidOperation`] if it is a linking phrase.
    pub fn add_connected_concept(
        &mut self,
        from: &NodeId,
        label: &str,
        x: f64,
        y: f64,
        linker: Option<&str>,
    ) -> MapResult<NodeId> {
        if self.require_node(from)?.is_linker() {
            return Err(MapError::InvalidOperation(
                "new concepts are extended from concepts".to_string(),
            ));
        }
        let concept = self.add_concept(label, x, y, None, None);
        match linker {
            Some(text) => {
                self.insert_linking_phrase(from, &concept, text)?;
            }
            None => {
                self.connect(from, &concept, None, None)?;
            }
        }
        Ok(concept)
    }

    /// Remove a connection. No cascading.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownConnection`] if the connection does not exist.
    pub fn delete_connection(&mut self, id: &ConnectionId) -> MapResult<Connection> {
        let pos = self
            .connections
            .iter()
            .position(|c| c.id == *id)
            .ok_or_else(|| MapError::UnknownConnection(id.clone()))?;
        tracing::debug!("Deleted connection {id}");
        Ok(self.connections.remove(pos))
    }

    /// Re-anchor one end of a connection.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownConnection`] if the connection does not
    /// exist and [`MapError::InvalidAnchor`] if `index` is outside `[0, 24)`.
    pub fn set_anchor(&mut self, id: &ConnectionId, end: Endpoint, index: usize) -> MapResult<()> {
        let anchor = AnchorIndex::new(index)?;
        let conn = self.require_connection_mut(id)?;
        match end {
            Endpoint::Source => conn.from_anchor = anchor,
            Endpoint::Target => conn.to_anchor = anchor,
        }
        tracing::debug!("Anchor {end:?} of {id} set to {anchor}");
        Ok(())
    }

    /// Re-anchor one end of a connection to the anchor nearest a dropped point.
    ///
    /// Returns the chosen anchor.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownConnection`] if the connection does not exist.
    pub fn snap_anchor(
        &mut self,
        id: &ConnectionId,
        end: Endpoint,
        point: Point,
    ) -> MapResult<AnchorIndex> {
        let conn = self
            .connection(id)
            .ok_or_else(|| MapError::UnknownConnection(id.clone()))?;
        let node = self.require_node(conn.node_at(end))?;
        let anchor = nearest_anchor_index(&node.bounds, point);
        self.set_anchor(id, end, anchor.get())?;
        Ok(anchor)
    }

    // -----------------------------------------------------------------------
    // Crate-internal construction (loaders, clipboard)
    // -----------------------------------------------------------------------

    /// Insert a fully built node, keeping document order.
    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        if self.nodes.insert(id.clone(), node).is_none() {
            self.order.push(id.clone());
        }
        id
    }

    /// Mutable node access for loaders filling in geometry and style.
    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Insert a connection read from a document or payload.
    ///
    /// Only referential integrity is checked; linking phrase topology in
    /// files is accepted as found.
    pub(crate) fn insert_connection(&mut self, conn: Connection) -> MapResult<()> {
        self.require_node(&conn.from)?;
        self.require_node(&conn.to)?;
        if conn.from == conn.to {
            return Err(MapError::InvalidOperation(format!(
                "connection {} loops on {}",
                conn.id, conn.from
            )));
        }
        if self.connection(&conn.id).is_some() {
            return Err(MapError::InvalidOperation(format!(
                "duplicate connection id {}",
                conn.id
            )));
        }
        self.connections.push(conn);
        Ok(())
    }

    /// Closest anchors between two existing nodes.
    pub(crate) fn auto_anchors(&self, from: &NodeId, to: &NodeId) -> (AnchorIndex, AnchorIndex) {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(a), Some(b)) => closest_anchor_pair(&a.bounds, &b.bounds),
            _ => (AnchorIndex::default(), AnchorIndex::default()),
        }
    }

    fn bridge_ends(&self, linker: &NodeId) -> Option<(NodeId, NodeId)> {
        let touching: Vec<&Connection> = self.connections_touching(linker).collect();
        let [a, b] = touching.as_slice() else {
            return None;
        };
        let (incoming, outgoing) = if a.to == *linker && b.from == *linker {
            (a, b)
        } else if b.to == *linker && a.from == *linker {
            (b, a)
        } else {
            return None;
        };
        (incoming.from != outgoing.to).then(|| (incoming.from.clone(), outgoing.to.clone()))
    }

    fn require_node(&self, id: &NodeId) -> MapResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| MapError::UnknownNode(id.clone()))
    }

    fn require_node_mut(&mut self, id: &NodeId) -> MapResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| MapError::UnknownNode(id.clone()))
    }

    fn require_connection_mut(&mut self, id: &ConnectionId) -> MapResult<&mut Connection> {
        self.connections
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| MapError::UnknownConnection(id.clone()))
    }
}
