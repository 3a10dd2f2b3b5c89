//! Clipboard payload for copy and paste within or across sessions.
//!
//! The payload mirrors the node and connection attribute set. Connections
//! refer to nodes by id; pasting assigns fresh ids and remaps them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    AnchorIndex, ConceptMap, Connection, MapError, MapResult, Node, NodeId, NodeKind, Rect, Style,
};

/// Clipboard form of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardNode {
    /// Id of the node that was copied.
    pub id: String,
    /// Concept or linking phrase.
    pub kind: NodeKind,
    /// Label text.
    pub label: String,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Pinned style attributes.
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
}

impl From<&Node> for ClipboardNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.to_string(),
            kind: node.kind,
            label: node.label.clone(),
            x: node.bounds.x,
            y: node.bounds.y,
            width: node.bounds.width,
            height: node.bounds.height,
            style: node.style.clone(),
        }
    }
}

/// Clipboard form of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardConnection {
    /// Source node id within the payload.
    pub from_id: String,
    /// Target node id within the payload.
    pub to_id: String,
    /// Anchor index on the source, recomputed when absent or invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_anchor: Option<usize>,
    /// Anchor index on the target, recomputed when absent or invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_anchor: Option<usize>,
    /// Arrowhead at the source end.
    #[serde(default)]
    pub arrow_at_start: bool,
    /// Arrowhead at the target end.
    #[serde(default = "ClipboardConnection::default_arrow_at_end")]
    pub arrow_at_end: bool,
}

impl ClipboardConnection {
    const fn default_arrow_at_end() -> bool {
        true
    }
}

impl From<&Connection> for ClipboardConnection {
    fn from(conn: &Connection) -> Self {
        Self {
            from_id: conn.from.to_string(),
            to_id: conn.to.to_string(),
            from_anchor: Some(conn.from_anchor.get()),
            to_anchor: Some(conn.to_anchor.get()),
            arrow_at_start: conn.arrow_at_start,
            arrow_at_end: conn.arrow_at_end,
        }
    }
}

/// Serialized selection: `{nodes: [...], connections: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    /// Copied nodes.
    #[serde(default)]
    pub nodes: Vec<ClipboardNode>,
    /// Connections whose both ends are among the copied nodes.
    #[serde(default)]
    pub connections: Vec<ClipboardConnection>,
}

impl ClipboardPayload {
    /// Copy a selection of nodes and the connections among them.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownNode`] if any id is not in the map.
    pub fn copy(map: &ConceptMap, selection: &[NodeId]) -> MapResult<Self> {
        let mut nodes = Vec::with_capacity(selection.len());
        for id in selection {
            let node = map
                .node(id)
                .ok_or_else(|| MapError::UnknownNode(id.clone()))?;
            nodes.push(ClipboardNode::from(node));
        }
        let connections = map
            .connections()
            .filter(|c| selection.contains(&c.from) && selection.contains(&c.to))
            .map(ClipboardConnection::from)
            .collect();
        Ok(Self { nodes, connections })
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> MapResult<String> {
        serde_json::to_string(self).map_err(MapError::Clipboard)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid payload.
    pub fn from_json(json: &str) -> MapResult<Self> {
        serde_json::from_str(json).map_err(MapError::Clipboard)
    }

    /// Paste into `map`, offset by `(dx, dy)`, with fresh ids.
    ///
    /// Connections whose ends are not both in the payload are dropped.
    /// Returns the new node ids in payload order.
    pub fn paste_into(&self, map: &mut ConceptMap, dx: f64, dy: f64) -> Vec<NodeId> {
        let mut remap: HashMap<&str, NodeId> = HashMap::new();
        let mut pasted = Vec::with_capacity(self.nodes.len());
        for entry in &self.nodes {
            let label = if entry.label.is_empty() && entry.kind == NodeKind::Concept {
                crate::map::CONCEPT_PLACEHOLDER
            } else {
                entry.label.as_str()
            };
            let node = Node::new(
                entry.kind,
                label,
                Rect::new(entry.x + dx, entry.y + dy, entry.width, entry.height),
            )
            .with_style(entry.style.clone());
            let id = map.insert_node(node);
            remap.insert(entry.id.as_str(), id.clone());
            pasted.push(id);
        }

        for entry in &self.connections {
            let (Some(from), Some(to)) = (
                remap.get(entry.from_id.as_str()),
                remap.get(entry.to_id.as_str()),
            ) else {
                tracing::warn!(
                    "Dropping pasted connection {} -> {}: endpoint not in payload",
                    entry.from_id,
                    entry.to_id
                );
                continue;
            };
            let (auto_from, auto_to) = map.auto_anchors(from, to);
            let anchor = |raw: Option<usize>, fallback| {
                raw.and_then(|i| AnchorIndex::new(i).ok()).unwrap_or(fallback)
            };
            let conn = Connection::new(
                from.clone(),
                to.clone(),
                (
                    anchor(entry.from_anchor, auto_from),
                    anchor(entry.to_anchor, auto_to),
                ),
            )
            .with_arrows(entry.arrow_at_start, entry.arrow_at_end);
            if let Err(e) = map.insert_connection(conn) {
                tracing::warn!("Dropping pasted connection: {e}");
            }
        }
        tracing::debug!("Pasted {} nodes", pasted.len());
        pasted
    }
}
