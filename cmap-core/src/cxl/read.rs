//! CXL to [`ConceptMap`].
//!
//! Both dialects share the three topology lists. Geometry and style come from
//! the appearance lists or from the legacy `style-list`, depending on the
//! dialect detected at load time.

use std::collections::HashMap;

use tracing::warn;

use super::xml::XmlElement;
use super::Dialect;
use crate::anchor::{aligned_anchor, closest_anchor_pair};
use crate::map::{DEFAULT_CONCEPT_SIZE, DEFAULT_LINKING_PHRASE_SIZE};
use crate::{
    AnchorIndex, Color, ConceptMap, Connection, ConnectionId, DefaultStyles, Node, NodeId,
    NodeKind, Rect, Side, Style,
};

/// Position given to nodes that have no geometry in the file.
const FALLBACK_ORIGIN: (f64, f64) = (100.0, 100.0);

/// Build the model from a `map` element.
pub(crate) fn read_map(map_el: &XmlElement, dialect: Dialect) -> ConceptMap {
    let width = number_attr(map_el, "width").unwrap_or(800.0);
    let height = number_attr(map_el, "height").unwrap_or(600.0);
    let mut map = ConceptMap::new(width, height);

    if dialect == Dialect::Appearance {
        map.set_defaults(read_style_sheet(map_el));
    }

    read_nodes(&mut map, map_el, "concept-list/concept", NodeKind::Concept);
    read_nodes(
        &mut map,
        map_el,
        "linking-phrase-list/linking-phrase",
        NodeKind::LinkingPhrase,
    );

    match dialect {
        Dialect::Appearance => {
            read_appearances(&mut map, map_el, "concept-appearance-list/concept-appearance");
            read_appearances(
                &mut map,
                map_el,
                "linking-phrase-appearance-list/linking-phrase-appearance",
            );
        }
        Dialect::Legacy => read_legacy_styles(&mut map, map_el),
    }

    let hints: HashMap<&str, &XmlElement> = if dialect == Dialect::Appearance {
        map_el
            .select("connection-appearance-list/connection-appearance")
            .into_iter()
            .filter_map(|el| el.attr("id").map(|id| (id, el)))
            .collect()
    } else {
        HashMap::new()
    };
    read_connections(&mut map, map_el, &hints);
    map
}

fn read_nodes(map: &mut ConceptMap, map_el: &XmlElement, path: &str, kind: NodeKind) {
    let size = match kind {
        NodeKind::Concept => DEFAULT_CONCEPT_SIZE,
        NodeKind::LinkingPhrase => DEFAULT_LINKING_PHRASE_SIZE,
    };
    for el in map_el.select(path) {
        let id = el.attr("id").map_or_else(NodeId::new, NodeId::from_raw);
        if map.node(&id).is_some() {
            warn!("Duplicate node id {id}, keeping the first");
            continue;
        }
        let label = el.attr("label").unwrap_or_default();
        let bounds = Rect::new(FALLBACK_ORIGIN.0, FALLBACK_ORIGIN.1, size.width, size.height);
        map.insert_node(Node::new(kind, label, bounds).with_id(id));
    }
}

// ---------------------------------------------------------------------------
// Appearance dialect
// ---------------------------------------------------------------------------

fn read_style_sheet(map_el: &XmlElement) -> DefaultStyles {
    let mut defaults = DefaultStyles::default();
    let Some(sheet) = map_el.select("style-sheet-list/style-sheet").into_iter().next() else {
        return defaults;
    };
    if let Some(el) = sheet.child("concept-style") {
        defaults.concept = appearance_style(el).resolve(&defaults.concept);
    }
    if let Some(el) = sheet.child("linking-phrase-style") {
        defaults.linking_phrase = appearance_style(el).resolve(&defaults.linking_phrase);
    }
    defaults
}

fn read_appearances(map: &mut ConceptMap, map_el: &XmlElement, path: &str) {
    for el in map_el.select(path) {
        let Some(id) = el.attr("id").map(NodeId::from_raw) else {
            continue;
        };
        let Some(node) = map.node_mut(&id) else {
            warn!("Appearance for unknown node {id} ignored");
            continue;
        };
        node.bounds = read_bounds(el, node.bounds);
        node.style = appearance_style(el);
    }
}

/// Style overrides from appearance-dialect attribute names.
pub(crate) fn appearance_style(el: &XmlElement) -> Style {
    let mut style = Style {
        font_family: el.attr("font-name").map(str::to_string),
        font_size: number_attr(el, "font-size"),
        font_color: el.attr("font-color").map(Color::parse),
        fill_color: el.attr("background-color").map(Color::parse),
        border_color: el.attr("border-color").map(Color::parse),
        border_width: number_attr(el, "border-thickness"),
        ..Style::default()
    };
    if let Some(value) = el.attr("font-style") {
        style.set_font_style(value);
    }
    style
}

fn read_connections(map: &mut ConceptMap, map_el: &XmlElement, hints: &HashMap<&str, &XmlElement>) {
    for el in map_el.select("connection-list/connection") {
        let (Some(from), Some(to)) = (el.attr("from-id"), el.attr("to-id")) else {
            warn!("Connection without endpoints skipped");
            continue;
        };
        let (from, to) = (NodeId::from_raw(from), NodeId::from_raw(to));
        let (Some(a), Some(b)) = (map.node(&from), map.node(&to)) else {
            warn!("Connection {from} -> {to} references an unknown node, skipped");
            continue;
        };
        let (auto_from, auto_to) = closest_anchor_pair(&a.bounds, &b.bounds);
        let anchors = match el.attr("id").and_then(|id| hints.get(id)) {
            Some(hint) => (
                hinted_anchor(hint, "from", &a.bounds, &b.bounds, auto_from),
                hinted_anchor(hint, "to", &b.bounds, &a.bounds, auto_to),
            ),
            None => (auto_from, auto_to),
        };
        let arrow_at_end = b.kind == NodeKind::Concept;
        let id = el
            .attr("id")
            .map_or_else(ConnectionId::new, ConnectionId::from_raw);
        let conn = Connection::new(from, to, anchors)
            .with_id(id)
            .with_arrows(false, arrow_at_end);
        if let Err(e) = map.insert_connection(conn) {
            warn!("Connection skipped: {e}");
        }
    }
}

/// Anchor for one end: numeric index, else symbolic side, else `auto`.
fn hinted_anchor(
    hint: &XmlElement,
    end: &str,
    own: &Rect,
    other: &Rect,
    auto: AnchorIndex,
) -> AnchorIndex {
    let index = hint
        .attr(&format!("{end}-index"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .and_then(|i| AnchorIndex::new(i).ok());
    if let Some(index) = index {
        return index;
    }
    match hint.attr(&format!("{end}-pos")).map(str::trim) {
        None | Some("" | "center") => auto,
        Some(name) => match Side::from_name(name) {
            Some(side) => aligned_anchor(own, side, other.center()),
            None => {
                warn!("Unknown anchor position {name:?}, using closest");
                auto
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Legacy dialect
// ---------------------------------------------------------------------------

fn read_legacy_styles(map: &mut ConceptMap, map_el: &XmlElement) {
    for el in map_el.select("style-list/style") {
        let Some(id) = el.attr("object-id").map(NodeId::from_raw) else {
            continue;
        };
        let Some(node) = map.node_mut(&id) else {
            warn!("Style for unknown node {id} ignored");
            continue;
        };
        if let Some(geom) = el.child("geom") {
            node.bounds = read_bounds(geom, node.bounds);
        }
        let mut style = Style::default();
        if let Some(text) = el.child("text") {
            style.font_family = text.attr("font-name").map(str::to_string);
            style.font_size = number_attr(text, "font-size");
            style.font_color = text.attr("color").map(Color::parse);
            if let Some(value) = text.attr("style") {
                style.set_font_style(value);
            }
        }
        if let Some(shape) = el.child("shape") {
            style.fill_color = shape.attr("fill").map(Color::parse);
            style.border_color = shape.attr("border").map(Color::parse);
        }
        node.style = style;
    }
}

// ---------------------------------------------------------------------------
// Attribute helpers
// ---------------------------------------------------------------------------

fn read_bounds(el: &XmlElement, current: Rect) -> Rect {
    Rect::new(
        number_attr(el, "x").unwrap_or(current.x),
        number_attr(el, "y").unwrap_or(current.y),
        number_attr(el, "width").unwrap_or(current.width),
        number_attr(el, "height").unwrap_or(current.height),
    )
}

/// Finite numeric attribute; unparseable values are logged and ignored.
pub(crate) fn number_attr(el: &XmlElement, name: &str) -> Option<f64> {
    let raw = el.attr(name)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!("Ignoring non-numeric {name}={raw:?} on <{}>", el.name);
            None
        }
    }
}
