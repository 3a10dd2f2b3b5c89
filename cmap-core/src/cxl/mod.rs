//! CXL file codec.
//!
//! A [`CxlDocument`] keeps the parsed XML tree and the [`Dialect`] it was
//! written in. Loading produces a [`ConceptMap`]; saving writes the map back
//! into the same tree and dialect, so content the model does not cover
//! survives.

mod read;
mod write;
pub mod xml;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use self::xml::{XmlDocument, XmlElement};
use crate::error::Direction;
use crate::{ConceptMap, MapError, MapResult};

/// Namespace of documents created from scratch.
pub const CMAP_NAMESPACE: &str = "http://cmap.ihmc.us/xml/cmap/";

/// Id of the default style sheet.
pub const DEFAULT_STYLE_SHEET_ID: &str = "_Default_";

/// Schema variant of a CXL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Geometry and overrides in `*-appearance-list` elements, defaults in a
    /// style sheet.
    Appearance,
    /// Geometry and style in per-node `style-list/style` elements.
    Legacy,
}

impl Dialect {
    /// Detect the dialect of a `map` element.
    #[must_use]
    pub fn detect(map_el: &XmlElement) -> Self {
        if map_el.child("concept-appearance-list").is_some() {
            Self::Appearance
        } else {
            Self::Legacy
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Appearance => write!(f, "appearance"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// A CXL file as loaded: its XML tree, dialect and location.
#[derive(Debug, Clone, PartialEq)]
pub struct CxlDocument {
    tree: XmlDocument,
    dialect: Dialect,
    path: Option<PathBuf>,
}

impl CxlDocument {
    /// A blank appearance-dialect document with the default style sheet.
    #[must_use]
    pub fn new_map(width: f64, height: f64) -> Self {
        Self {
            tree: skeleton(width, height),
            dialect: Dialect::Appearance,
            path: None,
        }
    }

    /// Parse CXL text.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Parse`] for malformed XML or a missing `map`
    /// element.
    pub fn parse(text: &str) -> MapResult<(Self, ConceptMap)> {
        let tree = XmlDocument::parse(text)?;
        let map_el = map_element(&tree.root)
            .ok_or_else(|| MapError::Parse("no <map> element".to_string()))?;
        let dialect = Dialect::detect(map_el);
        let map = read::read_map(map_el, dialect);
        let doc = Self {
            tree,
            dialect,
            path: None,
        };
        Ok((doc, map))
    }

    /// Load a CXL file.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Persistence`] if the file cannot be read and
    /// [`MapError::Parse`] if its content is not a concept map.
    pub fn load(path: impl AsRef<Path>) -> MapResult<(Self, ConceptMap)> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| MapError::Persistence {
            direction: Direction::Load,
            path: path.to_path_buf(),
            source,
        })?;
        let (mut doc, map) = Self::parse(&text)?;
        doc.path = Some(path.to_path_buf());
        info!(
            "Loaded {} ({} dialect, {} nodes, {} connections)",
            path.display(),
            doc.dialect,
            map.node_count(),
            map.connection_count()
        );
        Ok((doc, map))
    }

    /// The map as described by this document's current tree.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Parse`] if the tree lost its `map` element.
    pub fn read_map(&self) -> MapResult<ConceptMap> {
        let map_el = map_element(&self.tree.root)
            .ok_or_else(|| MapError::Parse("no <map> element".to_string()))?;
        Ok(read::read_map(map_el, self.dialect))
    }

    /// Write `map` into the tree and serialize it.
    #[must_use]
    pub fn render(&mut self, map: &ConceptMap) -> String {
        self.update(map);
        self.tree.to_xml_string()
    }

    /// Write `map` into the tree, then to `path` or the loaded location.
    ///
    /// A successful save to a new path makes it the document's location.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MissingPath`] when neither `path` nor a loaded
    /// location is available, and [`MapError::Persistence`] on write failure.
    pub fn save(&mut self, map: &ConceptMap, path: Option<&Path>) -> MapResult<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .ok_or(MapError::MissingPath)?;
        let text = self.render(map);
        fs::write(&target, text).map_err(|source| MapError::Persistence {
            direction: Direction::Save,
            path: target.clone(),
            source,
        })?;
        info!(
            "Saved {} ({} dialect, {} nodes, {} connections)",
            target.display(),
            self.dialect,
            map.node_count(),
            map.connection_count()
        );
        self.path = Some(target.clone());
        Ok(target)
    }

    /// Dialect the document is read and written in.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Location the document was loaded from or last saved to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The underlying XML tree.
    #[must_use]
    pub const fn tree(&self) -> &XmlDocument {
        &self.tree
    }

    fn update(&mut self, map: &ConceptMap) {
        let dialect = self.dialect;
        let root = &mut self.tree.root;
        let map_el = if root.name == "map" {
            root
        } else {
            root.ensure_child("map")
        };
        write::write_map(map_el, map, dialect);
    }
}

/// The `map` element: the root itself or a direct child of it.
fn map_element(root: &XmlElement) -> Option<&XmlElement> {
    if root.name == "map" {
        Some(root)
    } else {
        root.child("map")
    }
}

fn skeleton(width: f64, height: f64) -> XmlDocument {
    let mut root = XmlElement::new("cmap");
    root.namespace = Some(CMAP_NAMESPACE.to_string());
    root.namespace_decls.push((None, CMAP_NAMESPACE.to_string()));

    let mut map = root.sibling_kind("map");
    map.set_attr("width", width.to_string());
    map.set_attr("height", height.to_string());
    for list in [
        "concept-list",
        "linking-phrase-list",
        "connection-list",
        "concept-appearance-list",
        "linking-phrase-appearance-list",
        "connection-appearance-list",
    ] {
        map.ensure_child(list);
    }

    let sheet = map
        .ensure_child("style-sheet-list")
        .ensure_child("style-sheet");
    sheet.set_attr("id", DEFAULT_STYLE_SHEET_ID);
    let concept = sheet.ensure_child("concept-style");
    for (name, value) in [
        ("font-name", "Verdana"),
        ("font-size", "12"),
        ("font-style", "plain"),
        ("font-color", "0,0,0,255"),
        ("background-color", "237,244,246,255"),
        ("border-color", "0,0,0,255"),
        ("border-thickness", "1"),
        ("border-style", "solid"),
        ("border-shape", "rounded-rectangle"),
        ("border-shape-rrarc", "15.0"),
        ("text-margin", "4"),
    ] {
        concept.set_attr(name, value);
    }
    let linker = sheet.ensure_child("linking-phrase-style");
    for (name, value) in [
        ("font-name", "Verdana"),
        ("font-size", "12"),
        ("font-style", "plain"),
        ("font-color", "0,0,0,255"),
        ("background-color", "0,0,255,0"),
        ("border-color", "0,0,0,0"),
        ("border-thickness", "1"),
        ("border-style", "solid"),
        ("border-shape", "rectangle"),
        ("border-shape-rrarc", "15.0"),
        ("text-margin", "1"),
    ] {
        linker.set_attr(name, value);
    }

    root.append_element(map);
    XmlDocument::new(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, NodeKind, Style};

    const APPEARANCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cmap xmlns="http://cmap.ihmc.us/xml/cmap/">
    <!-- keep me -->
    <map width="1000" height="700">
        <concept-list>
            <concept id="sun" label="Sun"/>
            <concept id="plant" label="Plant"/>
        </concept-list>
        <linking-phrase-list>
            <linking-phrase id="lp" label="feeds"/>
        </linking-phrase-list>
        <connection-list>
            <connection id="c1" from-id="sun" to-id="lp"/>
            <connection id="c2" from-id="lp" to-id="plant"/>
            <connection id="bad" from-id="sun" to-id="nowhere"/>
        </connection-list>
        <concept-appearance-list>
            <concept-appearance id="sun" x="10" y="20" width="100" height="40" background-color="255 0 0"/>
            <concept-appearance id="plant" x="400" y="20" width="100" height="40"/>
        </concept-appearance-list>
        <linking-phrase-appearance-list>
            <linking-phrase-appearance id="lp" x="220" y="30" width="60" height="20"/>
        </linking-phrase-appearance-list>
        <connection-appearance-list>
            <connection-appearance id="c1" from-pos="right" to-pos="left" from-index="3"/>
        </connection-appearance-list>
        <style-sheet-list>
            <style-sheet id="_Default_">
                <concept-style font-name="Arial" font-size="14" border-shape="oval"/>
            </style-sheet>
        </style-sheet-list>
    </map>
</cmap>
"#;

    #[test]
    fn test_detects_appearance_dialect() {
        let (doc, map) = CxlDocument::parse(APPEARANCE).expect("parse");
        assert_eq!(doc.dialect(), Dialect::Appearance);
        assert_eq!(map.node_count(), 3);
        assert_eq!(map.connection_count(), 2);
        assert!((map.width - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reads_geometry_overrides_and_defaults() {
        let (_, map) = CxlDocument::parse(APPEARANCE).expect("parse");
        let sun = map.node(&crate::NodeId::from_raw("sun")).expect("sun");
        assert!((sun.bounds.x - 10.0).abs() < f64::EPSILON);
        assert_eq!(sun.style.fill_color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(sun.style.font_family, None);
        assert_eq!(map.defaults().concept.font_family, "Arial");
        assert!((map.defaults().concept.font_size - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_numeric_anchor_wins_over_symbolic() {
        let (_, map) = CxlDocument::parse(APPEARANCE).expect("parse");
        let c1 = map
            .connection(&crate::ConnectionId::from_raw("c1"))
            .expect("c1");
        assert_eq!(c1.from_anchor.get(), 3);
        assert_eq!(c1.to_anchor.side(), crate::Side::Left);
        assert!(!c1.arrow_at_end);
        let c2 = map
            .connection(&crate::ConnectionId::from_raw("c2"))
            .expect("c2");
        assert!(c2.arrow_at_end);
    }

    #[test]
    fn test_save_keeps_unknown_content() {
        let (mut doc, mut map) = CxlDocument::parse(APPEARANCE).expect("parse");
        map.add_concept("Water", 10.0, 300.0, None, None);
        let text = doc.render(&map);
        assert!(text.contains("<!-- keep me -->"));
        assert!(text.contains("border-shape=\"oval\""));
        assert!(!text.contains("nowhere"));
        assert!(text.contains("label=\"Water\""));

        let (again, reread) = CxlDocument::parse(&text).expect("reparse");
        assert_eq!(again.dialect(), Dialect::Appearance);
        assert_eq!(reread.node_count(), 4);
        assert_eq!(reread.connection_count(), 2);
    }

    #[test]
    fn test_missing_map_is_parse_error() {
        let err = CxlDocument::parse("<cmap/>").expect_err("no map");
        assert!(matches!(err, MapError::Parse(_)));
    }

    #[test]
    fn test_new_map_skeleton() {
        let mut doc = CxlDocument::new_map(800.0, 600.0);
        let map = doc.read_map().expect("read");
        assert!(map.is_empty());
        assert_eq!(map.defaults().concept, crate::ResolvedStyle::concept());
        assert_eq!(
            map.default_style(NodeKind::LinkingPhrase).fill_color,
            Color::rgb(0, 0, 255)
        );

        let text = doc.render(&map);
        assert!(text.contains("<cmap xmlns=\"http://cmap.ihmc.us/xml/cmap/\">"));
        assert!(text.contains("background-color=\"0,0,255,0\""));
        assert!(text.contains("border-shape-rrarc=\"15.0\""));
        assert_eq!(doc.path(), None);
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut doc = CxlDocument::new_map(800.0, 600.0);
        let map = ConceptMap::default();
        assert!(matches!(doc.save(&map, None), Err(MapError::MissingPath)));
    }

    #[test]
    fn test_style_changes_round_trip() {
        let mut doc = CxlDocument::new_map(800.0, 600.0);
        let mut map = doc.read_map().expect("read");
        let id = map.add_concept("Leaf", 0.0, 0.0, None, None);
        map.set_node_style(
            &id,
            &Style {
                font_size: Some(18.0),
                italic: Some(true),
                ..Style::default()
            },
        )
        .expect("style");
        let text = doc.render(&map);
        let (_, reread) = CxlDocument::parse(&text).expect("reparse");
        let node = reread.node(&id).expect("node");
        assert_eq!(node.style.font_size, Some(18.0));
        assert_eq!(node.style.italic, Some(true));
        assert_eq!(node.style.bold, Some(false));
        assert_eq!(node.style.fill_color, None);
    }
}
