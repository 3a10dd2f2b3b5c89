//! CXL Integration Tests
//!
//! Drives the codec through real files:
//! - Legacy and appearance dialect round-trips
//! - Edits followed by save and reload
//! - Preservation of content the model does not cover
//! - Load failures leaving the open document untouched

use std::fs;
use std::path::Path;

use cmap_core::{
    Color, ConceptMap, ConnectionId, Dialect, Document, DocumentConfig, MapError, NodeId,
    NodeKind,
};

const LEGACY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cmap xmlns="http://cmap.ihmc.us/xml/cmap/">
    <map width="600" height="400">
        <concept-list>
            <concept id="c1" label="Photosynthesis"/>
            <concept id="c2" label="Sunlight"/>
        </concept-list>
        <linking-phrase-list>
            <linking-phrase id="l1" label="requires"/>
        </linking-phrase-list>
        <connection-list>
            <connection id="k1" from-id="c1" to-id="l1"/>
            <connection id="k2" from-id="l1" to-id="c2"/>
        </connection-list>
        <style-list>
            <style object-id="c1">
                <geom x="100" y="100" width="120" height="60"/>
                <text font-name="Verdana" font-size="12" color="0,0,0,255" style="plain"/>
                <shape fill="237,244,246,255" border="0,0,0,255"/>
            </style>
            <style object-id="c2">
                <geom x="420" y="100" width="120" height="60"/>
            </style>
            <style object-id="l1">
                <geom x="270" y="120" width="90" height="20"/>
            </style>
        </style-list>
    </map>
</cmap>
"#;

const APPEARANCE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<cmap xmlns="http://cmap.ihmc.us/xml/cmap/" xmlns:dc="http://purl.org/dc/elements/1.1/">
    <res-meta>
        <dc:title>Water cycle</dc:title>
    </res-meta>
    <!-- edited by hand -->
    <map width="900" height="700">
        <concept-list>
            <concept id="sea" label="Sea" short-comment="kept"/>
            <concept id="cloud" label="Cloud"/>
            <concept id="rain" label="Rain"/>
        </concept-list>
        <linking-phrase-list>
            <linking-phrase id="forms" label="forms"/>
        </linking-phrase-list>
        <connection-list>
            <connection id="a" from-id="sea" to-id="forms"/>
            <connection id="b" from-id="forms" to-id="cloud"/>
            <connection id="c" from-id="cloud" to-id="rain"/>
        </connection-list>
        <concept-appearance-list>
            <concept-appearance id="sea" x="50" y="400" width="120" height="60" background-color="#FF0000"/>
            <concept-appearance id="cloud" x="400" y="50" width="120" height="60" font-color="255 0 0"/>
            <concept-appearance id="rain" x="700" y="400" width="120" height="60" border-color="garbage"/>
        </concept-appearance-list>
        <linking-phrase-appearance-list>
            <linking-phrase-appearance id="forms" x="200" y="220" width="60" height="20"/>
        </linking-phrase-appearance-list>
        <connection-appearance-list>
            <connection-appearance id="a" from-pos="top" to-pos="bottom"/>
            <connection-appearance id="c" from-index="5" to-index="18"/>
        </connection-appearance-list>
        <style-sheet-list>
            <style-sheet id="_Default_">
                <concept-style font-name="Verdana" font-size="12" background-color="237,244,246,255" border-shape="rounded-rectangle"/>
                <linking-phrase-style font-name="Verdana" font-size="12" background-color="0,0,255,0"/>
            </style-sheet>
        </style-sheet-list>
    </map>
</cmap>
"##;

type NodeRow = (String, NodeKind, String, [f64; 4]);
type ConnectionRow = (String, String, String, usize, usize);

/// Ids, kinds, labels, geometry and topology, in a stable order.
fn fingerprint(map: &ConceptMap) -> (Vec<NodeRow>, Vec<ConnectionRow>) {
    let mut nodes: Vec<NodeRow> = map
        .nodes()
        .map(|n| {
            (
                n.id.to_string(),
                n.kind,
                n.label.clone(),
                [n.bounds.x, n.bounds.y, n.bounds.width, n.bounds.height],
            )
        })
        .collect();
    nodes.sort_by(|a, b| a.0.cmp(&b.0));
    let mut connections: Vec<ConnectionRow> = map
        .connections()
        .map(|c| {
            (
                c.id.to_string(),
                c.from.to_string(),
                c.to.to_string(),
                c.from_anchor.get(),
                c.to_anchor.get(),
            )
        })
        .collect();
    connections.sort();
    (nodes, connections)
}

fn write_fixture(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

// ============================================================================
// Legacy dialect
// ============================================================================

#[test]
fn test_legacy_photosynthesis_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_fixture(dir.path(), "photo.cxl", LEGACY);

    let mut doc = Document::open(&source, DocumentConfig::default()).expect("open");
    assert_eq!(doc.dialect(), Dialect::Legacy);

    let map = doc.map();
    let photo = map.node(&NodeId::from_raw("c1")).expect("concept");
    assert_eq!(photo.label, "Photosynthesis");
    assert_eq!(photo.kind, NodeKind::Concept);
    assert!((photo.bounds.x - 100.0).abs() < f64::EPSILON);
    assert!((photo.bounds.y - 100.0).abs() < f64::EPSILON);
    assert!((photo.bounds.width - 120.0).abs() < f64::EPSILON);
    assert!((photo.bounds.height - 60.0).abs() < f64::EPSILON);
    let requires = map.node(&NodeId::from_raw("l1")).expect("linker");
    assert_eq!(requires.label, "requires");
    assert!(requires.is_linker());

    let relations = map.propositions();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].source, NodeId::from_raw("c1"));
    assert_eq!(relations[0].linker, Some(NodeId::from_raw("l1")));
    assert_eq!(relations[0].target, NodeId::from_raw("c2"));

    let before = fingerprint(doc.map());
    let copy = dir.path().join("photo-copy.cxl");
    doc.save_as(&copy).expect("save");

    let text = fs::read_to_string(&copy).expect("read back");
    assert!(text.contains("<style-list>"));
    assert!(!text.contains("concept-appearance-list"));
    assert!(text.contains(r#"<style object-id="c1">"#));
    assert!(text.contains(r#"<geom x="100" y="100" width="120" height="60"/>"#));
    assert!(text.contains(r#"<style object-id="l1">"#));

    let reopened = Document::open(&copy, DocumentConfig::default()).expect("reopen");
    assert_eq!(reopened.dialect(), Dialect::Legacy);
    assert_eq!(fingerprint(reopened.map()), before);
}

#[test]
fn test_legacy_new_nodes_are_saved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "grow.cxl", LEGACY);

    let mut doc = Document::open(&path, DocumentConfig::default()).expect("open");
    let photo = NodeId::from_raw("c1");
    let water = doc
        .edit(|m| m.add_connected_concept(&photo, "Water", 100.0, 300.0, Some("needs")))
        .expect("extend");
    doc.save().expect("save");

    let reopened = Document::open(&path, DocumentConfig::default()).expect("reopen");
    let node = reopened.map().node(&water).expect("new concept saved");
    assert_eq!(node.label, "Water");
    assert!((node.bounds.y - 300.0).abs() < f64::EPSILON);
    assert_eq!(reopened.map().propositions().len(), 2);
}

// ============================================================================
// Appearance dialect
// ============================================================================

#[test]
fn test_appearance_round_trip_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "water.cxl", APPEARANCE);

    let mut doc = Document::open(&path, DocumentConfig::default()).expect("open");
    assert_eq!(doc.dialect(), Dialect::Appearance);
    let before = fingerprint(doc.map());
    doc.save().expect("save");

    let reopened = Document::open(&path, DocumentConfig::default()).expect("reopen");
    assert_eq!(reopened.dialect(), Dialect::Appearance);
    assert_eq!(fingerprint(reopened.map()), before);
}

#[test]
fn test_appearance_keeps_unmodelled_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "water.cxl", APPEARANCE);

    let mut doc = Document::open(&path, DocumentConfig::default()).expect("open");
    doc.save().expect("save");
    let text = fs::read_to_string(&path).expect("read back");

    assert!(text.contains("<!-- edited by hand -->"));
    assert!(text.contains("<dc:title>Water cycle</dc:title>"));
    assert!(text.contains(r#"short-comment="kept""#));
    assert!(text.contains(r#"border-shape="rounded-rectangle""#));
    assert!(text.contains(r#"background-color="0,0,255,0""#));
}

#[test]
fn test_appearance_colours_are_canonicalized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "water.cxl", APPEARANCE);
    let doc = Document::open(&path, DocumentConfig::default()).expect("open");
    let map = doc.map();

    let sea = map.node(&NodeId::from_raw("sea")).expect("sea");
    assert_eq!(sea.style.fill_color.map(Color::to_hex).as_deref(), Some("#FF0000"));
    let cloud = map.node(&NodeId::from_raw("cloud")).expect("cloud");
    assert_eq!(cloud.style.font_color, Some(Color::rgb(255, 0, 0)));
    let rain = map.node(&NodeId::from_raw("rain")).expect("rain");
    assert_eq!(rain.style.border_color, Some(Color::BLACK));
}

#[test]
fn test_appearance_anchor_hints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "water.cxl", APPEARANCE);
    let doc = Document::open(&path, DocumentConfig::default()).expect("open");
    let map = doc.map();

    let a = map.connection(&ConnectionId::from_raw("a")).expect("a");
    assert_eq!(a.from_anchor.side(), cmap_core::Side::Top);
    assert_eq!(a.to_anchor.side(), cmap_core::Side::Bottom);
    let c = map.connection(&ConnectionId::from_raw("c")).expect("c");
    assert_eq!(c.from_anchor.get(), 5);
    assert_eq!(c.to_anchor.get(), 18);
    assert!(c.arrow_at_end);
}

#[test]
fn test_duplicate_connection_ids_keep_first_and_stay_stable() {
    let text = LEGACY.replace(
        r#"<connection id="k2" from-id="l1" to-id="c2"/>"#,
        r#"<connection id="k2" from-id="l1" to-id="c2"/>
            <connection id="k2" from-id="c2" to-id="c1"/>"#,
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "dup.cxl", &text);

    let mut doc = Document::open(&path, DocumentConfig::default()).expect("open");
    assert_eq!(doc.map().connection_count(), 2);
    let kept = doc
        .map()
        .connection(&ConnectionId::from_raw("k2"))
        .expect("k2");
    assert_eq!(kept.from.as_str(), "l1");

    for _ in 0..2 {
        doc.save().expect("save");
        let saved = fs::read_to_string(&path).expect("read back");
        assert_eq!(saved.matches("<connection ").count(), 2);
        let reopened = Document::open(&path, DocumentConfig::default()).expect("reopen");
        assert_eq!(reopened.map().connection_count(), 2);
        doc = reopened;
    }
}

#[test]
fn test_bridging_delete_survives_save() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "water.cxl", APPEARANCE);

    let mut doc = Document::open(&path, DocumentConfig::default()).expect("open");
    let removal = doc
        .edit(|m| m.delete_node(&NodeId::from_raw("forms")))
        .expect("delete");
    assert!(removal.bridge.is_some());
    doc.save().expect("save");

    let text = fs::read_to_string(&path).expect("read back");
    assert!(!text.contains(r#"id="forms""#));
    let reopened = Document::open(&path, DocumentConfig::default()).expect("reopen");
    let direct = reopened
        .map()
        .connections()
        .filter(|c| c.from.as_str() == "sea" && c.to.as_str() == "cloud")
        .count();
    assert_eq!(direct, 1);
    assert_eq!(reopened.map().connection_count(), 2);
}

#[test]
fn test_new_document_saves_appearance_dialect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fresh.cxl");

    let mut doc = Document::new(DocumentConfig::default());
    let a = doc
        .edit(|m| Ok(m.add_concept("Idea", 10.0, 10.0, None, None)))
        .expect("add");
    doc.save_as(&path).expect("save");

    let reopened = Document::open(&path, DocumentConfig::default()).expect("reopen");
    assert_eq!(reopened.dialect(), Dialect::Appearance);
    assert_eq!(reopened.map().node(&a).map(|n| n.label.as_str()), Some("Idea"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_malformed_file_does_not_replace_open_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = write_fixture(dir.path(), "good.cxl", LEGACY);
    let bad = write_fixture(dir.path(), "bad.cxl", "<cmap><map></cmap>");

    let mut doc = Document::open(&good, DocumentConfig::default()).expect("open");
    let before = doc.map().clone();
    let err = doc.reload_from(&bad).expect_err("malformed");
    assert!(matches!(err, MapError::Parse(_)));
    assert_eq!(doc.map(), &before);
    assert_eq!(doc.path(), Some(good.as_path()));
}

#[test]
fn test_missing_file_is_load_persistence_error() {
    let err = Document::open("/nonexistent/cmap/file.cxl", DocumentConfig::default())
        .expect_err("missing");
    match err {
        MapError::Persistence { direction, .. } => {
            assert_eq!(direction, cmap_core::Direction::Load);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unwritable_target_is_save_persistence_error() {
    let mut doc = Document::new(DocumentConfig::default());
    let err = doc
        .save_as("/nonexistent/cmap/out.cxl")
        .expect_err("unwritable");
    assert!(matches!(
        err,
        MapError::Persistence {
            direction: cmap_core::Direction::Save,
            ..
        }
    ));
    assert!(doc.path().is_none());
}
