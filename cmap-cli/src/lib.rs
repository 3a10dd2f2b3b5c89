//! # Saorsa Cmap CLI
//!
//! Command-line host for the concept map engine.
//!
//! ## Usage
//!
//! ```bash
//! cmap info map.cxl
//! cmap relations map.cxl
//! cmap new blank.cxl --width 1024 --height 768
//! cmap normalize old.cxl --output clean.cxl
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `DocumentConfig` - Built from the arguments, handed to every opened document
//! - `run` - Executes one command against an output writer

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmap_core::history::DEFAULT_HISTORY_LIMIT;
use cmap_core::{ConceptMap, Dialect, Document, DocumentConfig, NodeId, NodeKind, Size};
use serde::Serialize;

/// Command-line arguments for cmap.
#[derive(Debug, Clone, Parser)]
#[command(name = "cmap")]
#[command(about = "Inspect, create and normalize CXL concept maps")]
#[command(version)]
pub struct CliArgs {
    /// Maximum number of undo steps kept per document
    #[arg(long, env = "CMAP_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print dialect, extent and node/connection counts
    Info {
        /// CXL file to inspect
        path: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the propositions (concept, linking phrase, concept) of a map
    Relations {
        /// CXL file to read
        path: PathBuf,
    },
    /// Create a blank map with the default style sheet
    New {
        /// Destination file
        output: PathBuf,
        /// Map width
        #[arg(long, default_value = "800")]
        width: f64,
        /// Map height
        #[arg(long, default_value = "600")]
        height: f64,
    },
    /// Load a map and write it back in its own dialect
    Normalize {
        /// CXL file to read
        input: PathBuf,
        /// Destination (defaults to overwriting the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl From<&CliArgs> for DocumentConfig {
    fn from(args: &CliArgs) -> Self {
        Self::new().with_history_limit(args.history_limit)
    }
}

/// Summary printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    /// File the map was read from.
    pub path: PathBuf,
    /// Schema dialect.
    pub dialect: Dialect,
    /// Number of concepts.
    pub concepts: usize,
    /// Number of linking phrases.
    pub linking_phrases: usize,
    /// Number of connections.
    pub connections: usize,
    /// Map width.
    pub width: f64,
    /// Map height.
    pub height: f64,
}

impl MapSummary {
    /// Summarize an open document.
    #[must_use]
    pub fn of(path: &Path, doc: &Document) -> Self {
        let map = doc.map();
        Self {
            path: path.to_path_buf(),
            dialect: doc.dialect(),
            concepts: count_kind(map, NodeKind::Concept),
            linking_phrases: count_kind(map, NodeKind::LinkingPhrase),
            connections: map.connection_count(),
            width: map.width,
            height: map.height,
        }
    }
}

/// Execute the parsed command, writing user output to `out`.
///
/// # Errors
///
/// Returns an error if a file cannot be loaded or saved, or `out` fails.
pub fn run(args: &CliArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let config = DocumentConfig::from(args);
    match &args.command {
        Command::Info { path, json } => {
            let doc = open(path, config)?;
            let summary = MapSummary::of(path, &doc);
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
            } else {
                writeln!(out, "{}", summary.path.display())?;
                writeln!(out, "  dialect:         {}", summary.dialect)?;
                writeln!(out, "  extent:          {} x {}", summary.width, summary.height)?;
                writeln!(out, "  concepts:        {}", summary.concepts)?;
                writeln!(out, "  linking phrases: {}", summary.linking_phrases)?;
                writeln!(out, "  connections:     {}", summary.connections)?;
            }
        }
        Command::Relations { path } => {
            let doc = open(path, config)?;
            for line in relation_lines(doc.map()) {
                writeln!(out, "{line}")?;
            }
        }
        Command::New {
            output,
            width,
            height,
        } => {
            let config = DocumentConfig {
                map_size: Size::new(*width, *height),
                ..config
            };
            let mut doc = Document::new(config);
            let written = doc
                .save_as(output)
                .with_context(|| format!("creating {}", output.display()))?;
            tracing::info!("Created blank map at {}", written.display());
            writeln!(out, "{}", written.display())?;
        }
        Command::Normalize { input, output } => {
            let mut doc = open(input, config)?;
            let written = match output {
                Some(path) => doc.save_as(path),
                None => doc.save(),
            }
            .with_context(|| format!("writing normalized {}", input.display()))?;
            writeln!(out, "{}", written.display())?;
        }
    }
    Ok(())
}

fn open(path: &Path, config: DocumentConfig) -> anyhow::Result<Document> {
    Document::open(path, config).with_context(|| format!("opening {}", path.display()))
}

/// One `source -- phrase --> target` line per proposition.
#[must_use]
pub fn relation_lines(map: &ConceptMap) -> Vec<String> {
    let label = |id: &NodeId| map.node(id).map_or("?", |n| n.label.as_str());
    map.propositions()
        .iter()
        .map(|p| match &p.linker {
            Some(linker) => format!(
                "{} -- {} --> {}",
                label(&p.source),
                label(linker),
                label(&p.target)
            ),
            None => format!("{} --> {}", label(&p.source), label(&p.target)),
        })
        .collect()
}

fn count_kind(map: &ConceptMap, kind: NodeKind) -> usize {
    map.nodes().filter(|n| n.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("cmap").chain(argv.iter().copied()))
    }

    #[test]
    fn test_history_limit_flows_into_config() {
        let parsed = args(&["--history-limit", "12", "relations", "x.cxl"]);
        assert_eq!(DocumentConfig::from(&parsed).history_limit, 12);
    }

    #[test]
    fn test_new_then_info() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blank.cxl");
        let path_str = path.to_str().expect("utf-8 path");

        let mut out = Vec::new();
        run(&args(&["new", path_str, "--width", "1024"]), &mut out).expect("new");
        assert!(path.exists());

        let mut out = Vec::new();
        run(&args(&["info", path_str, "--json"]), &mut out).expect("info");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["dialect"], "appearance");
        assert_eq!(value["concepts"], 0);
        assert_eq!(value["width"], 1024.0);
    }

    #[test]
    fn test_relations_lists_propositions() {
        let mut map = ConceptMap::default();
        let sun = map.add_concept("Sun", 0.0, 0.0, None, None);
        let plant = map.add_concept("Plant", 300.0, 0.0, None, None);
        let water = map.add_concept("Water", 0.0, 300.0, None, None);
        map.insert_linking_phrase(&sun, &plant, "feeds").expect("insert");
        map.connect(&water, &plant, None, None).expect("connect");

        let lines = relation_lines(&map);
        assert_eq!(lines, vec!["Sun -- feeds --> Plant", "Water --> Plant"]);
        assert_eq!(count_kind(&map, NodeKind::LinkingPhrase), 1);
    }

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
            <style object-id="c1"><geom x="100" y="100" width="120" height="60"/></style>
            <style object-id="c2"><geom x="420" y="100" width="120" height="60"/></style>
            <style object-id="l1"><geom x="270" y="120" width="90" height="20"/></style>
        </style-list>
    </map>
</cmap>
"#;

    #[test]
    fn test_normalize_keeps_legacy_dialect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("old.cxl");
        std::fs::write(&input, LEGACY).expect("write fixture");
        let output = dir.path().join("clean.cxl");

        let mut out = Vec::new();
        run(
            &args(&[
                "normalize",
                input.to_str().expect("utf-8 path"),
                "--output",
                output.to_str().expect("utf-8 path"),
            ]),
            &mut out,
        )
        .expect("normalize");
        assert_eq!(String::from_utf8(out).expect("utf-8"), format!("{}\n", output.display()));
        assert_eq!(std::fs::read_to_string(&input).expect("input"), LEGACY);

        let doc = Document::open(&output, DocumentConfig::default()).expect("reopen");
        assert_eq!(doc.dialect(), Dialect::Legacy);
        assert_eq!(doc.map().node_count(), 3);
        assert_eq!(doc.map().connection_count(), 2);
        assert_eq!(
            relation_lines(doc.map()),
            vec!["Photosynthesis -- requires --> Sunlight"]
        );
    }

    #[test]
    fn test_info_on_missing_file_fails() {
        let mut out = Vec::new();
        let err = run(&args(&["info", "/nonexistent/map.cxl"]), &mut out).expect_err("missing");
        assert!(format!("{err:#}").contains("opening /nonexistent/map.cxl"));
    }
}
