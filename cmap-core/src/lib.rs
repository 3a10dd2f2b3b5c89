//! # Saorsa Cmap Core
//!
//! Document engine for concept maps stored as CXL files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  cmap-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Graph Model     │  CXL Codec               │
//! │  - Concepts      │  - Dialect detection     │
//! │  - Linking       │  - In-place save         │
//! │    phrases       │  - Colour parsing        │
//! │  - Connections   │                          │
//! ├─────────────────────────────────────────────┤
//! │  Anchor Geometry │  Document Session        │
//! │  - 24-point grid │  - Undo/redo snapshots   │
//! │  - Closest pair  │  - Clipboard payloads    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use cmap_core::{Document, DocumentConfig};
//!
//! let mut doc = Document::new(DocumentConfig::default());
//! let sun = doc.edit(|m| Ok(m.add_concept("Sun", 0.0, 0.0, None, None))).unwrap();
//! let plant = doc.edit(|m| Ok(m.add_concept("Plant", 300.0, 0.0, None, None))).unwrap();
//! doc.edit(|m| m.insert_linking_phrase(&sun, &plant, "feeds")).unwrap();
//!
//! assert_eq!(doc.map().propositions().len(), 1);
//! assert!(doc.undo());
//! assert!(doc.map().propositions().is_empty());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anchor;
pub mod clipboard;
pub mod color;
pub mod config;
pub mod cxl;
pub mod document;
pub mod error;
pub mod history;
pub mod map;
pub mod metrics;
pub mod node;
pub mod shared;
pub mod style;

pub use anchor::{AnchorIndex, Point, Rect, Side, Size, ANCHOR_COUNT};
pub use clipboard::{ClipboardConnection, ClipboardNode, ClipboardPayload};
pub use color::Color;
pub use config::DocumentConfig;
pub use cxl::{CxlDocument, Dialect};
pub use document::Document;
pub use error::{Direction, MapError, MapResult};
pub use history::{History, SnapshotToken};
pub use map::{ConceptMap, LinkInsertion, NodeRemoval, Proposition};
pub use metrics::{ApproximateMetrics, NoMinimum, TextMetrics};
pub use node::{Connection, ConnectionId, Endpoint, Node, NodeId, NodeKind};
pub use shared::SharedDocument;
pub use style::{DefaultStyles, ResolvedStyle, Style};

/// Cmap core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
