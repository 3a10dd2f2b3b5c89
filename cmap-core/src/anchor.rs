//! Anchor points on a node's border.
//!
//! Every node exposes 24 anchors. The top and bottom edges are split into six
//! equal segments, giving seven points each (corners included); the left and
//! right edges add five interior points each.
//!
//! ```text
//!  0   2   4   6   8  10  12      even 0..14: top, left to right
//!  +---+---+---+---+---+---+
//! 14                      15      odd  1..14: bottom, left to right
//! 16                      17      even 14..24: left, top to bottom
//! 18                      19      odd  15..24: right, top to bottom
//! 20                      21
//! 22                      23
//!  +---+---+---+---+---+---+
//!  1   3   5   7   9  11  13
//! ```

use serde::{Deserialize, Serialize};

use crate::{MapError, MapResult};

/// Number of anchors on every node.
pub const ANCHOR_COUNT: usize = 24;

/// Segments per edge; each edge has `SEGMENTS + 1` points.
const SEGMENTS: usize = 6;

/// First index of the left/right interior block.
const SIDE_BASE: usize = 2 * (SEGMENTS + 1);

/// A point in document (or node-local) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point.
    #[must_use]
    pub fn manhattan(self, other: Self) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Width and height of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum, used to clamp to a minimum size.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.width.max(other.width), self.height.max(other.height))
    }
}

/// A node's top-left position and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rect from position and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Size of the rect.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a document point falls inside the rect.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Border side a connection endpoint attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
    /// Left edge.
    Left,
    /// Right edge.
    Right,
}

impl Side {
    /// The side facing this one on another node.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Symbolic name used by the CXL appearance dialect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a symbolic position. `center` and unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Index into the 24-point anchor grid. Always in `[0, 24)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "usize", into = "usize")]
pub struct AnchorIndex(u8);

impl AnchorIndex {
    /// Validate a raw index.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidAnchor`] if `index >= 24`.
    pub fn new(index: usize) -> MapResult<Self> {
        u8::try_from(index)
            .ok()
            .filter(|_| index < ANCHOR_COUNT)
            .map(Self)
            .ok_or(MapError::InvalidAnchor(index))
    }

    /// All 24 anchors in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..ANCHOR_COUNT).filter_map(|i| u8::try_from(i).ok()).map(Self)
    }

    /// Raw index value.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// The side this anchor belongs to, as written in symbolic form.
    ///
    /// Corners count as top/bottom.
    #[must_use]
    pub const fn side(self) -> Side {
        let i = self.get();
        match (i < SIDE_BASE, i % 2 == 0) {
            (true, true) => Side::Top,
            (true, false) => Side::Bottom,
            (false, true) => Side::Left,
            (false, false) => Side::Right,
        }
    }

    /// Anchor at discrete step `step` (0..=6) along `side`.
    ///
    /// Steps run left to right on top/bottom and top to bottom on left/right;
    /// steps 0 and 6 of a vertical side are the shared corners.
    fn on_side(side: Side, step: usize) -> Self {
        let step = step.min(SEGMENTS);
        let raw = match side {
            Side::Top => 2 * step,
            Side::Bottom => 2 * step + 1,
            Side::Left | Side::Right => {
                let right = usize::from(side == Side::Right);
                if step == 0 {
                    2 * SEGMENTS * right
                } else if step == SEGMENTS {
                    2 * SEGMENTS * right + 1
                } else {
                    SIDE_BASE + 2 * (step - 1) + right
                }
            }
        };
        #[allow(clippy::cast_possible_truncation)]
        Self(raw as u8)
    }
}

impl TryFrom<usize> for AnchorIndex {
    type Error = MapError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnchorIndex> for usize {
    fn from(value: AnchorIndex) -> Self {
        value.get()
    }
}

impl std::fmt::Display for AnchorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node-local position of an anchor.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn anchor_position(size: Size, index: AnchorIndex) -> Point {
    let i = index.get();
    let segments = SEGMENTS as f64;
    if i < SIDE_BASE {
        let step = (i / 2) as f64;
        let y = if i % 2 == 0 { 0.0 } else { size.height };
        Point::new(size.width * step / segments, y)
    } else {
        let step = ((i - SIDE_BASE) / 2 + 1) as f64;
        let x = if i % 2 == 0 { 0.0 } else { size.width };
        Point::new(x, size.height * step / segments)
    }
}

/// Document position of an anchor on a node placed at `rect`.
#[must_use]
pub fn anchor_in_document(rect: &Rect, index: AnchorIndex) -> Point {
    let local = anchor_position(rect.size(), index);
    Point::new(rect.x + local.x, rect.y + local.y)
}

/// The anchor on `side` of `rect` that best aligns with `target`.
///
/// The target is mapped into local coordinates, normalized along the edge,
/// clamped to `[0, 1]` and rounded to the nearest of the seven points.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn aligned_anchor(rect: &Rect, side: Side, target: Point) -> AnchorIndex {
    let (offset, extent) = match side {
        Side::Top | Side::Bottom => (target.x - rect.x, rect.width),
        Side::Left | Side::Right => (target.y - rect.y, rect.height),
    };
    let t = if extent > 0.0 {
        (offset / extent).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let step = (t * SEGMENTS as f64).round() as usize;
    AnchorIndex::on_side(side, step)
}

/// Facing sides for a connection from `a` to `b`.
///
/// The dominant axis of the centre-to-centre vector decides; ties go to the
/// horizontal pair.
#[must_use]
pub fn facing_sides(a: &Rect, b: &Rect) -> (Side, Side) {
    let (ca, cb) = (a.center(), b.center());
    let (dx, dy) = (cb.x - ca.x, cb.y - ca.y);
    let side = if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            Side::Right
        } else {
            Side::Left
        }
    } else if dy > 0.0 {
        Side::Bottom
    } else {
        Side::Top
    };
    (side, side.opposite())
}

/// Best anchor pair for a connection between two nodes.
#[must_use]
pub fn closest_anchor_pair(a: &Rect, b: &Rect) -> (AnchorIndex, AnchorIndex) {
    let (side_a, side_b) = facing_sides(a, b);
    (
        aligned_anchor(a, side_a, b.center()),
        aligned_anchor(b, side_b, a.center()),
    )
}

/// Anchor nearest to a document point by Manhattan distance.
///
/// Ties resolve to the lowest index.
#[must_use]
pub fn nearest_anchor_index(rect: &Rect, point: Point) -> AnchorIndex {
    let mut best = AnchorIndex(0);
    let mut best_distance = f64::INFINITY;
    for index in AnchorIndex::all() {
        let distance = anchor_in_document(rect, index).manhattan(point);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}
