//! Minimum node size contract.
//!
//! The map never measures text itself. Whoever renders labels implements
//! [`TextMetrics`] and the map clamps resizes and relabels to what it reports.

use crate::{ResolvedStyle, Size};

/// Padding around a label on each side.
pub const LABEL_PADDING: f64 = 10.0;

/// Reports the smallest box that fits a label.
pub trait TextMetrics {
    /// Minimum node size for `label` rendered with `style`.
    fn minimum_size(&self, label: &str, style: &ResolvedStyle) -> Size;
}

/// Font-size based estimate for headless use.
///
/// Assumes an average glyph width of 0.6em and a line height of 1.2em.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl TextMetrics for ApproximateMetrics {
    #[allow(clippy::cast_precision_loss)]
    fn minimum_size(&self, label: &str, style: &ResolvedStyle) -> Size {
        let lines: Vec<&str> = label.lines().collect();
        let line_count = lines.len().max(1) as f64;
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0) as f64;
        Size::new(
            widest * style.font_size * 0.6 + 2.0 * LABEL_PADDING,
            line_count * style.font_size * 1.2 + 2.0 * LABEL_PADDING,
        )
    }
}

/// Accepts any size. Useful where the caller has already clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMinimum;

impl TextMetrics for NoMinimum {
    fn minimum_size(&self, _label: &str, _style: &ResolvedStyle) -> Size {
        Size::default()
    }
}
