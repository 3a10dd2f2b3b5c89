//! Node styles: document-scope defaults and sparse per-node overrides.
//!
//! A node stores only the attributes that were set on it explicitly. Every
//! other attribute resolves through the default record for its kind at read
//! time, so changing a default is retroactive for nodes that never pinned that
//! attribute.

use serde::{Deserialize, Serialize};

use crate::Color;

/// A complete set of style attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    /// Font family name.
    pub font_family: String,
    /// Font size in points.
    pub font_size: f64,
    /// Label colour.
    pub font_color: Color,
    /// Background fill colour.
    pub fill_color: Color,
    /// Border colour.
    pub border_color: Color,
    /// Border thickness.
    pub border_width: f64,
    /// Bold label.
    pub bold: bool,
    /// Italic label.
    pub italic: bool,
    /// Underlined label.
    pub underline: bool,
}

impl ResolvedStyle {
    /// Built-in default for concepts.
    #[must_use]
    pub fn concept() -> Self {
        Self {
            font_family: "Verdana".to_string(),
            font_size: 12.0,
            font_color: Color::BLACK,
            fill_color: Color::rgb(237, 244, 246),
            border_color: Color::BLACK,
            border_width: 1.0,
            bold: false,
            italic: false,
            underline: false,
        }
    }

    /// Built-in default for linking phrases.
    #[must_use]
    pub fn linking_phrase() -> Self {
        Self {
            fill_color: Color::rgb(0, 0, 255),
            ..Self::concept()
        }
    }

    /// The font style as written in CXL: `plain` or hyphen-joined flags.
    #[must_use]
    pub fn font_style(&self) -> String {
        format_font_style(self.bold, self.italic, self.underline)
    }
}

/// Sparse per-node style. `None` means "follow the default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Font family override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Label colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<Color>,
    /// Fill colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    /// Border colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    /// Border thickness override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    /// Bold override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Italic override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    /// Underline override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

impl Style {
    /// Whether no attribute is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any of the font style flags is pinned.
    #[must_use]
    pub const fn has_font_style(&self) -> bool {
        self.bold.is_some() || self.italic.is_some() || self.underline.is_some()
    }

    /// Pin the attributes set in `patch`, leaving the others untouched.
    pub fn merge(&mut self, patch: &Self) {
        if patch.font_family.is_some() {
            self.font_family.clone_from(&patch.font_family);
        }
        self.font_size = patch.font_size.or(self.font_size);
        self.font_color = patch.font_color.or(self.font_color);
        self.fill_color = patch.fill_color.or(self.fill_color);
        self.border_color = patch.border_color.or(self.border_color);
        self.border_width = patch.border_width.or(self.border_width);
        self.bold = patch.bold.or(self.bold);
        self.italic = patch.italic.or(self.italic);
        self.underline = patch.underline.or(self.underline);
    }

    /// Pin all three font style flags from a CXL `font-style` value.
    pub fn set_font_style(&mut self, value: &str) {
        let (bold, italic, underline) = parse_font_style(value);
        self.bold = Some(bold);
        self.italic = Some(italic);
        self.underline = Some(underline);
    }

    /// Effective style against the default record for the node's kind.
    #[must_use]
    pub fn resolve(&self, defaults: &ResolvedStyle) -> ResolvedStyle {
        ResolvedStyle {
            font_family: self
                .font_family
                .clone()
                .unwrap_or_else(|| defaults.font_family.clone()),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            font_color: self.font_color.unwrap_or(defaults.font_color),
            fill_color: self.fill_color.unwrap_or(defaults.fill_color),
            border_color: self.border_color.unwrap_or(defaults.border_color),
            border_width: self.border_width.unwrap_or(defaults.border_width),
            bold: self.bold.unwrap_or(defaults.bold),
            italic: self.italic.unwrap_or(defaults.italic),
            underline: self.underline.unwrap_or(defaults.underline),
        }
    }
}

/// The two document-scope default records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultStyles {
    /// Defaults for concepts.
    pub concept: ResolvedStyle,
    /// Defaults for linking phrases.
    pub linking_phrase: ResolvedStyle,
}

impl Default for DefaultStyles {
    fn default() -> Self {
        Self {
            concept: ResolvedStyle::concept(),
            linking_phrase: ResolvedStyle::linking_phrase(),
        }
    }
}

/// Parse a CXL `font-style` value into `(bold, italic, underline)`.
///
/// Unknown tokens are ignored, so `plain` and garbage both yield all false.
#[must_use]
pub fn parse_font_style(value: &str) -> (bool, bool, bool) {
    let mut flags = (false, false, false);
    for token in value.split('-').map(str::trim) {
        match token {
            "bold" => flags.0 = true,
            "italic" => flags.1 = true,
            "underline" => flags.2 = true,
            _ => {}
        }
    }
    flags
}

/// Format font style flags as CXL `font-style`.
#[must_use]
pub fn format_font_style(bold: bool, italic: bool, underline: bool) -> String {
    let parts: Vec<&str> = [(bold, "bold"), (italic, "italic"), (underline, "underline")]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
    if parts.is_empty() {
        "plain".to_string()
    } else {
        parts.join("-")
    }
}
