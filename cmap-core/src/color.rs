//! Colour conversion between CXL text forms and canonical `#RRGGBB`.
//!
//! CXL files carry colours as `"r,g,b,a"`, but files in the wild also use
//! `#RRGGBB` and space separated (sometimes floating point) components.
//! Every form is folded into [`Color`], alpha is discarded, and anything
//! unparseable becomes black.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    /// Black, the fallback for unparseable input.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Create a colour from components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse any of the accepted text forms, falling back to black.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::try_parse(value).unwrap_or_else(|| {
            tracing::warn!("Unparseable colour {value:?}, using black");
            Self::BLACK
        })
    }

    /// Parse any of the accepted text forms.
    ///
    /// Returns `None` when the value matches no known form.
    #[must_use]
    pub fn try_parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() >= 3 {
            if let Some(color) = parse_components(&parts[..3], |p| p.parse::<i64>().ok()) {
                return Some(color);
            }
        }
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() >= 3 {
            #[allow(clippy::cast_possible_truncation)]
            return parse_components(&parts[..3], |p| {
                p.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v.trunc() as i64)
            });
        }
        None
    }

    /// Canonical `#RRGGBB` form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// CXL `r,g,b,a` form with full opacity.
    #[must_use]
    pub fn to_rgba(self) -> String {
        format!("{},{},{},255", self.r, self.g, self.b)
    }
}

/// Canonicalize any accepted colour text to `#RRGGBB`.
#[must_use]
pub fn canonicalize(value: &str) -> String {
    Color::parse(value).to_hex()
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn parse_components(parts: &[&str], parse: impl Fn(&str) -> Option<i64>) -> Option<Color> {
    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(parts) {
        let value = parse(part)?;
        *slot = u8::try_from(value.clamp(0, 255)).ok()?;
    }
    Some(Color::rgb(channels[0], channels[1], channels[2]))
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}
