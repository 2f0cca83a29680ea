//! Palette extraction for `preview`
//!
//! Collects `--name: #rrggbb` custom properties and bare hex colours from a
//! stylesheet in first-seen order, one entry per distinct colour.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts `#rgb` and `#rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::new(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => {
                let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
                Some(Self::new(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => None,
        }
    }

    /// WCAG relative luminance
    pub fn luminance(&self) -> f64 {
        fn linear(c: u8) -> f64 {
            let u = f64::from(c) / 255.0;
            if u <= 0.03928 {
                u / 12.92
            } else {
                ((u + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    pub fn is_dark(&self) -> bool {
        self.luminance() < 0.179
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swatch {
    /// Custom property name without the leading `--`
    pub name: Option<String>,
    pub color: RgbColor,
}

fn comment_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").ok()).as_ref()
}

fn color_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:--([A-Za-z0-9_-]+)\s*:\s*)?(#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3}))\b").ok()
    })
    .as_ref()
}

pub fn extract_palette(css: &str) -> Vec<Swatch> {
    let (Some(comments), Some(colors)) = (comment_regex(), color_regex()) else {
        return Vec::new();
    };
    let stripped = comments.replace_all(css, " ");

    let mut swatches: Vec<Swatch> = Vec::new();
    for caps in colors.captures_iter(&stripped) {
        let Some(color) = caps.get(2).and_then(|m| RgbColor::from_hex(m.as_str())) else {
            continue;
        };
        if swatches.iter().any(|s| s.color == color) {
            continue;
        }
        swatches.push(Swatch {
            name: caps.get(1).map(|m| m.as_str().to_string()),
            color,
        });
    }
    swatches
}
