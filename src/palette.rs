//! Named color palette.
//!
//! Modes refer to colors by name; live telemetry refers to them by a
//! single-character selector (the key each entry is stored under on the
//! device). Lookups never fail the caller: a missing name renders black.

use crate::Color;
use crate::error::ColorLookupMiss;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name of the black entry, also used by pictures as "no color".
pub const OFF: &str = "off";

/// One named palette entry, as the device serializes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PaletteEntry {
    pub fn new(name: &str, r: u8, g: u8, b: u8) -> Self {
        Self {
            name: name.to_string(),
            r,
            g,
            b,
        }
    }

    pub fn color(&self) -> Color {
        Color::new(self.r, self.g, self.b)
    }
}

/// Selector key → entry. Serializes as the device's `{"0": {...}, ...}` map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorPalette {
    entries: BTreeMap<String, PaletteEntry>,
}

/// The clock firmware's fixed color table, in selector order.
const FIRMWARE_COLORS: [(&str, u8, u8, u8); 15] = [
    (OFF, 0, 0, 0),
    ("red", 255, 0, 0),
    ("rose", 255, 0, 128),
    ("magenta", 255, 0, 255),
    ("violet", 128, 0, 255),
    ("purple", 128, 0, 128),
    ("blue", 0, 0, 255),
    ("skyblue", 0, 128, 255),
    ("white", 255, 255, 255),
    ("lime", 0, 255, 0),
    ("springgreen", 0, 255, 128),
    ("green", 0, 128, 0),
    ("lawngreen", 128, 255, 0),
    ("yellow", 200, 200, 0),
    ("orange", 255, 128, 0),
];

impl ColorPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 15-color table the clock ships with, keyed `"0"`..`"e"`.
    pub fn firmware() -> Self {
        let mut palette = Self::new();
        for (i, (name, r, g, b)) in FIRMWARE_COLORS.iter().enumerate() {
            let selector = char::from_digit(i as u32, 16).unwrap_or('0');
            palette.insert(selector, PaletteEntry::new(name, *r, *g, *b));
        }
        palette
    }

    /// Load a palette from a JSON file in the device's map shape.
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let text = fs::read_to_string(path).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| crate::Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn insert(&mut self, selector: char, entry: PaletteEntry) {
        self.entries.insert(selector.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-sensitive lookup by name.
    pub fn get(&self, name: &str) -> Result<Color, ColorLookupMiss> {
        self.entries
            .values()
            .find(|e| e.name == name)
            .map(PaletteEntry::color)
            .ok_or_else(|| ColorLookupMiss(name.to_string()))
    }

    /// Lookup by name that fails closed to black.
    pub fn resolve(&self, name: &str) -> Color {
        match self.get(name) {
            Ok(color) => color,
            Err(miss) => {
                tracing::debug!("{miss}, rendering black");
                Color::BLACK
            }
        }
    }

    /// Color for a telemetry selector character. Unknown selectors are black.
    pub fn by_selector(&self, selector: char) -> Color {
        self.entries
            .get(&selector.to_string())
            .map(PaletteEntry::color)
            .unwrap_or(Color::BLACK)
    }

    /// Selector character under which `name` is stored.
    pub fn selector_of(&self, name: &str) -> Option<char> {
        self.entries
            .iter()
            .find(|(_, e)| e.name == name)
            .and_then(|(key, _)| key.chars().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn firmware_palette_has_fifteen_entries() {
        let palette = ColorPalette::firmware();
        assert_eq!(palette.len(), 15);
        assert_eq!(palette.selector_of("orange"), Some('e'));
        assert_eq!(palette.selector_of(OFF), Some('0'));
    }

    #[rstest]
    #[case("red", "#ff0000")]
    #[case("rose", "#ff0080")]
    #[case("skyblue", "#0080ff")]
    #[case("yellow", "#c8c800")]
    fn test_resolve_known(#[case] name: &str, #[case] hex: &str) {
        assert_eq!(ColorPalette::firmware().resolve(name).hex(), hex);
    }

    #[rstest]
    #[case("chartreuse")]
    #[case("Red")]
    #[case("")]
    fn missing_color_resolves_to_black(#[case] name: &str) {
        let palette = ColorPalette::firmware();
        assert_eq!(palette.resolve(name).hex(), "#000000");
        assert_eq!(palette.get(name), Err(ColorLookupMiss(name.to_string())));
    }

    #[test]
    fn empty_palette_resolves_everything_to_black() {
        assert_eq!(ColorPalette::new().resolve("red"), Color::BLACK);
    }

    #[rstest]
    #[case('1', Color::new(255, 0, 0))]
    #[case('8', Color::new(255, 255, 255))]
    #[case('e', Color::new(255, 128, 0))]
    #[case('z', Color::BLACK)]
    #[case(' ', Color::BLACK)]
    fn test_by_selector(#[case] selector: char, #[case] expected: Color) {
        assert_eq!(ColorPalette::firmware().by_selector(selector), expected);
    }

    #[test]
    fn deserializes_device_map() {
        let json = r#"{"0":{"name":"off","r":0,"g":0,"b":0},"1":{"name":"red","r":255,"g":0,"b":0}}"#;
        let palette: ColorPalette = serde_json::from_str(json).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.resolve("red"), Color::new(255, 0, 0));
        assert_eq!(palette.selector_of("red"), Some('1'));
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("colors.json");
        std::fs::write(&path, serde_json::to_string(&ColorPalette::firmware()).unwrap()).unwrap();

        let palette = ColorPalette::load(&path).unwrap();
        assert_eq!(palette, ColorPalette::firmware());
    }

    #[test]
    fn load_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = ColorPalette::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }
}
