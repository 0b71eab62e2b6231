//! Rendering a mode into the clock's letter grid.
//!
//! The face is 11 letter rows (`"0"`..`"9"`, `"a"`) of 11 cells each, plus
//! the `"M"` row holding the minute-indicator LEDs. Rendering needs two
//! strings per row: the letters printed on the face (`text`) and which
//! cells are lit (`colors`, one selector character per column). Both come
//! from a [`LiveTelemetry`] snapshot.
//!
//! ## Fail-closed rendering
//! Nothing here returns an error. Unknown colors paint black, unresolvable
//! chains and off render an all-blank grid, and short rows are blank past
//! their end.

use crate::error::ResolveError;
use crate::mode::{GRID_WIDTH, Mode, ModeRef, TimeOfDay};
use crate::palette::ColorPalette;
use crate::resolve::{ResolutionChain, select_window};
use crate::store::ModeStore;
use crate::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the minute-indicator row.
pub const MINUTE_ROW: &str = "M";

/// Every row key, top to bottom.
pub const ROW_KEYS: [&str; 12] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", MINUTE_ROW,
];

/// The device sends the four minute LEDs without the blank columns that
/// precede them on the face.
const MINUTE_ROW_OFFSET: usize = 3;

// ── Telemetry ────────────────────────────────────────────────────────

/// Row key → string, as the device sends it (`{"0": "...", ..., "M": "..."}`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowMap(BTreeMap<String, String>);

impl RowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The row's string, empty when the row is missing.
    pub fn row(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// What the clock reports it is showing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTelemetry {
    #[serde(alias = "activemodes", default)]
    pub active_mode_chain: Vec<ModeRef>,
    pub time: TimeOfDay,
    /// Letters printed on the face.
    #[serde(default)]
    pub text: RowMap,
    /// Palette selector per lit cell, space for unlit.
    #[serde(default)]
    pub colors: RowMap,
}

// ── Grid ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    /// `None` for an unlit cell.
    pub color: Option<Color>,
}

impl Cell {
    pub const BLANK: Cell = Cell { ch: ' ', color: None };

    pub fn is_lit(&self) -> bool {
        self.color.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridRow {
    pub key: &'static str,
    pub cells: Vec<Cell>,
}

/// A rendered frame: every row of [`ROW_KEYS`], each [`GRID_WIDTH`] cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    pub rows: Vec<GridRow>,
    /// Brightness of the mode that drew the frame (255 = unchanged).
    pub brightness: u8,
}

impl Grid {
    /// Nothing lit.
    pub fn blank() -> Self {
        Self {
            rows: ROW_KEYS
                .iter()
                .map(|&key| GridRow {
                    key,
                    cells: vec![Cell::BLANK; GRID_WIDTH],
                })
                .collect(),
            brightness: u8::MAX,
        }
    }

    pub fn row(&self, key: &str) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn cell(&self, key: &str, col: usize) -> Option<&Cell> {
        self.row(key).and_then(|r| r.cells.get(col))
    }

    pub fn lit_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .filter(|c| c.is_lit())
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.lit_count() == 0
    }
}

/// Text form for terminals: lit letters as-is, unlit cells as `.`.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let line: String = row
                .cells
                .iter()
                .map(|c| match (c.is_lit(), c.ch) {
                    (true, ' ') => '*',
                    (true, ch) => ch,
                    (false, _) => '.',
                })
                .collect();
            writeln!(f, "{:>1} {}", row.key, line)?;
        }
        Ok(())
    }
}

/// Build one row from its letters and selectors.
///
/// A column is lit only when its selector is not a space, exists, and has
/// a letter underneath it, and `color_of` gives it a color.
fn paint_row(
    key: &'static str,
    text: &str,
    selectors: &str,
    color_of: impl Fn(char) -> Option<Color>,
) -> GridRow {
    let letters: Vec<char> = text.chars().collect();
    let selectors: Vec<char> = selectors.chars().collect();

    let cells = (0..GRID_WIDTH)
        .map(|col| {
            let selector = selectors.get(col).copied().unwrap_or(' ');
            let color = match letters.get(col) {
                Some(_) if selector != ' ' => color_of(selector),
                _ => None,
            };
            match color {
                Some(color) => Cell {
                    ch: letters[col],
                    color: Some(color),
                },
                None => Cell::BLANK,
            }
        })
        .collect();

    GridRow { key, cells }
}

/// Live selectors for a row, with the minute row shifted into place.
fn live_selectors(live: &LiveTelemetry, key: &str) -> String {
    let row = live.colors.row(key);
    if key == MINUTE_ROW {
        format!("{}{}", " ".repeat(MINUTE_ROW_OFFSET), row)
    } else {
        row.to_string()
    }
}

// ── Renderer ─────────────────────────────────────────────────────────

/// Renders modes of one store snapshot with one palette.
pub struct GridRenderer<'a> {
    store: &'a ModeStore,
    palette: &'a ColorPalette,
}

impl<'a> GridRenderer<'a> {
    pub fn new(store: &'a ModeStore, palette: &'a ColorPalette) -> Self {
        Self { store, palette }
    }

    /// Render the leaf mode at `leaf`.
    ///
    /// Single-color modes light every cell the telemetry lights, in the
    /// mode's color. Pictures light cells from their own pixel rows.
    /// Off and anything that is not a leaf render blank.
    pub fn render(&self, leaf: ModeRef, live: &LiveTelemetry) -> Grid {
        let Some(mode) = self.store.get(leaf) else {
            return Grid::blank();
        };

        let rows = match mode {
            Mode::DigiClock(_) | Mode::WordClock(_) => {
                let color = mode
                    .base()
                    .map(|b| self.palette.resolve(&b.color))
                    .unwrap_or(Color::BLACK);
                ROW_KEYS
                    .iter()
                    .map(|&key| {
                        paint_row(key, live.text.row(key), &live_selectors(live, key), |_| {
                            Some(color)
                        })
                    })
                    .collect()
            }
            Mode::Picture(picture) => ROW_KEYS
                .iter()
                .map(|&key| {
                    paint_row(key, live.text.row(key), picture.row(key), |selector| {
                        picture
                            .color_for(selector)
                            .map(|name| self.palette.resolve(name))
                    })
                })
                .collect(),
            other => {
                tracing::warn!("{} is not a leaf mode, rendering blank", other.display_name());
                return Grid::blank();
            }
        };

        Grid {
            rows,
            brightness: mode.base().map(|b| b.brightness).unwrap_or(u8::MAX),
        }
    }

    /// Render the leaf of a resolution result; failed resolutions are off.
    pub fn render_resolved(
        &self,
        resolved: &Result<ResolutionChain, ResolveError>,
        live: &LiveTelemetry,
    ) -> Grid {
        match resolved {
            Ok(chain) => self.render(chain.leaf(), live),
            Err(e) => {
                tracing::warn!("{e}, rendering off");
                Grid::blank()
            }
        }
    }

    /// Render telemetry on its own, coloring each cell by its palette
    /// selector.
    pub fn render_telemetry(&self, live: &LiveTelemetry) -> Grid {
        let rows = ROW_KEYS
            .iter()
            .map(|&key| {
                paint_row(key, live.text.row(key), &live_selectors(live, key), |selector| {
                    Some(self.palette.by_selector(selector))
                })
            })
            .collect();

        Grid {
            rows,
            brightness: u8::MAX,
        }
    }

    /// Color representing `r` in mode lists.
    ///
    /// Composites take the color of what they would show: a timer its
    /// `mainMode` (or, given a time, its active window), an interval its
    /// first entry. Follows at most as many hops as the store has modes;
    /// anything unresolvable is black.
    pub fn preview_color(&self, r: ModeRef, time: Option<TimeOfDay>) -> Color {
        let mut next = r;
        for _ in 0..=self.store.modes.len() {
            next = match self.store.get(next) {
                Some(Mode::Timer(timer)) => match time {
                    Some(time) => select_window(timer, time),
                    None => timer.main_mode,
                },
                Some(Mode::Interval(interval)) => interval
                    .intervals
                    .first()
                    .map(|entry| entry.mode)
                    .unwrap_or(ModeRef::OFF),
                Some(mode) if mode.is_leaf() => {
                    return mode
                        .base()
                        .map(|b| self.palette.resolve(&b.color))
                        .unwrap_or(Color::BLACK);
                }
                _ => return Color::BLACK,
            };
        }
        tracing::debug!("Preview color of {r} exceeded the hop limit");
        Color::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const RED: Color = Color { r: 255, g: 0, b: 0 };
    const BLUE: Color = Color { r: 0, g: 0, b: 255 };

    fn live(colors: &[(&str, &str)]) -> LiveTelemetry {
        LiveTelemetry {
            active_mode_chain: vec![],
            time: TimeOfDay::new(10, 0),
            text: ROW_KEYS
                .iter()
                .map(|&key| {
                    let text = if key == MINUTE_ROW { "   ****    " } else { "ABCDEFGHIJK" };
                    (key, text)
                })
                .collect(),
            colors: colors.iter().copied().collect(),
        }
    }

    fn lit(grid: &Grid, key: &str) -> String {
        grid.row(key)
            .map(|r| r.cells.iter().map(|c| if c.is_lit() { c.ch } else { '.' }).collect())
            .unwrap_or_default()
    }

    fn with_picture(rows: &[(&str, &str)], color1: &str, color2: &str) -> ModeStore {
        let mut picture = picture(0, "red", color1, color2);
        for (key, row) in rows {
            picture.pixels.insert(key.to_string(), row.to_string());
        }
        store(vec![Mode::Picture(picture)], 0)
    }

    #[test]
    fn blank_grid_has_every_row() {
        let grid = Grid::blank();
        assert_eq!(grid.rows.len(), 12);
        assert!(grid.rows.iter().all(|r| r.cells.len() == GRID_WIDTH));
        assert!(grid.is_blank());
    }

    #[test]
    fn single_color_leaf_paints_live_cells() {
        let s = store(vec![digi(0, "red")], 0);
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[("0", "11  4"), ("3", " 2")]));

        assert_eq!(lit(&grid, "0"), "AB..E......");
        assert_eq!(lit(&grid, "3"), ".B.........");
        assert_eq!(grid.cell("0", 4).and_then(|c| c.color), Some(RED));
        assert_eq!(grid.lit_count(), 4);
        assert_eq!(grid.brightness, 50);
    }

    #[test]
    fn missing_color_renders_black() {
        let s = store(vec![word(0, "chartreuse")], 0);
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[("5", "1")]));
        assert_eq!(grid.cell("5", 0).and_then(|c| c.color), Some(Color::BLACK));
    }

    #[test]
    fn cells_past_text_are_blank() {
        let s = store(vec![digi(0, "red")], 0);
        let palette = ColorPalette::firmware();
        let mut telemetry = live(&[("1", "11111111111")]);
        telemetry.text.insert("1", "ABC".to_string());

        let grid = GridRenderer::new(&s, &palette).render(r(0), &telemetry);
        assert_eq!(lit(&grid, "1"), "ABC........");
    }

    #[test]
    fn picture_row_of_spaces_is_blank() {
        let s = with_picture(&[("0", "           "), ("a", "           ")], "blue", "off");
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[("0", "11111111111")]));
        assert!(grid.is_blank());
    }

    #[test]
    fn picture_selectors_pick_colors() {
        let s = with_picture(&[("2", "123 1")], "blue", "off");
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[]));

        assert_eq!(lit(&grid, "2"), "AB..E......");
        assert_eq!(grid.cell("2", 0).and_then(|c| c.color), Some(RED));
        assert_eq!(grid.cell("2", 1).and_then(|c| c.color), Some(BLUE));
        assert_eq!(grid.cell("2", 2).and_then(|c| c.color), None);
    }

    #[test]
    fn toggled_picture_cell_round_trips_to_blank() {
        let palette = ColorPalette::firmware();
        let blank = with_picture(&[], "blue", "white");
        let Mode::Picture(original) = &blank.modes[0] else {
            panic!("expected picture");
        };

        let toggled = original.toggle_pixel("4", 6, '2');
        let s = store(vec![Mode::Picture(toggled.clone())], 0);
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[]));
        assert_eq!(grid.cell("4", 6).and_then(|c| c.color), Some(BLUE));

        let restored = store(vec![Mode::Picture(toggled.toggle_pixel("4", 6, '2'))], 0);
        let grid = GridRenderer::new(&restored, &palette).render(r(0), &live(&[]));
        assert!(grid.is_blank());
    }

    #[rstest]
    #[case(-1)]
    #[case(7)]
    fn off_and_unknown_render_blank(#[case] leaf: i32) {
        let s = store(vec![digi(0, "red")], 0);
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(leaf), &live(&[("0", "11111111111")]));
        assert_eq!(grid, Grid::blank());
    }

    #[test]
    fn failed_resolution_renders_off() {
        let s = store(vec![digi(0, "red")], 0);
        let palette = ColorPalette::firmware();
        let resolved = Err(ResolveError::DepthExceeded { limit: 1 });
        let grid = GridRenderer::new(&s, &palette).render_resolved(&resolved, &live(&[("0", "1")]));
        assert!(grid.is_blank());
    }

    #[test]
    fn telemetry_minute_row_is_offset() {
        let s = store(vec![], -1);
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render_telemetry(&live(&[("M", "66"), ("9", "8 z")]));

        assert_eq!(lit(&grid, "M"), "...**......");
        assert_eq!(grid.cell("M", 3).and_then(|c| c.color), Some(BLUE));
        assert_eq!(grid.cell("9", 0).and_then(|c| c.color), Some(Color::new(255, 255, 255)));
        assert_eq!(grid.cell("9", 2).and_then(|c| c.color), Some(Color::BLACK));
    }

    #[rstest]
    #[case(2, None, RED)] // timer -> mainMode 0
    #[case(2, Some(TimeOfDay::new(23, 0)), BLUE)] // active window -> 1
    #[case(3, None, BLUE)] // interval -> first entry 1
    #[case(4, None, Color::BLACK)] // timer whose main mode is off
    #[case(5, None, Color::BLACK)] // cycle
    fn test_preview_color(#[case] index: i32, #[case] time: Option<TimeOfDay>, #[case] expected: Color) {
        let s = store(
            vec![
                word(0, "red"),
                digi(1, "blue"),
                timer(2, 0, &[(1, (22, 0), (6, 0))]),
                interval(3, &[(1, 10), (0, 10)]),
                timer(4, -1, &[]),
                timer(5, 6, &[]),
                interval(6, &[(5, 10)]),
            ],
            2,
        );
        let palette = ColorPalette::firmware();
        assert_eq!(GridRenderer::new(&s, &palette).preview_color(r(index), time), expected);
    }

    #[test]
    fn preview_color_follows_chain_as_long_as_the_store() {
        let s = store(vec![timer(0, 1, &[]), interval(1, &[(2, 10)]), digi(2, "red")], 0);
        let palette = ColorPalette::firmware();
        assert_eq!(GridRenderer::new(&s, &palette).preview_color(r(0), None), RED);
    }

    #[test]
    fn telemetry_accepts_device_field_name() {
        let json = r#"{"activemodes":[2,0],"time":{"hours":9,"minutes":41},
                       "text":{"0":"espistkfunf"},"colors":{"0":"11 111"}}"#;
        let telemetry: LiveTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(telemetry.active_mode_chain, vec![r(2), r(0)]);
        assert_eq!(telemetry.colors.row("0"), "11 111");
        assert_eq!(telemetry.text.row("M"), "");
    }

    #[test]
    fn display_marks_unlit_cells() {
        let s = store(vec![digi(0, "red")], 0);
        let palette = ColorPalette::firmware();
        let grid = GridRenderer::new(&s, &palette).render(r(0), &live(&[("0", "1 1")]));
        let text = grid.to_string();
        assert_eq!(text.lines().next(), Some("0 A.C........"));
        assert_eq!(text.lines().count(), 12);
    }
}
