//! Mode records as the clock stores them.
//!
//! A mode is one of a handful of shapes, discriminated on the wire by its
//! `"type"` field. Leaf modes (word clock, digital clock, picture) draw
//! something themselves; composite modes (timer, interval) only pick another
//! mode by index.
//!
//! ## Rust concepts
//! - `enum` with data variants as a tagged union (`#[serde(tag = "type")]`)
//! - newtypes (`ModeRef`) to keep raw integers from mixing with slot positions
//! - `#[serde(flatten)]` to share the common name/color/brightness fields

use crate::error::RefSite;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Width of every grid row, in cells.
pub const GRID_WIDTH: usize = 11;

// ── References ───────────────────────────────────────────────────────

/// A reference to a mode slot, or `-1` for off.
///
/// Kept as the raw device integer so that bad data (other negative values,
/// out-of-range indices) survives loading and can be reported by the
/// validator instead of being silently dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeRef(i32);

impl ModeRef {
    pub const OFF: ModeRef = ModeRef(-1);

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_off(self) -> bool {
        self == Self::OFF
    }

    /// Slot position, if the reference is non-negative.
    pub fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for ModeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Time of day ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hours: u8,
    pub minutes: u8,
}

impl TimeOfDay {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    pub fn new(hours: u8, minutes: u8) -> Self {
        Self { hours, minutes }
    }

    /// Minutes since midnight, wrapped into a single day.
    pub fn minute_of_day(self) -> u16 {
        (self.hours as u16 * 60 + self.minutes as u16) % Self::MINUTES_PER_DAY
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected HH:MM (00:00-23:59), got {0:?}")]
pub struct ParseTimeError(String);

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        let hours: u8 = h.trim().parse().map_err(|_| err())?;
        let minutes: u8 = m.trim().parse().map_err(|_| err())?;
        if hours > 23 || minutes > 59 {
            return Err(err());
        }
        Ok(Self::new(hours, minutes))
    }
}

/// Operator-supplied clock override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTime {
    pub enabled: bool,
    pub hours: u8,
    pub minutes: u8,
}

impl FixedTime {
    pub fn at(time: TimeOfDay) -> Self {
        Self {
            enabled: true,
            hours: time.hours,
            minutes: time.minutes,
        }
    }

    /// The override, if enabled.
    pub fn time(&self) -> Option<TimeOfDay> {
        self.enabled
            .then(|| TimeOfDay::new(self.hours, self.minutes))
    }
}

// ── Mode payloads ────────────────────────────────────────────────────

fn default_brightness() -> u8 {
    50
}

/// Brightness ranges 1-255; a stored 0 loads as 1.
fn brightness_at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(u8::deserialize(deserializer)?.max(1))
}

fn default_off() -> String {
    crate::palette::OFF.to_string()
}

/// Fields every named mode carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeBase {
    pub index: i32,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// 1-255
    #[serde(
        default = "default_brightness",
        deserialize_with = "brightness_at_least_one"
    )]
    pub brightness: u8,
}

impl ModeBase {
    pub fn new(index: i32, name: &str, color: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            color: color.to_string(),
            brightness: default_brightness(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordClockMode {
    #[serde(flatten)]
    pub base: ModeBase,
    /// Phrase slot (`"0"`..`"b"`) → chosen variant label.
    #[serde(default)]
    pub times: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureMode {
    #[serde(flatten)]
    pub base: ModeBase,
    /// Row key → selector string (` `, `1`, `2`, `3` per column).
    #[serde(default)]
    pub pixels: BTreeMap<String, String>,
    #[serde(default = "default_off")]
    pub color1: String,
    #[serde(default = "default_off")]
    pub color2: String,
}

impl PictureMode {
    /// Stored selectors for a row, empty when the row was never drawn.
    pub fn row(&self, key: &str) -> &str {
        self.pixels.get(key).map(String::as_str).unwrap_or("")
    }

    /// Palette name a pixel selector paints with, `None` for blank.
    pub fn color_for(&self, selector: char) -> Option<&str> {
        let name = match selector {
            '1' => return Some(self.base.color.as_str()),
            '2' => &self.color1,
            '3' => &self.color2,
            _ => return None,
        };
        (name != crate::palette::OFF).then_some(name.as_str())
    }

    /// Paint one cell with `selector`, or clear it if it already holds it.
    ///
    /// Returns the whole edited mode; stored modes are only ever replaced.
    pub fn toggle_pixel(&self, row: &str, col: usize, selector: char) -> PictureMode {
        let mut edited = self.clone();
        if col >= GRID_WIDTH {
            return edited;
        }

        let mut cells: Vec<char> = self.row(row).chars().collect();
        if cells.len() < GRID_WIDTH {
            cells.resize(GRID_WIDTH, ' ');
        }
        cells[col] = if cells[col] == selector { ' ' } else { selector };

        edited
            .pixels
            .insert(row.to_string(), cells.into_iter().collect());
        edited
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub mode: ModeRef,
    pub start_hour: u8,
    pub start_minute: u8,
    pub end_hour: u8,
    pub end_minute: u8,
}

impl Timer {
    pub fn new(mode: ModeRef, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            mode,
            start_hour: start.hours,
            start_minute: start.minutes,
            end_hour: end.hours,
            end_minute: end.minutes,
        }
    }

    pub fn start(&self) -> TimeOfDay {
        TimeOfDay::new(self.start_hour, self.start_minute)
    }

    pub fn end(&self) -> TimeOfDay {
        TimeOfDay::new(self.end_hour, self.end_minute)
    }

    /// Whether `time` falls in `[start, end)`.
    ///
    /// When `end <= start` the window wraps past midnight, so 22:00-06:00
    /// covers both 23:00 and 02:00, and an equal start and end covers the
    /// whole day.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        let start = self.start().minute_of_day();
        let end = self.end().minute_of_day();
        let now = time.minute_of_day();
        if start < end {
            start <= now && now < end
        } else {
            now >= start || now < end
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerMode {
    #[serde(flatten)]
    pub base: ModeBase,
    pub main_mode: ModeRef,
    #[serde(default)]
    pub timers: Vec<Timer>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub mode: ModeRef,
    pub seconds: u32,
}

impl Interval {
    pub fn new(mode: ModeRef, seconds: u32) -> Self {
        Self { mode, seconds }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalMode {
    #[serde(flatten)]
    pub base: ModeBase,
    #[serde(default)]
    pub intervals: Vec<Interval>,
}

// ── Mode ─────────────────────────────────────────────────────────────

/// A mode record.
///
/// Rust concept: ENUMS WITH DATA
/// The compiler makes every `match` handle every variant, so the
/// leaf-versus-composite split the resolver depends on lives in one place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Mode {
    /// Unused slot; never displayed, never selectable.
    #[serde(rename = "EMPTY")]
    Empty { index: i32 },
    /// The synthetic "display nothing" mode (index -1).
    #[serde(rename = "OFF")]
    Off,
    #[serde(rename = "DIGICLOCK")]
    DigiClock(ModeBase),
    #[serde(rename = "WORDCLOCK")]
    WordClock(WordClockMode),
    #[serde(rename = "PICTURE")]
    Picture(PictureMode),
    #[serde(rename = "TIMER")]
    Timer(TimerMode),
    #[serde(rename = "INTERVAL")]
    Interval(IntervalMode),
}

impl Mode {
    pub fn index(&self) -> ModeRef {
        match self {
            Mode::Empty { index } => ModeRef::new(*index),
            Mode::Off => ModeRef::OFF,
            _ => self
                .base()
                .map(|b| ModeRef::new(b.index))
                .unwrap_or(ModeRef::OFF),
        }
    }

    /// The wire discriminator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Mode::Empty { .. } => "EMPTY",
            Mode::Off => "OFF",
            Mode::DigiClock(_) => "DIGICLOCK",
            Mode::WordClock(_) => "WORDCLOCK",
            Mode::Picture(_) => "PICTURE",
            Mode::Timer(_) => "TIMER",
            Mode::Interval(_) => "INTERVAL",
        }
    }

    pub fn base(&self) -> Option<&ModeBase> {
        match self {
            Mode::Empty { .. } | Mode::Off => None,
            Mode::DigiClock(base) => Some(base),
            Mode::WordClock(m) => Some(&m.base),
            Mode::Picture(m) => Some(&m.base),
            Mode::Timer(m) => Some(&m.base),
            Mode::Interval(m) => Some(&m.base),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Mode::DigiClock(_) | Mode::WordClock(_) | Mode::Picture(_)
        )
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Mode::Timer(_) | Mode::Interval(_))
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self, Mode::Empty { .. })
    }

    /// Outgoing composite references, in declaration order.
    pub fn references(&self) -> Vec<(RefSite, ModeRef)> {
        match self {
            Mode::Timer(m) => std::iter::once((RefSite::MainMode, m.main_mode))
                .chain(
                    m.timers
                        .iter()
                        .enumerate()
                        .map(|(i, t)| (RefSite::Timer(i), t.mode)),
                )
                .collect(),
            Mode::Interval(m) => m
                .intervals
                .iter()
                .enumerate()
                .map(|(i, iv)| (RefSite::Interval(i), iv.mode))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `"name (TYPE)"` for named modes, the bare type otherwise.
    pub fn display_name(&self) -> String {
        match self.base() {
            Some(base) => format!("{} ({})", base.name, self.type_name()),
            None => self.type_name().to_string(),
        }
    }
}
