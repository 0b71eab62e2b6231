//! The physical clock face, and what the clock would light on it.
//!
//! The device reports the cells it lights as [`LiveTelemetry`]. This module
//! produces the same telemetry locally from a resolved chain, so the
//! renderer can preview a mode without the device:
//! - word clock: a German sentence placed word by word on the letter layout
//! - digital clock: 3x5 digits, hours above minutes
//! - picture: the stored pixel rows, translated to palette selectors
//!
//! The minute-indicator LEDs in the `M` row light `minutes % 5` of four.

use crate::grid::{LiveTelemetry, MINUTE_ROW, ROW_KEYS, RowMap};
use crate::mode::{GRID_WIDTH, Mode, TimeOfDay};
use crate::palette::{ColorPalette, OFF};
use crate::resolve::ResolutionChain;
use crate::store::ModeStore;
use std::collections::BTreeMap;

/// Letters printed on the face, top to bottom.
pub const LETTERS: [&str; 11] = [
    "espistkfunf",
    "dreiviertel",
    "zwanzigzehn",
    "uminutenull",
    "vorqkjanach",
    "halbNELFUNF",
    "EINSZWEIUND",
    "DREISIGVIER",
    "SECHSXYACHT",
    "SIEBENZWOLF",
    "ZEHNEUNAUHR",
];

/// The `M` row as printed: four dots after three unused columns.
pub const MINUTE_LETTERS: &str = "   ****    ";

const MINUTE_LEDS: usize = 4;

/// Face letters for every row, in telemetry shape.
pub fn letters() -> RowMap {
    ROW_KEYS
        .iter()
        .zip(LETTERS.iter().chain(std::iter::once(&MINUTE_LETTERS)))
        .map(|(&key, &text)| (key, text))
        .collect()
}

// ── Word clock ───────────────────────────────────────────────────────

/// One way of saying a five-minute segment.
struct Phrase {
    /// Shown in the mode editor and stored in `WordClockMode::times`.
    label: &'static str,
    /// Words before the hour.
    prefix: &'static str,
    /// Whether the phrase names the coming hour ("viertel vor ELF").
    next_hour: bool,
    /// Full-hour form, ending in `UHR`.
    with_uhr: bool,
}

const fn phrase(label: &'static str, prefix: &'static str, next_hour: bool) -> Phrase {
    Phrase {
        label,
        prefix,
        next_hour,
        with_uhr: false,
    }
}

/// Variants per segment (`minutes / 5`); the first is the default.
const PHRASES: [&[Phrase]; 12] = [
    &[
        Phrase {
            label: "10 Uhr",
            prefix: "",
            next_hour: false,
            with_uhr: true,
        },
        phrase("um 10", "um ", false),
    ],
    &[phrase("5 nach 10", "funf nach ", false)],
    &[phrase("10 nach 10", "zehn nach ", false)],
    &[
        phrase("viertel nach 10", "viertel nach ", false),
        phrase("viertel 11", "viertel ", true),
    ],
    &[
        phrase("10 vor halb 11", "zehn vor halb ", true),
        phrase("zwanzig nach 10", "zwanzig nach ", false),
    ],
    &[phrase("5 vor halb 11", "funf vor halb ", true)],
    &[phrase("halb 11", "halb ", true)],
    &[phrase("5 nach halb 11", "funf nach halb ", true)],
    &[
        phrase("10 nach halb 11", "zehn nach halb ", true),
        phrase("20 vor 11", "zwanzig vor ", true),
    ],
    &[
        phrase("viertel vor 11", "viertel vor ", true),
        phrase("dreiviertel 11", "dreiviertel ", true),
    ],
    &[phrase("10 vor 11", "zehn vor ", true)],
    &[phrase("5 vor 11", "funf vor ", true)],
];

/// Hour words, modulo 12. One o'clock is `EIN` before `UHR`, `EINS` otherwise.
const HOURS: [&str; 12] = [
    "ZWOLF", "EINS", "ZWEI", "DREI", "VIER", "FUNF", "SECHS", "SIEBEN", "ACHT", "NEUN", "ZEHN",
    "ELF",
];

fn segment_key(segment: usize) -> String {
    char::from_digit(segment as u32, 16)
        .map(String::from)
        .unwrap_or_default()
}

/// Selectable variants per segment key (`"0"`..`"b"`), default first.
pub fn phrase_slots() -> BTreeMap<String, Vec<&'static str>> {
    PHRASES
        .iter()
        .enumerate()
        .map(|(segment, variants)| {
            (
                segment_key(segment),
                variants.iter().map(|p| p.label).collect(),
            )
        })
        .collect()
}

/// The sentence a word clock shows at `hours:minutes`.
///
/// `times` picks a variant per segment by label; unknown labels use the
/// default.
pub fn sentence(hours: u8, minutes: u8, times: &BTreeMap<String, String>) -> String {
    let segment = (minutes as usize / 5).min(PHRASES.len() - 1);
    let variants = PHRASES[segment];
    let chosen = times
        .get(&segment_key(segment))
        .and_then(|label| variants.iter().find(|p| p.label == label.as_str()))
        .unwrap_or(&variants[0]);

    let hour = (hours as usize + usize::from(chosen.next_hour)) % HOURS.len();
    let hour_word = match (hour, chosen.with_uhr) {
        (1, true) => "EIN UHR".to_string(),
        (_, true) => format!("{} UHR", HOURS[hour]),
        (_, false) => HOURS[hour].to_string(),
    };

    format!("es ist {}{}", chosen.prefix, hour_word)
}

/// Positions (row-major, 0..121) of the letters spelling `sentence`.
///
/// Each word is searched for from the end of the previous one. Returns
/// `None` when a word cannot be placed.
pub fn place_words(sentence: &str) -> Option<Vec<usize>> {
    let face: String = LETTERS.concat();
    let mut lit = Vec::new();
    let mut from = 0;

    for word in sentence.split_whitespace() {
        let Some(found) = face[from..].find(word) else {
            tracing::warn!("Word {word:?} of {sentence:?} does not fit on the face");
            return None;
        };
        let start = from + found;
        lit.extend(start..start + word.len());
        from = start + word.len();
    }
    Some(lit)
}

fn minute_indicator(minutes: u8, selector: char) -> String {
    let count = (minutes as usize % 5).min(MINUTE_LEDS);
    std::iter::repeat_n(selector, count).collect()
}

fn word_clock_rows(sentence: &str, selector: char) -> Vec<String> {
    let mut rows = vec![vec![' '; GRID_WIDTH]; LETTERS.len()];
    for position in place_words(sentence).unwrap_or_default() {
        rows[position / GRID_WIDTH][position % GRID_WIDTH] = selector;
    }
    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}

// ── Digital clock ────────────────────────────────────────────────────

/// 3x5 glyphs for 0-9.
const DIGITS: [[&str; 5]; 10] = [
    ["###", "# #", "# #", "# #", "###"],
    [" # ", "## ", " # ", " # ", "###"],
    ["###", "  #", "###", "#  ", "###"],
    ["###", "  #", "###", "  #", "###"],
    ["# #", "# #", "###", "  #", "  #"],
    ["###", "#  ", "###", "  #", "###"],
    ["###", "#  ", "###", "# #", "###"],
    ["###", "  #", "  #", "  #", "  #"],
    ["###", "# #", "###", "# #", "###"],
    ["###", "# #", "###", "  #", "###"],
];

/// Left column of the tens and ones digit.
const DIGIT_COLUMNS: [usize; 2] = [2, 6];
const MINUTES_TOP_ROW: usize = 6;

fn digi_clock_rows(time: TimeOfDay, selector: char) -> Vec<String> {
    let mut rows = vec![vec![' '; GRID_WIDTH]; LETTERS.len()];

    for (top, value) in [(0, time.hours), (MINUTES_TOP_ROW, time.minutes)] {
        let digits = [(value / 10 % 10) as usize, (value % 10) as usize];
        for (digit, left) in digits.into_iter().zip(DIGIT_COLUMNS) {
            for (dy, line) in DIGITS[digit].iter().enumerate() {
                for (dx, pixel) in line.chars().enumerate() {
                    if pixel == '#' {
                        rows[top + dy][left + dx] = selector;
                    }
                }
            }
        }
    }

    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}

// ── Telemetry ────────────────────────────────────────────────────────

/// Telemetry the clock would report while showing `chain` at `time`.
///
/// `time` is the time the clock shows, i.e. already including the store's
/// fixed-time override.
pub fn telemetry(
    store: &ModeStore,
    palette: &ColorPalette,
    chain: &ResolutionChain,
    time: TimeOfDay,
) -> LiveTelemetry {
    let selector = |name: &str| palette.selector_of(name).unwrap_or('0');
    let mut colors = RowMap::new();

    match store.get(chain.leaf()) {
        Some(Mode::WordClock(mode)) => {
            let text = sentence(time.hours, time.minutes, &mode.times);
            let lit = selector(mode.base.color.as_str());
            for (key, row) in ROW_KEYS.iter().zip(word_clock_rows(&text, lit)) {
                colors.insert(key, row);
            }
            colors.insert(MINUTE_ROW, minute_indicator(time.minutes, lit));
        }
        Some(Mode::DigiClock(base)) => {
            let lit = selector(base.color.as_str());
            for (key, row) in ROW_KEYS.iter().zip(digi_clock_rows(time, lit)) {
                colors.insert(key, row);
            }
        }
        Some(Mode::Picture(picture)) => {
            for key in ROW_KEYS {
                let row: String = picture
                    .row(key)
                    .chars()
                    .take(GRID_WIDTH)
                    .map(|pixel| match picture.color_for(pixel) {
                        Some(name) if name != OFF => selector(name),
                        _ => ' ',
                    })
                    .collect();
                colors.insert(key, row);
            }
        }
        _ => {}
    }

    LiveTelemetry {
        active_mode_chain: chain.as_slice().to_vec(),
        time,
        text: letters(),
        colors,
    }
}
