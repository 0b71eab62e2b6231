//! Mode graph, resolution and grid preview for an LED-matrix word clock.
//!
//! The clock can show several independent modes: a word clock, a digital
//! clock, a static picture, or composite modes (timer windows and round-robin
//! intervals) that switch between other modes. This crate holds the pieces
//! that have real invariants:
//! - [`mode`] and [`store`]: the mode records and the snapshot loaded from the device
//! - [`validate`]: referential integrity and acyclicity of composite references
//! - [`resolve`]: which leaf mode is showing at a given time
//! - [`grid`]: rendering a leaf mode plus live telemetry into an 11x11 (+M) grid
//! - [`face`]: synthesizing that telemetry locally from the letter layout
//! - [`preview`]: exporting a grid as a PNG
//!
//! It also carries the small shared helpers the `led-clock` binary uses:
//! the RGB [`Color`] type, preview geometry, and Ctrl+C handling.

pub mod error;
pub mod face;
pub mod grid;
pub mod mode;
pub mod palette;
pub mod preview;
pub mod resolve;
pub mod store;
pub mod validate;

pub use error::{Error, ResolveError, Violation};
pub use grid::{Grid, GridRenderer, LiveTelemetry};
pub use mode::{Mode, ModeRef, TimeOfDay};
pub use palette::ColorPalette;
pub use resolve::{ElapsedCounters, ResolutionChain, resolve};
pub use store::{ModeMutation, ModeStore};
pub use validate::{ValidationReport, validate};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Preview configuration ──────────────────────────────────────────

/// Geometry of the PNG preview: how many pixels each LED cell occupies.
///
/// # Rust concept: derive macros
/// `Clone, Copy` make this cheaply copyable (it's just two u32s).
/// Passing it explicitly keeps the preview code free of hidden global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewConfig {
    pub cell_size: u32,
    pub gap: u32,
}

impl PreviewConfig {
    pub fn new(cell_size: u32, gap: u32) -> Self {
        Self { cell_size, gap }
    }

    /// Pixel extent of `cells` cells laid out with a gap before each one
    /// and a closing gap after the last.
    pub fn extent(&self, cells: u32) -> u32 {
        cells * self.cell_size + (cells + 1) * self.gap
    }

    /// Top-left pixel offset of the cell at position `index`.
    pub fn offset(&self, index: u32) -> u32 {
        self.gap + index * (self.cell_size + self.gap)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cell_size: 16,
            gap: 2,
        }
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// An RGB color as rendered into a grid cell.
///
/// Palette entries carry a name on top of this (see [`palette::PaletteEntry`]);
/// once resolved, only the channels matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// What every fail-closed lookup renders.
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`, lowercase, the form the configuration UI shows.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Scale the channels by a mode brightness (1-255, 255 = unchanged).
    pub fn apply_brightness(self, brightness: u8) -> Self {
        if brightness == u8::MAX {
            return self;
        }
        let scale = |c: u8| ((c as u16 * brightness as u16) / 255) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

// ── Signal handling ────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// # Rust concept: Arc and AtomicBool
/// The `watch` loop and the signal handler share the flag. `Arc` gives
/// both shared ownership; `AtomicBool` needs no mutex for a single bool.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
