//! `led-clock`: inspect and edit an LED word clock's mode store.
//!
//! Works on a JSON snapshot of the device's modes (the shape its REST API
//! serves) and never talks to the device itself.
//!
//! ## Usage
//! ```sh
//! led-clock --store modes.json validate
//! led-clock --store modes.json resolve --at 23:30 --elapsed 3=15
//! led-clock --store modes.json render --png preview.png
//! led-clock --store modes.json watch
//! led-clock --store modes.json fixed-time 07:45
//! ```
//!
//! Grids go to stdout; logs go to stderr (`RUST_LOG=debug` for resolution
//! steps).

use chrono::Timelike;
use clap::{Parser, Subcommand};
use led_clock::face;
use led_clock::grid::Grid;
use led_clock::mode::FixedTime;
use led_clock::{
    ColorPalette, ElapsedCounters, Mode, ModeMutation, ModeRef, ModeStore, PreviewConfig,
    ResolutionChain, ResolveError, TimeOfDay, is_running, resolve, setup_signal_handler, validate,
};
use led_clock::{GridRenderer, preview};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Inspect and edit an LED word clock's mode store
#[derive(Parser)]
#[command(name = "led-clock")]
#[command(about = "Validate, resolve and preview the modes of an LED word clock")]
#[command(version)]
struct Args {
    /// Mode store snapshot (device JSON)
    #[arg(long, default_value = "modes.json", global = true)]
    store: PathBuf,

    /// Palette JSON; defaults to the firmware's 15 colors
    #[arg(long, global = true)]
    palette: Option<PathBuf>,

    /// Pixel size of one LED in PNG previews
    #[arg(long, default_value = "16", global = true)]
    cell_size: u32,

    /// Pixels between LEDs in PNG previews
    #[arg(long, default_value = "2", global = true)]
    gap: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check for dangling references, cycles and an invalid current mode
    Validate,

    /// Print which mode is showing
    Resolve {
        #[command(flatten)]
        when: When,
    },

    /// Draw the face as text, optionally also as PNG
    Render {
        #[command(flatten)]
        when: When,

        /// Also write the frame to this PNG file
        #[arg(long)]
        png: Option<PathBuf>,
    },

    /// Re-render every second until Ctrl+C
    Watch,

    /// Select the mode at INDEX (-1 for off)
    SetCurrent {
        #[arg(allow_hyphen_values = true)]
        index: i32,
    },

    /// Pin the clock to a time of day, or release it with --off
    FixedTime {
        #[arg(long, conflicts_with = "time")]
        off: bool,

        /// HH:MM
        #[arg(required_unless_present = "off")]
        time: Option<TimeOfDay>,
    },

    /// Replace one slot with the mode in FILE (JSON, slot taken from its index)
    ReplaceMode { file: PathBuf },
}

#[derive(clap::Args)]
struct When {
    /// Time of day as HH:MM; defaults to the local clock
    #[arg(long)]
    at: Option<TimeOfDay>,

    /// Seconds a composite mode has been active, as SLOT=SECONDS (repeatable)
    #[arg(long = "elapsed", value_parser = parse_elapsed)]
    elapsed: Vec<(usize, u64)>,
}

impl When {
    fn time(&self) -> TimeOfDay {
        self.at.unwrap_or_else(wall_clock)
    }

    fn counters(&self) -> ElapsedCounters {
        self.elapsed.iter().copied().collect()
    }
}

fn parse_elapsed(s: &str) -> Result<(usize, u64), String> {
    let (slot, seconds) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=SECONDS, got {s:?}"))?;
    let slot = slot.trim().parse().map_err(|e| format!("bad slot {slot:?}: {e}"))?;
    let seconds = seconds
        .trim()
        .parse()
        .map_err(|e| format!("bad seconds {seconds:?}: {e}"))?;
    Ok((slot, seconds))
}

fn wall_clock() -> TimeOfDay {
    let now = chrono::Local::now();
    TimeOfDay::new(now.hour() as u8, now.minute() as u8)
}

/// Resolve and render one frame at `now`.
fn frame(
    store: &ModeStore,
    palette: &ColorPalette,
    now: TimeOfDay,
    counters: &ElapsedCounters,
) -> (Result<ResolutionChain, ResolveError>, Grid) {
    let resolved = resolve(store, now, counters);
    let chain = resolved.clone().unwrap_or_else(|_| ResolutionChain::off());
    let live = face::telemetry(store, palette, &chain, store.time_at(now));
    let grid = GridRenderer::new(store, palette).render_resolved(&resolved, &live);
    (resolved, grid)
}

/// Apply `mutation` and write the new snapshot back to `path`.
fn commit(store: &ModeStore, mutation: ModeMutation, path: &Path) -> Result<(), led_clock::Error> {
    let next = store.apply(mutation)?;
    next.save(path)?;
    tracing::info!("Saved {}", path.display());
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let palette = match &args.palette {
        Some(path) => ColorPalette::load(path)?,
        None => ColorPalette::firmware(),
    };
    let store = ModeStore::load(&args.store)?;
    let preview_config = PreviewConfig::new(args.cell_size, args.gap);

    match args.command {
        Command::Validate => {
            let report = validate(&store);
            for violation in &report.violations {
                println!("{violation}");
            }
            report.into_result()?;
            println!(
                "ok: {} slots, current {}",
                store.modes.len(),
                store.current
            );
        }

        Command::Resolve { when } => {
            let chain = resolve(&store, when.time(), &when.counters())?;
            println!("{chain}");
            println!("{}", chain.describe(&store));
        }

        Command::Render { when, png } => {
            let now = when.time();
            let (resolved, grid) = frame(&store, &palette, now, &when.counters());
            if let Ok(chain) = &resolved {
                println!("{} at {}", chain.describe(&store), store.time_at(now));
            }
            print!("{grid}");
            if let Some(path) = png {
                preview::save_png(&grid, preview_config, &path)?;
            }
        }

        Command::Watch => {
            let running = setup_signal_handler()?;
            let mut counters = ElapsedCounters::new();
            tracing::info!("Watching {} (Ctrl+C to stop)", args.store.display());

            while is_running(&running) {
                let now = wall_clock();
                let (resolved, grid) = frame(&store, &palette, now, &counters);
                match &resolved {
                    Ok(chain) => {
                        println!("{} at {}", chain.describe(&store), store.time_at(now));
                        counters.advance(&store, chain, 1);
                    }
                    Err(e) => println!("off ({e})"),
                }
                println!("{grid}");
                thread::sleep(Duration::from_secs(1));
            }

            tracing::info!("Shutting down cleanly.");
        }

        Command::SetCurrent { index } => {
            commit(&store, ModeMutation::SetCurrent(ModeRef::new(index)), &args.store)?;
        }

        Command::FixedTime { off, time } => {
            let fixed_time = match time {
                Some(time) if !off => FixedTime::at(time),
                _ => FixedTime {
                    enabled: false,
                    ..store.fixed_time
                },
            };
            commit(&store, ModeMutation::SetFixedTime(fixed_time), &args.store)?;
        }

        Command::ReplaceMode { file } => {
            let text = std::fs::read_to_string(&file).map_err(|source| led_clock::Error::Io {
                path: file.clone(),
                source,
            })?;
            let mode: Mode = serde_json::from_str(&text).map_err(|source| led_clock::Error::Json {
                path: file.clone(),
                source,
            })?;
            tracing::info!("Replacing slot {} with {}", mode.index(), mode.display_name());
            commit(&store, ModeMutation::ReplaceMode(mode), &args.store)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for grids.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();

    let args = Args::parse();
    tracing::debug!("led-clock v{}", env!("CARGO_PKG_VERSION"));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
