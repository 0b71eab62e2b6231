//! Which leaf mode is showing right now.
//!
//! Resolution walks from the selected mode through composite modes until it
//! reaches something that draws (or off). It is a pure function of the
//! store snapshot, the time of day, and the elapsed-time counters; the
//! caller owns and advances those counters.

use crate::error::ResolveError;
use crate::mode::{IntervalMode, Mode, ModeRef, TimeOfDay, TimerMode};
use crate::store::ModeStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ── Elapsed counters ─────────────────────────────────────────────────

/// Seconds each composite mode has been active, keyed by slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElapsedCounters(BTreeMap<usize, u64>);

impl ElapsedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds for `slot`; composites never seen count from zero.
    pub fn get(&self, slot: usize) -> u64 {
        self.0.get(&slot).copied().unwrap_or(0)
    }

    pub fn set(&mut self, slot: usize, seconds: u64) {
        self.0.insert(slot, seconds);
    }

    /// Add `seconds` to every composite mode on `chain`.
    ///
    /// Composites that are no longer on the chain are forgotten, so they
    /// start from their first entry when they come back.
    pub fn advance(&mut self, store: &ModeStore, chain: &ResolutionChain, seconds: u64) {
        let active: Vec<usize> = chain
            .iter()
            .filter_map(|r| r.slot())
            .filter(|slot| store.modes.get(*slot).is_some_and(Mode::is_composite))
            .collect();

        self.0.retain(|slot, _| active.contains(slot));
        for slot in active {
            *self.0.entry(slot).or_default() += seconds;
        }
    }
}

impl FromIterator<(usize, u64)> for ElapsedCounters {
    fn from_iter<I: IntoIterator<Item = (usize, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Resolution chain ─────────────────────────────────────────────────

/// Mode references from the selected mode down to what is displayed.
///
/// Never empty; the last entry is a leaf mode or off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolutionChain(Vec<ModeRef>);

impl ResolutionChain {
    /// The chain of a clock that shows nothing.
    pub fn off() -> Self {
        Self(vec![ModeRef::OFF])
    }

    pub fn leaf(&self) -> ModeRef {
        self.0.last().copied().unwrap_or(ModeRef::OFF)
    }

    pub fn is_off(&self) -> bool {
        self.leaf().is_off()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ModeRef> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[ModeRef] {
        &self.0
    }

    /// Human-readable form, e.g. `Nacht (TIMER) / Digi (DIGICLOCK)`.
    pub fn describe(&self, store: &ModeStore) -> String {
        self.iter()
            .map(|r| match store.get(r) {
                Some(mode) => mode.display_name(),
                None => "OFF".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl fmt::Display for ResolutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(" -> "))
    }
}

// ── Resolver ─────────────────────────────────────────────────────────

/// Resolve the currently displayed mode.
///
/// `now` is the wall clock; the store's fixed-time override wins when it is
/// enabled. At most one composite hop per stored mode is taken: more than
/// that can only mean a reference cycle.
pub fn resolve(
    store: &ModeStore,
    now: TimeOfDay,
    elapsed: &ElapsedCounters,
) -> Result<ResolutionChain, ResolveError> {
    let time = store.time_at(now);
    let limit = store.modes.len();
    let mut chain = Vec::new();
    let mut next = store.current;
    let mut hops = 0;

    loop {
        chain.push(next);
        if next.is_off() {
            return Ok(ResolutionChain(chain));
        }

        let slot = next.slot();
        let winner = match slot.and_then(|s| store.modes.get(s)) {
            None | Some(Mode::Empty { .. }) => return Err(ResolveError::DanglingReference(next)),
            Some(Mode::Off) => {
                chain.push(ModeRef::OFF);
                return Ok(ResolutionChain(chain));
            }
            Some(Mode::Timer(timer)) => select_window(timer, time),
            Some(Mode::Interval(interval)) => {
                select_interval(interval, elapsed.get(slot.unwrap_or_default()))
            }
            Some(_) => return Ok(ResolutionChain(chain)),
        };

        hops += 1;
        if hops > limit {
            tracing::warn!("Resolution of {} exceeded {} hops", store.current, limit);
            return Err(ResolveError::DepthExceeded { limit });
        }
        tracing::trace!("{} selects {} at {}", next, winner, time);
        next = winner;
    }
}

/// First window containing `time`, in list order; `mainMode` otherwise.
pub(crate) fn select_window(timer: &TimerMode, time: TimeOfDay) -> ModeRef {
    timer
        .timers
        .iter()
        .find(|window| window.contains(time))
        .map(|window| window.mode)
        .unwrap_or(timer.main_mode)
}

/// Entry whose span contains `elapsed` modulo the cycle length.
///
/// A list with no seconds at all shows nothing.
fn select_interval(interval: &IntervalMode, elapsed: u64) -> ModeRef {
    let cycle: u64 = interval.intervals.iter().map(|i| i.seconds as u64).sum();
    if cycle == 0 {
        return ModeRef::OFF;
    }

    let position = elapsed % cycle;
    let mut end = 0;
    for entry in &interval.intervals {
        end += entry.seconds as u64;
        if position < end {
            return entry.mode;
        }
    }
    ModeRef::OFF
}
