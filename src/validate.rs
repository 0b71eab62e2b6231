//! Referential integrity and acyclicity of composite mode references.
//!
//! The validator never repairs anything; it lists what is wrong so the
//! editing layer can refuse to save. Dangling references and cycles are
//! checked independently, so one broken edge does not hide the other.
//!
//! ## Algorithm
//! Nodes are slot indices, edges are the references of TIMER (`mainMode`,
//! `timers[].mode`) and INTERVAL (`intervals[].mode`) modes that point at a
//! valid target. A depth-first walk marks nodes unvisited / in progress /
//! done; reaching an in-progress node again closes a cycle.

use crate::error::{Error, RefSite, Violation, ViolationKind};
use crate::mode::Mode;
use crate::store::ModeStore;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind() == kind).count()
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Validation(self.violations))
        }
    }
}

/// Check every invariant of the mode graph.
pub fn validate(store: &ModeStore) -> ValidationReport {
    let mut violations = Vec::new();

    let current = store.current;
    if !current.is_off() && !store.get(current).is_some_and(Mode::is_selectable) {
        violations.push(Violation::InvalidCurrent(current));
    }

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); store.modes.len()];
    for (from, mode) in store.modes.iter().enumerate() {
        // Edits address slots by `index`, resolution by position.
        if !matches!(mode, Mode::Off) && mode.index().slot() != Some(from) {
            violations.push(Violation::MisplacedMode {
                slot: from,
                index: mode.index(),
            });
        }
        for (site, target) in mode.references() {
            if target.is_off() {
                continue;
            }
            if target.slot() == Some(from) {
                violations.push(Violation::SelfReference { mode: from, site });
                continue;
            }
            match target.slot().zip(store.get(target)) {
                Some((slot, found)) if accepts(site, found) => edges[from].push(slot),
                _ => violations.push(Violation::DanglingReference { from, site, target }),
            }
        }
    }

    violations.extend(find_cycles(&edges));
    ValidationReport { violations }
}

/// Whether a reference at `site` may point at `target`.
///
/// Timer windows may not select a stored OFF slot (they say "off" with -1);
/// nothing may select an EMPTY slot.
fn accepts(site: RefSite, target: &Mode) -> bool {
    match target {
        Mode::Empty { .. } => false,
        Mode::Off => !matches!(site, RefSite::Timer(_)),
        _ => true,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn find_cycles(edges: &[Vec<usize>]) -> Vec<Violation> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut stack = Vec::new();
    let mut cycles = Vec::new();

    for node in 0..edges.len() {
        if marks[node] == Mark::Unvisited {
            visit(node, edges, &mut marks, &mut stack, &mut cycles);
        }
    }
    cycles
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    cycles: &mut Vec<Violation>,
) {
    marks[node] = Mark::InProgress;
    stack.push(node);

    for &next in &edges[node] {
        match marks[next] {
            Mark::Unvisited => visit(next, edges, marks, stack, cycles),
            Mark::InProgress => {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut path = stack[start..].to_vec();
                // Start at the lowest index so the same loop always reads the same.
                if let Some(min_at) = path.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i) {
                    path.rotate_left(min_at);
                }
                let cycle = Violation::Cycle { path };
                if !cycles.contains(&cycle) {
                    cycles.push(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[node] = Mark::Done;
}
