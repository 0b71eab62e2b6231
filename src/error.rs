//! Error types for the mode graph.
//!
//! Three layers, each with its own enum:
//! - [`Violation`]: one broken invariant found by the validator
//! - [`ResolveError`]: why a resolution chain could not be completed
//! - [`Error`]: what the snapshot and mutation entry points return
//!
//! ## Rust concepts
//! - `thiserror::Error` derives `Display` and `std::error::Error`
//! - `#[from]` generates `From` impls so `?` converts automatically

use crate::mode::ModeRef;
use std::fmt;
use std::path::PathBuf;

/// Where inside a composite mode a reference lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefSite {
    MainMode,
    Timer(usize),
    Interval(usize),
}

impl fmt::Display for RefSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefSite::MainMode => write!(f, "mainMode"),
            RefSite::Timer(i) => write!(f, "timers[{i}]"),
            RefSite::Interval(i) => write!(f, "intervals[{i}]"),
        }
    }
}

/// Coarse classification of a [`Violation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    Reference,
    Cycle,
    Current,
}

/// A single invariant violation in a mode store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("mode {from} {site} points at {target}, which is not a selectable mode")]
    DanglingReference {
        from: usize,
        site: RefSite,
        target: ModeRef,
    },

    #[error("mode {mode} references itself via {site}")]
    SelfReference { mode: usize, site: RefSite },

    #[error("composite modes form a cycle: {}", format_cycle(.path))]
    Cycle { path: Vec<usize> },

    #[error("current mode {0} is not a selectable mode")]
    InvalidCurrent(ModeRef),

    #[error("slot {slot} holds a mode with index {index}")]
    MisplacedMode { slot: usize, index: ModeRef },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::DanglingReference { .. }
            | Violation::SelfReference { .. }
            | Violation::MisplacedMode { .. } => ViolationKind::Reference,
            Violation::Cycle { .. } => ViolationKind::Cycle,
            Violation::InvalidCurrent(_) => ViolationKind::Current,
        }
    }
}

fn format_cycle(path: &[usize]) -> String {
    let mut out: Vec<String> = path.iter().map(|i| i.to_string()).collect();
    if let Some(first) = path.first() {
        out.push(first.to_string());
    }
    out.join(" -> ")
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why the resolver gave up on a chain.
///
/// Both variants mean the stored data breaks an invariant the validator
/// checks; renderers treat them as "off".
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("resolution exceeded {limit} composite hops (reference cycle?)")]
    DepthExceeded { limit: usize },

    #[error("resolution reached {0}, which is not a displayable mode")]
    DanglingReference(ModeRef),
}

/// A palette name with no matching entry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no palette color named {0:?}")]
pub struct ColorLookupMiss(pub String);

/// Errors returned by snapshot loading and store mutation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{} mode graph violation(s): {}", .0.len(), format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("no mode slot at index {0}")]
    UnknownSlot(i32),

    #[error("OFF is synthetic and cannot be stored in a slot")]
    OffNotStorable,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write preview image: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn cycle_message_closes_the_loop() {
        let v = Violation::Cycle { path: vec![2, 5] };
        assert_eq!(v.to_string(), "composite modes form a cycle: 2 -> 5 -> 2");
    }

    #[test]
    fn dangling_message_names_the_site() {
        let v = Violation::DanglingReference {
            from: 3,
            site: RefSite::Timer(1),
            target: ModeRef::new(7),
        };
        assert_eq!(
            v.to_string(),
            "mode 3 timers[1] points at 7, which is not a selectable mode"
        );
    }

    #[rstest]
    #[case(Violation::SelfReference { mode: 1, site: RefSite::MainMode }, ViolationKind::Reference)]
    #[case(Violation::Cycle { path: vec![0, 1] }, ViolationKind::Cycle)]
    #[case(Violation::InvalidCurrent(ModeRef::new(4)), ViolationKind::Current)]
    #[case(Violation::MisplacedMode { slot: 2, index: ModeRef::new(5) }, ViolationKind::Reference)]
    fn test_kind(#[case] violation: Violation, #[case] expected: ViolationKind) {
        assert_eq!(violation.kind(), expected);
    }

    #[test]
    fn validation_error_lists_every_violation() {
        let err = Error::Validation(vec![
            Violation::InvalidCurrent(ModeRef::new(9)),
            Violation::SelfReference {
                mode: 2,
                site: RefSite::Interval(0),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "2 mode graph violation(s): current mode 9 is not a selectable mode; \
             mode 2 references itself via intervals[0]"
        );
    }
}
