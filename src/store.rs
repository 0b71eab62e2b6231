//! The mode store: every slot the clock has, which one is selected, and the
//! fixed-time override.
//!
//! The store is always handled as a whole snapshot. Edits never patch it in
//! place; [`ModeStore::apply`] returns the next snapshot or refuses the edit.

use crate::error::{Error, Violation};
use crate::mode::{FixedTime, Mode, ModeRef, TimeOfDay};
use crate::validate::validate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStore {
    /// Slot-addressed; EMPTY slots stay in place.
    pub modes: Vec<Mode>,
    pub current: ModeRef,
    #[serde(default)]
    pub fixed_time: FixedTime,
}

/// The three edits the device accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModeMutation {
    /// Replace the whole mode in the slot named by its `index`.
    ReplaceMode(Mode),
    SetCurrent(ModeRef),
    SetFixedTime(FixedTime),
}

impl ModeStore {
    pub fn new(modes: Vec<Mode>) -> Self {
        Self {
            modes,
            current: ModeRef::OFF,
            fixed_time: FixedTime::default(),
        }
    }

    /// The mode stored at `r`, if `r` names an existing slot.
    pub fn get(&self, r: ModeRef) -> Option<&Mode> {
        r.slot().and_then(|slot| self.modes.get(slot))
    }

    pub fn current_mode(&self) -> Option<&Mode> {
        self.get(self.current)
    }

    /// The time composite modes see: the fixed override when enabled,
    /// otherwise `wall_clock`.
    pub fn time_at(&self, wall_clock: TimeOfDay) -> TimeOfDay {
        self.fixed_time.time().unwrap_or(wall_clock)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store: ModeStore = serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            "Loaded {} mode slots from {} (current: {})",
            store.modes.len(),
            path.display(),
            store.current
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let text = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply one mutation, returning the next snapshot.
    ///
    /// The edit is refused when it would introduce a violation the store
    /// does not already have. Violations that came in with the snapshot do
    /// not block unrelated edits.
    pub fn apply(&self, mutation: ModeMutation) -> Result<ModeStore, Error> {
        let mut next = self.clone();

        match mutation {
            ModeMutation::ReplaceMode(Mode::Off) => return Err(Error::OffNotStorable),
            ModeMutation::ReplaceMode(mode) => {
                let index = mode.index();
                let slot = index
                    .slot()
                    .filter(|slot| *slot < next.modes.len())
                    .ok_or(Error::UnknownSlot(index.raw()))?;
                next.modes[slot] = mode;
            }
            ModeMutation::SetCurrent(current) => next.current = current,
            ModeMutation::SetFixedTime(fixed_time) => next.fixed_time = fixed_time,
        }

        let before = validate(self).violations;
        let introduced: Vec<Violation> = validate(&next)
            .violations
            .into_iter()
            .filter(|v| !before.contains(v))
            .collect();

        if !introduced.is_empty() {
            tracing::warn!("Rejected edit: {} new violation(s)", introduced.len());
            return Err(Error::Validation(introduced));
        }

        Ok(next)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::RefSite;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> ModeStore {
        store(
            vec![
                word(0, "red"),
                digi(1, "blue"),
                Mode::Empty { index: 2 },
                timer(3, 0, &[(1, (22, 0), (6, 0))]),
                timer(4, 1, &[(0, (8, 0), (9, 0))]),
            ],
            3,
        )
    }

    #[test]
    fn get_by_slot() {
        let s = sample();
        assert_eq!(s.get(r(1)), Some(&digi(1, "blue")));
        assert_eq!(s.get(r(9)), None);
        assert_eq!(s.get(ModeRef::OFF), None);
        assert_eq!(s.current_mode().map(Mode::type_name), Some("TIMER"));
    }

    #[test]
    fn fixed_time_overrides_wall_clock() {
        let mut s = sample();
        let wall = TimeOfDay::new(12, 0);
        assert_eq!(s.time_at(wall), wall);

        s.fixed_time = FixedTime::at(TimeOfDay::new(23, 15));
        assert_eq!(s.time_at(wall), TimeOfDay::new(23, 15));
    }

    #[test]
    fn save_then_load_preserves_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("modes.json");
        let mut s = sample();
        s.fixed_time = FixedTime::at(TimeOfDay::new(7, 45));

        s.save(&path).unwrap();
        assert_eq!(ModeStore::load(&path).unwrap(), s);
    }

    #[test]
    fn load_uses_device_field_names() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("modes.json");
        std::fs::write(
            &path,
            r#"{"modes":[{"index":0,"type":"DIGICLOCK","name":"D","color":"red","brightness":9}],
                "current":0,"fixedTime":{"enabled":true,"hours":5,"minutes":4}}"#,
        )
        .unwrap();

        let s = ModeStore::load(&path).unwrap();
        assert_eq!(s.current, r(0));
        assert_eq!(s.fixed_time.time(), Some(TimeOfDay::new(5, 4)));
    }

    #[test]
    fn load_reports_bad_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("modes.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ModeStore::load(&path), Err(Error::Json { .. })));
    }

    #[test]
    fn replace_mode_swaps_whole_slot() {
        let next = sample()
            .apply(ModeMutation::ReplaceMode(digi(1, "orange")))
            .unwrap();
        assert_eq!(next.modes[1], digi(1, "orange"));
        assert_eq!(sample().modes[1], digi(1, "blue"));
    }

    #[test]
    fn replace_mode_rejects_cycle() {
        // 3 -> 1 at night; pointing 4's main mode at 3 is fine, but then
        // making 3 point back at 4 closes a loop.
        let s = sample()
            .apply(ModeMutation::ReplaceMode(timer(4, 3, &[])))
            .unwrap();
        let err = s
            .apply(ModeMutation::ReplaceMode(timer(3, 4, &[])))
            .unwrap_err();

        match err {
            Error::Validation(violations) => {
                assert_eq!(violations, vec![Violation::Cycle { path: vec![3, 4] }]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn replace_mode_rejects_self_reference() {
        let err = sample()
            .apply(ModeMutation::ReplaceMode(timer(3, 3, &[])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(v) if v == vec![Violation::SelfReference { mode: 3, site: RefSite::MainMode }]
        ));
    }

    #[test]
    fn replace_mode_rejects_unknown_slot() {
        let err = sample()
            .apply(ModeMutation::ReplaceMode(digi(12, "red")))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSlot(12)));
    }

    #[test]
    fn off_cannot_be_stored() {
        let err = sample()
            .apply(ModeMutation::ReplaceMode(Mode::Off))
            .unwrap_err();
        assert!(matches!(err, Error::OffNotStorable));
    }

    #[test]
    fn set_current_rejects_empty_slot() {
        let err = sample()
            .apply(ModeMutation::SetCurrent(r(2)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(v) if v == vec![Violation::InvalidCurrent(r(2))]
        ));
    }

    #[test]
    fn set_current_accepts_off() {
        let next = sample().apply(ModeMutation::SetCurrent(ModeRef::OFF)).unwrap();
        assert!(next.current.is_off());
    }

    #[test]
    fn existing_violations_do_not_block_other_edits() {
        let mut s = sample();
        s.modes[4] = timer(4, 2, &[]); // dangling: slot 2 is EMPTY

        let next = s
            .apply(ModeMutation::SetFixedTime(FixedTime::at(TimeOfDay::new(1, 2))))
            .unwrap();
        assert!(next.fixed_time.enabled);
    }
}
