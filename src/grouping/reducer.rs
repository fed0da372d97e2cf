//! Post-pass merging of trivially small groups.
//!
//! Driving around taking a handful of shots at each stop produces many tiny
//! groups that would each become their own catalog entry. The reducer runs
//! the engine to completion and folds any group of at most
//! [`TRIVIAL_GROUP_MAXIMUM_SIZE`](crate::constants::TRIVIAL_GROUP_MAXIMUM_SIZE)
//! records into the adjacent group of the same camera, as long as both fall
//! on the same calendar day.
//!
//! Day comparison happens in UTC. Local-time comparison arguably matches
//! user expectation better; if that changes, [`different_day`] is the single
//! site to touch.

use std::collections::HashMap;

use ahash::RandomState;
use hifitime::Epoch;
use log::debug;

use crate::cities::CityLookup;
use crate::constants::{CameraModel, TRIVIAL_GROUP_MAXIMUM_SIZE};
use crate::grouping::find_groups::FindGroups;
use crate::grouping::FinishedGroup;

/// Finished groups after reduction, per camera model, in emission order.
pub type ReducedGroups = HashMap<CameraModel, Vec<FinishedGroup>, RandomState>;

/// Whether two time-keys fall on different UTC calendar days.
fn different_day(last: Epoch, current: Epoch) -> bool {
    let (last_year, last_month, last_day, ..) = last.to_gregorian_utc();
    let (year, month, day, ..) = current.to_gregorian_utc();

    (last_year, last_month, last_day) != (year, month, day)
}

/// Wraps a [`FindGroups`] engine and merges trivial groups as they stream
/// out of it.
pub struct GroupsReducer<'a, C: CityLookup> {
    engine: FindGroups<'a, C>,
}

impl<'a, C: CityLookup> GroupsReducer<'a, C> {
    pub fn new(engine: FindGroups<'a, C>) -> Self {
        GroupsReducer { engine }
    }

    /// Drain the engine and fold trivial groups into their same-day,
    /// same-camera neighbors.
    ///
    /// Return
    /// ------
    /// * the finished groups per camera, and how many merges occurred
    ///
    /// Records always travel whole: the total record count across the
    /// output equals the engine's total emitted record count.
    pub fn reduce(&mut self) -> (ReducedGroups, usize) {
        let mut finished_groups = ReducedGroups::default();
        let mut last_groups: HashMap<CameraModel, FinishedGroup, RandomState> =
            HashMap::default();
        let mut merged = 0;

        while let Some(mut current) = self.engine.find_next() {
            let camera_model = current.key.camera_model.clone();

            let Some(last) = last_groups.get_mut(&camera_model) else {
                // Not yet tracking anything for this camera.
                last_groups.insert(camera_model, current);
                continue;
            };

            let last_is_large = last.records.len() > TRIVIAL_GROUP_MAXIMUM_SIZE;
            let current_is_large = current.records.len() > TRIVIAL_GROUP_MAXIMUM_SIZE;

            if different_day(last.key.time_key, current.key.time_key)
                || (last_is_large && current_is_large)
            {
                // No merge. Finish the tracked group and track the new one.
                let finished = std::mem::replace(last, current);
                finished_groups
                    .entry(camera_model)
                    .or_default()
                    .push(finished);

                continue;
            }

            if last_is_large {
                // The current group is trivial; fold it forward into the
                // larger tracked group.
                let comment = format!(
                    "Appended to a larger group when dropping trivial group: {} ({}) => {} ({})",
                    current.key,
                    current.records.len(),
                    last.key,
                    last.records.len()
                );

                for record in &mut current.records {
                    record.add_comment(comment.clone());
                }

                last.records.append(&mut current.records);
            } else {
                // The tracked group is trivial; fold it backward into the
                // current one, which takes over as the tracked group.
                let comment = format!(
                    "Prepended to a larger group when dropping trivial group: {} ({}) => {} ({})",
                    last.key,
                    last.records.len(),
                    current.key,
                    current.records.len()
                );

                for record in &mut last.records {
                    record.add_comment(comment.clone());
                }

                last.records.append(&mut current.records);
                last.key = current.key;
            }

            merged += 1;
        }

        // Flush every tracked group.
        for (camera_model, last) in last_groups {
            finished_groups
                .entry(camera_model)
                .or_default()
                .push(last);
        }

        debug!("Group reduction performed ({merged}) merges");

        (finished_groups, merged)
    }

    /// The wrapped engine, for inspection of unassigned records and the
    /// nearest-city registry after a reduction run.
    pub fn engine(&self) -> &FindGroups<'a, C> {
        &self.engine
    }
}

#[cfg(test)]
mod different_day_test {
    use super::*;

    #[test]
    fn test_different_day() {
        let midnight = Epoch::from_gregorian_utc(1970, 1, 2, 0, 0, 0, 0);
        let late_first = Epoch::from_gregorian_utc(1970, 1, 1, 23, 50, 0, 0);
        let early_second = Epoch::from_gregorian_utc(1970, 1, 2, 0, 10, 0, 0);

        assert!(different_day(late_first, early_second));
        assert!(different_day(late_first, midnight));
        assert!(!different_day(midnight, early_second));
    }
}
