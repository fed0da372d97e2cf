//! The find-groups engine.
//!
//! Overview
//! -----------------
//! [`FindGroups`] consumes two time-ordered series, one of location fixes
//! and one of photograph records, and yields coherent photograph groups one
//! call at a time. Each group reads intuitively as "one visit to one place
//! by one camera" and is labelled with a time-key, a nearest urban center,
//! and the camera model.
//!
//! Per call to [`FindGroups::find_next`], the engine:
//! 1. returns a finished group immediately if any camera's buffer holds one;
//! 2. otherwise ingests image time-entries in order, attaching geography
//!    through the configured [`LocationMatchStrategy`] and resolving each
//!    record's nearest city, until some buffer completes a group;
//! 3. once the image series is exhausted, flushes the remaining partial
//!    groups, one per call, and finally reports end of stream.
//!
//! Records that cannot be placed (no near location fix, or no near city)
//! are recorded on the unassigned list instead of being raised; the caller
//! inspects [`FindGroups::unassigned_records`] after the run.
//!
//! Ordering
//! -----------------
//! Within one group, records appear in ingestion order. Across cameras the
//! arrival order of groups is unspecified: it follows hash-map iteration
//! and is not stable from one run to the next. Callers must only rely on
//! per-group contents.
use log::warn;

use crate::cities::{city_key, CityLookup};
use crate::constants::NearestCityIndex;
use crate::grouping::pool::GroupBufferPool;
use crate::grouping::{FinishedGroup, GroupKey, SkipReason, UnassignedRecord};
use crate::matching::LocationMatchStrategy;
use crate::records::time_index::{RecordId, TimeSlice, TimeSliceExt};
use crate::time_key::format_utc;

/// Streaming grouping engine over one pair of location/image series.
///
/// The engine owns both series for the duration of the run: it mutates
/// image records in place to attach geography and diagnostic comments, so
/// they must not be shared with other readers while it is live.
pub struct FindGroups<'a, C: CityLookup> {
    location_series: TimeSlice,
    image_series: TimeSlice,
    city_lookup: &'a C,
    strategy: LocationMatchStrategy,
    current_image_position: usize,
    unassigned_records: Vec<UnassignedRecord>,
    nearest_city_index: NearestCityIndex,
    buffered_groups: GroupBufferPool,
}

impl<'a, C: CityLookup> FindGroups<'a, C> {
    /// Build an engine over the given series.
    ///
    /// Arguments
    /// ---------
    /// * `location_series`: time-ordered location fixes; must be non-empty
    ///   even if no image ends up consulting it
    /// * `image_series`: time-ordered photograph records
    /// * `city_lookup`: the nearest-city collaborator
    ///
    /// Panics if `location_series` is empty.
    pub fn new(
        location_series: TimeSlice,
        image_series: TimeSlice,
        city_lookup: &'a C,
    ) -> Self {
        assert!(!location_series.is_empty(), "no locations");

        FindGroups {
            location_series,
            image_series,
            city_lookup,
            strategy: LocationMatchStrategy::BestGuess,
            current_image_position: 0,
            unassigned_records: Vec::new(),
            nearest_city_index: NearestCityIndex::default(),
            buffered_groups: GroupBufferPool::new(),
        }
    }

    /// Select the location-matching strategy. Takes effect for records not
    /// yet ingested.
    pub fn set_location_match_strategy(&mut self, strategy: LocationMatchStrategy) {
        self.strategy = strategy;
    }

    pub fn location_match_strategy(&self) -> LocationMatchStrategy {
        self.strategy
    }

    /// All of the cities that grouping has resolved so far, keyed the same
    /// as the group keys. Cumulative.
    pub fn nearest_city_index(&self) -> &NearestCityIndex {
        &self.nearest_city_index
    }

    /// Records skipped so far, with reasons. Cumulative.
    pub fn unassigned_records(&self) -> &[UnassignedRecord] {
        &self.unassigned_records
    }

    /// The next finished group, or `None` once every record has been
    /// emitted or skipped.
    pub fn find_next(&mut self) -> Option<FinishedGroup> {
        // Try popping immediately.
        if self.buffered_groups.any_complete().is_some() {
            return Some(self.pop_complete_group());
        }

        // No finished group buffered; ingest entries until one appears.
        while self.current_image_position < self.image_series.len() {
            let position = self.current_image_position;
            self.current_image_position += 1;

            self.ingest_entry(position);

            if self.buffered_groups.any_complete().is_some() {
                return Some(self.pop_complete_group());
            }
        }

        // Out of data; flush whatever partial groups remain.
        if self.buffered_groups.any_partial().is_some() {
            return Some(self.pop_partial_group());
        }

        assert!(
            self.buffered_groups.is_empty(),
            "no poppable group but the buffer pool is not empty"
        );

        None
    }

    /// Process one image time-entry atomically: attach geography where it is
    /// missing, resolve the nearest city, and push every placeable record
    /// onto its camera's buffer.
    fn ingest_entry(&mut self, position: usize) {
        let entry_time = self.image_series[position].timestamp;
        let item_count = self.image_series[position].items.len();

        for item in 0..item_count {
            let id = RecordId {
                entry: position,
                item,
            };

            if !self.image_series.record(id).has_geographic {
                // Match by the entry's timestamp; items coalesced on it all
                // share the instant.
                let Some(matched) = self.strategy.match_location(&self.location_series, entry_time)
                else {
                    self.add_unassigned(id, SkipReason::NoNearLocationRecord);
                    continue;
                };

                let location = &matched.items[0];

                // The location series is exclusively loaded with geographic
                // data. This should never happen.
                assert!(
                    location.has_geographic,
                    "location record indicates no geographic data"
                );

                let (latitude, longitude, s2_cell_id) =
                    (location.latitude, location.longitude, location.s2_cell_id);
                let comment = format!(
                    "Updated geographic from location with filename [{}], timestamp [{}], and cell ({})",
                    location.file_name(),
                    format_utc(location.timestamp),
                    s2_cell_id
                );

                let record = self.image_series.record_mut(id);
                record.latitude = latitude;
                record.longitude = longitude;
                record.s2_cell_id = s2_cell_id;
                record.has_geographic = true;
                record.add_comment(comment);
            }

            let (latitude, longitude) = {
                let record = self.image_series.record(id);
                (record.latitude, record.longitude)
            };

            let Some((source_name, city)) = self.city_lookup.nearest(latitude, longitude) else {
                self.add_unassigned(id, SkipReason::NoNearCity);
                continue;
            };

            let nearest_city_key = city_key(source_name, &city.id);
            self.nearest_city_index
                .insert(nearest_city_key.clone(), city.clone());

            self.buffered_groups
                .push(&nearest_city_key, id, &mut self.image_series);
        }
    }

    fn add_unassigned(&mut self, id: RecordId, reason: SkipReason) {
        let record = self.image_series.record(id).clone();

        warn!("Skipping [{}]: {}", record.file_path, reason);

        self.unassigned_records
            .push(UnassignedRecord { record, reason });
    }

    fn pop_complete_group(&mut self) -> FinishedGroup {
        let (time_key, nearest_city_key, camera_model, group) =
            self.buffered_groups.pop_first_complete_group();

        self.assemble_group(time_key, nearest_city_key, camera_model, group)
    }

    fn pop_partial_group(&mut self) -> FinishedGroup {
        let (time_key, nearest_city_key, camera_model, group) =
            self.buffered_groups.pop_first_partial_group();

        self.assemble_group(time_key, nearest_city_key, camera_model, group)
    }

    fn assemble_group(
        &self,
        time_key: hifitime::Epoch,
        nearest_city_key: String,
        camera_model: String,
        group: Vec<RecordId>,
    ) -> FinishedGroup {
        let records = group
            .into_iter()
            .map(|id| self.image_series.record(id).clone())
            .collect();

        FinishedGroup {
            key: GroupKey {
                time_key,
                nearest_city_key,
                camera_model,
            },
            records,
        }
    }
}

impl<C: CityLookup> Iterator for FindGroups<'_, C> {
    type Item = FinishedGroup;

    fn next(&mut self) -> Option<FinishedGroup> {
        self.find_next()
    }
}
