//! Per-camera buffering of images awaiting group boundaries.
//!
//! A [`GroupBuffer`] holds the images of exactly one camera in chronological
//! order and answers, cheaply, whether the front of the buffer is a finished
//! group. The invariant making that cheap is the pair of boundary time-keys:
//! the buffer holds a *complete* group as soon as `first_time_key` and
//! `last_time_key` differ, because everything arrives in time order.
//!
//! Two subtleties live here:
//!
//! * **Time-key inheritance.** When an image shares its city with the image
//!   pushed just before it, it inherits that image's effective time-key
//!   instead of aligning its own timestamp, so an ongoing visit is not split
//!   at every ten-minute boundary.
//! * **Smoothing.** When a city recurs within one time-key after a brief
//!   divergence, the diverging entries in between are rewritten to the
//!   recurring city. Turning around on a walk near a boundary should not
//!   fragment the visit into three groups.

use std::collections::HashMap;

use ahash::RandomState;
use hifitime::Epoch;
use log::debug;

use crate::constants::CityKey;
use crate::records::time_index::{RecordId, TimeSlice, TimeSliceExt};
use crate::time_key::{align_time, format_utc, unix_seconds};

/// One buffered image: a record handle plus the grouping factors decided for
/// it at push time.
#[derive(Debug, Clone)]
pub(crate) struct BufferedImage {
    pub effective_time_key: Epoch,
    pub record: RecordId,
    pub nearest_city_key: CityKey,
}

impl BufferedImage {
    /// The `"<city_key>,<unix_seconds>"` key identifying the visit this
    /// image belongs to.
    fn location_time_key(&self) -> String {
        format!(
            "{},{}",
            self.nearest_city_key,
            unix_seconds(self.effective_time_key)
        )
    }
}

/// The buffered images of one camera, plus the boundary time-keys and the
/// first-occurrence index used by smoothing.
#[derive(Debug)]
pub(crate) struct GroupBuffer {
    first_time_key: Epoch,
    last_time_key: Epoch,
    images: Vec<BufferedImage>,
    /// First index at which each `"<city_key>,<time_key>"` pair appears.
    location_index: HashMap<String, usize, RandomState>,
}

impl GroupBuffer {
    /// Create a buffer around its first image.
    pub fn seed(nearest_city_key: &str, id: RecordId, records: &TimeSlice) -> Self {
        let effective_time_key = align_time(records.record(id).timestamp);

        let initial = BufferedImage {
            effective_time_key,
            record: id,
            nearest_city_key: nearest_city_key.to_string(),
        };

        let mut location_index = HashMap::with_hasher(RandomState::new());
        location_index.insert(initial.location_time_key(), 0);

        GroupBuffer {
            first_time_key: effective_time_key,
            last_time_key: effective_time_key,
            images: vec![initial],
            location_index,
        }
    }

    pub fn first_time_key(&self) -> Epoch {
        self.first_time_key
    }

    /// True once more than one time-key is present in the buffer. Because
    /// images arrive in chronological order, a second time-key bounds the
    /// first group.
    pub fn has_complete_group(&self) -> bool {
        assert!(
            !self.images.is_empty(),
            "a buffered group should never be empty"
        );

        self.first_time_key != self.last_time_key
    }

    /// True while every buffered image shares a single time-key. The group
    /// may still grow if more input arrives at that key.
    pub fn has_partial_group(&self) -> bool {
        assert!(
            !self.images.is_empty(),
            "a buffered group should never be empty"
        );

        self.first_time_key == self.last_time_key
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Push an image into the buffer, inheriting the time-key of the
    /// previous image when both share a city, then smooth any transient
    /// divergence this push reveals.
    pub fn push(&mut self, nearest_city_key: &str, id: RecordId, records: &mut TimeSlice) {
        let last = self
            .images
            .last()
            .expect("a buffered group should never be empty");
        let last_city = last.nearest_city_key.clone();
        let last_record = last.record;

        let (effective_time_key, comment) = {
            let adjacent = records.record(last_record);
            if last_city == nearest_city_key {
                let inherited = self.last_time_key;
                let comment = format!(
                    "Inheriting time-key [{}] of previous record with same city [{}]: [{}] ({:.6}, {:.6})",
                    format_utc(inherited),
                    nearest_city_key,
                    adjacent.file_name(),
                    adjacent.latitude,
                    adjacent.longitude
                );

                (inherited, comment)
            } else {
                let aligned = align_time(records.record(id).timestamp);
                let comment = format!(
                    "Left-adjacent image in buffer is [{}] with different city [{}] at coordinates ({:.6}, {:.6}) and time-key [{}]",
                    adjacent.file_name(),
                    last_city,
                    adjacent.latitude,
                    adjacent.longitude,
                    format_utc(self.last_time_key)
                );

                (aligned, comment)
            }
        };

        records.record_mut(id).add_comment(comment);

        self.images.push(BufferedImage {
            effective_time_key,
            record: id,
            nearest_city_key: nearest_city_key.to_string(),
        });
        self.last_time_key = effective_time_key;

        self.smooth_after_push(nearest_city_key, effective_time_key, records);
    }

    /// If the city of the just-pushed image already appeared at the same
    /// time-key, every differing city buffered between that first occurrence
    /// and now is jitter; rewrite it to the recurring city.
    fn smooth_after_push(
        &mut self,
        nearest_city_key: &str,
        current_time_key: Epoch,
        records: &mut TimeSlice,
    ) {
        let pushed = self.images.len() - 1;
        let location_time_key = self.images[pushed].location_time_key();

        let Some(&first_index) = self.location_index.get(&location_time_key) else {
            self.location_index.insert(location_time_key, pushed);
            return;
        };

        if self.images.len() < 3 {
            return;
        }

        let first_encountered = &self.images[first_index];
        if first_encountered.nearest_city_key != nearest_city_key
            || first_encountered.effective_time_key != current_time_key
        {
            panic!(
                "first encountered index of location-timekey was not recorded right: expected [{}] [{}] rather than [{}] [{}]",
                nearest_city_key,
                format_utc(current_time_key),
                first_encountered.nearest_city_key,
                format_utc(first_encountered.effective_time_key)
            );
        }

        // Only smooth when the entry just behind the pushed one diverges
        // while still sharing the time-key; adjacent same-city pushes would
        // otherwise rewrite the same run over and over.
        let previous = &self.images[pushed - 1];
        if previous.nearest_city_key == nearest_city_key
            || previous.effective_time_key != current_time_key
        {
            return;
        }

        let anchor_timestamp = records.record(first_encountered.record).timestamp;
        let pushed_name = records.record(self.images[pushed].record).file_name().to_string();

        let span = pushed - (first_index + 1);
        let mut smoothed = 0;
        for (step, image) in self.images[first_index + 1..pushed].iter_mut().enumerate() {
            assert!(
                image.effective_time_key == current_time_key,
                "buffered image under smoothing is no longer on the same time-key: [{}] != [{}]",
                format_utc(image.effective_time_key),
                format_utc(current_time_key)
            );

            if image.nearest_city_key == nearest_city_key {
                continue;
            }

            let record = records.record_mut(image.record);
            let since_anchor = (record.timestamp - anchor_timestamp).to_seconds();
            record.add_comment(format!(
                "Smoothed image <time-key [{}] city [{}] file [{}]> to city [{}] (from just-pushed image [{}]). TIME-BETWEEN=({:.0}s) STEP=({}/{})",
                format_utc(image.effective_time_key),
                image.nearest_city_key,
                record.file_name(),
                nearest_city_key,
                pushed_name,
                since_anchor,
                step + 1,
                span
            ));

            image.nearest_city_key = nearest_city_key.to_string();
            smoothed += 1;
        }

        if smoothed > 0 {
            debug!(
                "Smoothed ({smoothed}) buffered images to city [{nearest_city_key}] at time-key [{}]",
                format_utc(current_time_key)
            );
            self.rebuild_location_index();
        }
    }

    /// Pop the finished group at the front of the buffer.
    ///
    /// Walks from the front while both the city and the time-key match the
    /// first entry's, removes that run, and re-anchors `first_time_key` on
    /// whatever is left.
    pub fn pop_complete_group(&mut self) -> (CityKey, Vec<RecordId>) {
        assert!(
            self.has_complete_group(),
            "can not return complete group if we do not have one"
        );

        let first_city = self.images[0].nearest_city_key.clone();
        let first_time_key = self.images[0].effective_time_key;

        let run = self
            .images
            .iter()
            .take_while(|image| {
                image.nearest_city_key == first_city
                    && image.effective_time_key == first_time_key
            })
            .count();

        let group: Vec<RecordId> = self.images.drain(..run).map(|image| image.record).collect();

        match self.images.first() {
            Some(first) => self.first_time_key = first.effective_time_key,
            None => self.first_time_key = Epoch::from_unix_seconds(0.0),
        }

        self.rebuild_location_index();

        (first_city, group)
    }

    /// Flush the remaining single-time-key tail of the buffer. Used once the
    /// data source is exhausted and nothing can bound the group anymore.
    pub fn pop_partial_group(&mut self) -> (CityKey, Vec<RecordId>) {
        assert!(
            !self.has_complete_group(),
            "can not return partial group if at least one complete group is available"
        );
        assert!(
            self.has_partial_group(),
            "can not return partial group if we do not have one"
        );

        let nearest_city_key = self.images[0].nearest_city_key.clone();
        let group: Vec<RecordId> = self.images.drain(..).map(|image| image.record).collect();

        self.first_time_key = Epoch::from_unix_seconds(0.0);
        self.last_time_key = Epoch::from_unix_seconds(0.0);
        self.rebuild_location_index();

        (nearest_city_key, group)
    }

    /// Replace the location index with an up-to-date first-occurrence map.
    fn rebuild_location_index(&mut self) {
        self.location_index.clear();
        for (index, image) in self.images.iter().enumerate() {
            self.location_index
                .entry(image.location_time_key())
                .or_insert(index);
        }
    }

    #[cfg(test)]
    pub(crate) fn location_index_entry(&self, location_time_key: &str) -> Option<usize> {
        self.location_index.get(location_time_key).copied()
    }

    #[cfg(test)]
    pub(crate) fn cities(&self) -> Vec<&str> {
        self.images
            .iter()
            .map(|image| image.nearest_city_key.as_str())
            .collect()
    }
}
