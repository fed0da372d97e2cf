//! Time-ordered storage shared by the location and image series.
//!
//! Both series are kept as a [`TimeSlice`]: a list of [`TimeEntry`] values
//! strictly increasing by timestamp, where records sharing a timestamp
//! coalesce into one entry's `items`. The strict ordering is what makes
//! [`search_times`] a valid lower-bound binary search, and everything in the
//! grouping engine leans on it.

use hifitime::Epoch;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::GeoRecord;

/// All records observed at one instant, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub timestamp: Epoch,
    pub items: SmallVec<[GeoRecord; 2]>,
}

/// An ordered series of time entries, strictly increasing by timestamp.
pub type TimeSlice = Vec<TimeEntry>;

/// A stable handle to one record inside a [`TimeSlice`].
///
/// Buffers and groups refer to records through these indices rather than
/// through counted references; the series itself is the single owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub entry: usize,
    pub item: usize,
}

/// Record access on a [`TimeSlice`] through [`RecordId`] handles.
pub trait TimeSliceExt {
    fn record(&self, id: RecordId) -> &GeoRecord;
    fn record_mut(&mut self, id: RecordId) -> &mut GeoRecord;
    fn total_records(&self) -> usize;
}

impl TimeSliceExt for TimeSlice {
    fn record(&self, id: RecordId) -> &GeoRecord {
        &self[id.entry].items[id.item]
    }

    fn record_mut(&mut self, id: RecordId) -> &mut GeoRecord {
        &mut self[id.entry].items[id.item]
    }

    fn total_records(&self) -> usize {
        self.iter().map(|entry| entry.items.len()).sum()
    }
}

/// Insertion position of `timestamp` in `series`.
///
/// Return
/// ------
/// * the smallest index whose entry timestamp is `>= timestamp`, or
///   `series.len()` when every entry is earlier
pub fn search_times(series: &TimeSlice, timestamp: Epoch) -> usize {
    series.partition_point(|entry| entry.timestamp < timestamp)
}

/// Builder that keeps a [`TimeSlice`] ordered while records arrive in any
/// order, coalescing records that share a timestamp.
#[derive(Debug, Default, Clone)]
pub struct TimeIndex {
    entries: TimeSlice,
}

impl TimeIndex {
    pub fn new() -> Self {
        TimeIndex {
            entries: Vec::new(),
        }
    }

    /// Wrap an already-ordered slice, e.g. one recovered from the location
    /// database.
    ///
    /// Panics if the slice is not strictly increasing; a disordered series
    /// would silently break every binary search downstream.
    pub fn from_series(entries: TimeSlice) -> Self {
        assert!(
            entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "time series entries must be strictly increasing"
        );

        TimeIndex { entries }
    }

    /// Insert one record at its timestamp, coalescing with an existing entry
    /// when the timestamp is already present.
    pub fn add(&mut self, record: GeoRecord) {
        let position = search_times(&self.entries, record.timestamp);

        match self.entries.get_mut(position) {
            Some(entry) if entry.timestamp == record.timestamp => entry.items.push(record),
            _ => self.entries.insert(
                position,
                TimeEntry {
                    timestamp: record.timestamp,
                    items: smallvec::smallvec![record],
                },
            ),
        }
    }

    pub fn series(&self) -> &TimeSlice {
        &self.entries
    }

    pub fn into_series(self) -> TimeSlice {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod time_index_test {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::records::RecordSource;

    fn record(file: &str, unix: f64) -> GeoRecord {
        GeoRecord::new(
            RecordSource::Gpx,
            Utf8PathBuf::from(file),
            Epoch::from_unix_seconds(unix),
            true,
            1.0,
            2.0,
            String::new(),
        )
    }

    #[test]
    fn test_add_sorts_out_of_order_records() {
        let mut index = TimeIndex::new();
        index.add(record("b", 200.0));
        index.add(record("a", 100.0));
        index.add(record("c", 300.0));

        let series = index.series();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].items[0].file_path, "a");
        assert_eq!(series[1].items[0].file_path, "b");
        assert_eq!(series[2].items[0].file_path, "c");
    }

    #[test]
    fn test_add_coalesces_equal_timestamps() {
        let mut index = TimeIndex::new();
        index.add(record("a", 100.0));
        index.add(record("b", 100.0));

        let series = index.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].items.len(), 2);
        assert_eq!(series[0].items[0].file_path, "a");
        assert_eq!(series[0].items[1].file_path, "b");
    }

    #[test]
    fn test_search_times_is_lower_bound() {
        let mut index = TimeIndex::new();
        for unix in [100.0, 200.0, 300.0] {
            index.add(record("f", unix));
        }
        let series = index.series();

        assert_eq!(search_times(series, Epoch::from_unix_seconds(50.0)), 0);
        assert_eq!(search_times(series, Epoch::from_unix_seconds(100.0)), 0);
        assert_eq!(search_times(series, Epoch::from_unix_seconds(150.0)), 1);
        assert_eq!(search_times(series, Epoch::from_unix_seconds(300.0)), 2);
        assert_eq!(search_times(series, Epoch::from_unix_seconds(301.0)), 3);
    }

    #[test]
    fn test_total_records() {
        let mut index = TimeIndex::new();
        index.add(record("a", 100.0));
        index.add(record("b", 100.0));
        index.add(record("c", 200.0));

        assert_eq!(index.series().total_records(), 3);
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_from_series_rejects_disorder() {
        let mut index = TimeIndex::new();
        index.add(record("a", 100.0));
        index.add(record("b", 200.0));

        let mut series = index.into_series();
        series.swap(0, 1);

        TimeIndex::from_series(series);
    }
}
