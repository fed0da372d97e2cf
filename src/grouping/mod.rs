pub mod buffer;
pub mod find_groups;
pub mod pool;
pub mod reducer;

use std::fmt;
use std::hash::{Hash, Hasher};

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::{CameraModel, CityKey, GroupRecords};
use crate::records::GeoRecord;
use crate::time_key::{format_utc, unix_seconds};

/// The grouping factors of one emitted group. Equality is component-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKey {
    pub time_key: Epoch,
    pub nearest_city_key: CityKey,
    pub camera_model: CameraModel,
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Time-keys are whole aligned seconds; hashing through the Unix
        // value keeps equal keys hashing equal.
        unix_seconds(self.time_key).hash(state);
        self.nearest_city_key.hash(state);
        self.camera_model.hash(state);
    }
}

impl GroupKey {
    /// Filesystem-safe stem for this group, e.g.
    /// `1970-01-01T00-00-00Z-GeoNames,4887398-m1`.
    pub fn key_phrase(&self) -> String {
        let timestamp_phrase = format_utc(self.time_key).replace(':', "-");

        format!(
            "{}-{}-{}",
            timestamp_phrase, self.nearest_city_key, self.camera_model
        )
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroupKey<TIME-KEY=[{}] NEAREST-CITY=[{}] CAMERA-MODEL=[{}]>",
            format_utc(self.time_key),
            self.nearest_city_key,
            self.camera_model
        )
    }
}

/// One group as returned by the engine: its key and its records, in
/// ingestion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedGroup {
    pub key: GroupKey,
    pub records: GroupRecords,
}

/// Why a record could not be placed into any group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoNearLocationRecord,
    NoNearCity,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoNearLocationRecord => write!(f, "no matching/near location record"),
            SkipReason::NoNearCity => write!(f, "no near city"),
        }
    }
}

/// A record that fell out of grouping, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct UnassignedRecord {
    pub record: GeoRecord,
    pub reason: SkipReason,
}

#[cfg(test)]
mod group_key_test {
    use super::*;

    fn key() -> GroupKey {
        GroupKey {
            time_key: Epoch::from_unix_seconds(0.0),
            nearest_city_key: "GeoNames,4887398".to_string(),
            camera_model: "m1".to_string(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            key().to_string(),
            "GroupKey<TIME-KEY=[1970-01-01T00:00:00Z] NEAREST-CITY=[GeoNames,4887398] CAMERA-MODEL=[m1]>"
        );
    }

    #[test]
    fn test_key_phrase() {
        assert_eq!(key().key_phrase(), "1970-01-01T00-00-00Z-GeoNames,4887398-m1");
    }
}
