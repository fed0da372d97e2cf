use std::collections::HashMap;

use ahash::RandomState;

use crate::cities::CityRecord;
use crate::records::GeoRecord;

/// TIME_KEY_ALIGNMENT_SECONDS is a factor that determines how images are
/// binned together on the basis of their timestamps when their other grouping
/// factors are identical. In seconds.
pub const TIME_KEY_ALIGNMENT_SECONDS: i64 = 60 * 10;

/// Largest distance we may search for a matching location record around a
/// given image timestamp under the best-guess strategy.
pub const BEST_GUESS_WINDOW_SECONDS: f64 = 600.0;

/// Largest gap across which the sparse-data strategy will carry a location
/// at either end of the location series.
pub const SPARSE_DATA_WINDOW_SECONDS: f64 = 12.0 * 3600.0;

/// Groups at or below this size are candidates for a same-day merge into an
/// adjacent group of the same camera.
pub const TRIVIAL_GROUP_MAXIMUM_SIZE: usize = 20;

/// Minimum population a city requires in order to be considered an
/// urban/metropolitan center by a nearest-city lookup.
pub const URBAN_CENTER_MINIMUM_POPULATION: u64 = 100_000;

/// A `"<source_name>,<city_id>"` pair identifying a city across the lookup.
pub type CityKey = String;

/// Camera model string as reported by the image loader. May be empty.
pub type CameraModel = String;

/// All of the cities that grouping has resolved so far, keyed the same way
/// as the groups themselves.
pub type NearestCityIndex = HashMap<CityKey, CityRecord, RandomState>;

/// The ordered records of one emitted group.
pub type GroupRecords = Vec<GeoRecord>;
