#![allow(dead_code)]

use camino::Utf8PathBuf;
use hifitime::Epoch;

use geogroup::cities::{CityLookup, CityRecord};
use geogroup::constants::URBAN_CENTER_MINIMUM_POPULATION;
use geogroup::records::time_index::{TimeIndex, TimeSlice};
use geogroup::records::{GeoRecord, RecordSource};

pub const CHICAGO: (f64, f64) = (41.85003, -87.65005);
pub const DETROIT: (f64, f64) = (42.33143, -83.04575);
pub const NYC: (f64, f64) = (40.71427, -74.00597);
pub const SYDNEY: (f64, f64) = (-33.86785, 151.20732);
pub const JOHANNESBURG: (f64, f64) = (-26.20227, 28.04363);
pub const DRESDEN: (f64, f64) = (51.05089, 13.73832);

/// Attraction radius of the fixture lookup, in degrees.
const NEAR_CITY_RADIUS_DEGREES: f64 = 3.0;

/// A handful of major cities, resolved by plain coordinate distance. Stands
/// in for the real GeoNames-backed index, which is a collaborator the
/// engine never looks inside.
pub struct FixtureCityIndex {
    cities: Vec<CityRecord>,
}

impl FixtureCityIndex {
    pub fn world() -> Self {
        let mut cities = Vec::new();

        let mut add = |id: &str,
                       city: &str,
                       province_state: &str,
                       country: &str,
                       coordinates: (f64, f64),
                       population: u64| {
            cities.push(CityRecord {
                source_name: "GeoNames".to_string(),
                id: id.to_string(),
                city: city.to_string(),
                province_state: province_state.to_string(),
                country: country.to_string(),
                latitude: coordinates.0,
                longitude: coordinates.1,
                population,
            });
        };

        add("4887398", "Chicago", "Illinois", "United States", CHICAGO, 2_720_546);
        add("4990729", "Detroit", "Michigan", "United States", DETROIT, 677_116);
        add("5128581", "New York City", "New York", "United States", NYC, 8_175_133);
        add("2147714", "Sydney", "New South Wales", "Australia", SYDNEY, 4_627_345);
        add("993800", "Johannesburg", "Gauteng", "South Africa", JOHANNESBURG, 2_026_469);
        add("2935022", "Dresden", "Saxony", "Germany", DRESDEN, 523_058);

        FixtureCityIndex { cities }
    }
}

impl CityLookup for FixtureCityIndex {
    fn nearest(&self, latitude: f64, longitude: f64) -> Option<(&str, &CityRecord)> {
        self.cities
            .iter()
            .filter(|city| city.population >= URBAN_CENTER_MINIMUM_POPULATION)
            .map(|city| {
                let dlat = city.latitude - latitude;
                let dlon = city.longitude - longitude;
                (dlat * dlat + dlon * dlon, city)
            })
            .filter(|(distance2, _)| {
                *distance2 <= NEAR_CITY_RADIUS_DEGREES * NEAR_CITY_RADIUS_DEGREES
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, city)| (city.source_name.as_str(), city))
    }

    fn get_by_id(&self, source_name: &str, id: &str) -> Option<&CityRecord> {
        self.cities
            .iter()
            .find(|city| city.source_name == source_name && city.id == id)
    }
}

pub fn gpx_record(file: &str, unix: f64, coordinates: (f64, f64)) -> GeoRecord {
    GeoRecord::new(
        RecordSource::Gpx,
        Utf8PathBuf::from(file),
        Epoch::from_unix_seconds(unix),
        true,
        coordinates.0,
        coordinates.1,
        String::new(),
    )
}

pub fn image_record(
    file: &str,
    unix: f64,
    coordinates: (f64, f64),
    camera_model: &str,
) -> GeoRecord {
    GeoRecord::new(
        RecordSource::ImageJpeg,
        Utf8PathBuf::from(file),
        Epoch::from_unix_seconds(unix),
        true,
        coordinates.0,
        coordinates.1,
        camera_model.to_string(),
    )
}

pub fn image_record_without_geo(file: &str, unix: f64, camera_model: &str) -> GeoRecord {
    GeoRecord::new(
        RecordSource::ImageJpeg,
        Utf8PathBuf::from(file),
        Epoch::from_unix_seconds(unix),
        false,
        0.0,
        0.0,
        camera_model.to_string(),
    )
}

/// Assemble a time slice from records given in any order.
pub fn series_of(records: Vec<GeoRecord>) -> TimeSlice {
    let mut index = TimeIndex::new();
    for record in records {
        index.add(record);
    }
    index.into_series()
}

/// A minimal location series for tests that never consult it; the engine
/// requires at least one fix.
pub fn placeholder_location_series() -> TimeSlice {
    series_of(vec![gpx_record("file1.gpx", 0.0, (1.1, 10.1))])
}

pub fn time_key(unix: f64) -> Epoch {
    Epoch::from_unix_seconds(unix)
}
