pub mod listfile;

use serde::{Deserialize, Serialize};

use crate::constants::CityKey;

/// One urban center as reported by a city lookup. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub source_name: String,
    pub id: String,
    pub city: String,
    pub province_state: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
}

/// The nearest-city collaborator.
///
/// The grouping engine treats this as a black box: it asks for the urban
/// center a coordinate pair attracts to, and resolves list-file rows by
/// source/id. Implementations are expected to be in-memory and stateless
/// from the engine's perspective.
pub trait CityLookup {
    /// Nearest urban center to the given coordinates.
    ///
    /// Return
    /// ------
    /// * `Some((source_name, record))` when a city attracts the coordinates
    /// * `None` when no city is near
    fn nearest(&self, latitude: f64, longitude: f64) -> Option<(&str, &CityRecord)>;

    /// Resolve a city by the identifier its source assigned to it.
    fn get_by_id(&self, source_name: &str, id: &str) -> Option<&CityRecord>;
}

/// Compose the `"<source_name>,<id>"` key under which a city is registered.
pub fn city_key(source_name: &str, id: &str) -> CityKey {
    format!("{source_name},{id}")
}
