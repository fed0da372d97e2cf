pub mod cities;
pub mod constants;
pub mod geogroup_errors;
pub mod grouping;
pub mod matching;
pub mod persistence;
pub mod records;
pub mod time_key;
