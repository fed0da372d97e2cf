pub mod time_index;

use camino::Utf8PathBuf;
use hifitime::Epoch;
use serde::{Deserialize, Serialize};

/// Provenance of a record, as reported by the loader that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    Gpx,
    ImageJpeg,
    Listfile,
}

/// A single located or locatable event: one GPS fix or one photograph.
///
/// Records are created by the index loaders and then mutated by the grouping
/// engine, which attaches geography to images that lack it and appends
/// diagnostic comments as decisions are made about them.
///
/// # Fields
///
/// * `source` - which loader produced the record
/// * `file_path` - the file the record was read from
/// * `timestamp` - UTC instant of the fix or exposure
/// * `has_geographic` - whether `latitude`/`longitude` are meaningful
/// * `latitude`, `longitude` - decimal degrees
/// * `s2_cell_id` - cell identifier computed by the loader (zero if unset)
/// * `camera_model` - camera identifier; empty for non-image records
/// * `comments` - append-only diagnostic trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub source: RecordSource,
    pub file_path: Utf8PathBuf,
    pub timestamp: Epoch,
    pub has_geographic: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub s2_cell_id: u64,
    pub camera_model: String,
    pub comments: Vec<String>,
}

impl GeoRecord {
    pub fn new(
        source: RecordSource,
        file_path: Utf8PathBuf,
        timestamp: Epoch,
        has_geographic: bool,
        latitude: f64,
        longitude: f64,
        camera_model: String,
    ) -> Self {
        GeoRecord {
            source,
            file_path,
            timestamp,
            has_geographic,
            latitude,
            longitude,
            s2_cell_id: 0,
            camera_model,
            comments: Vec::new(),
        }
    }

    /// Append a diagnostic comment. Comments are never overwritten and never
    /// influence group membership.
    pub fn add_comment(&mut self, comment: String) {
        self.comments.push(comment);
    }

    /// Final component of the record's file path, for log and comment text.
    pub fn file_name(&self) -> &str {
        self.file_path.file_name().unwrap_or(self.file_path.as_str())
    }
}
