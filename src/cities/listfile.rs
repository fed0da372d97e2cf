//! User-provided location list-files.
//!
//! A list-file lets the user patch buggy or missing location data with a
//! plain text file: `#` starts a comment, every other row is exactly
//! `<source_name>,<city_id>,<RFC3339 timestamp>`. Each row resolves through
//! the city lookup and lands in the location time index as a fix at that
//! city's coordinates.

use std::io::BufRead;
use std::str::FromStr;

use camino::Utf8Path;
use hifitime::Epoch;
use log::debug;

use crate::cities::CityLookup;
use crate::geogroup_errors::GeogroupError;
use crate::records::time_index::TimeIndex;
use crate::records::{GeoRecord, RecordSource};

/// Read a location list-file into `index`.
///
/// Arguments
/// ---------
/// * `lookup`: city lookup used to resolve each row's source/id pair
/// * `file_path`: path recorded as the provenance of the produced records
/// * `reader`: the list-file contents
/// * `index`: location time index receiving the resolved fixes
///
/// Return
/// ------
/// * the number of rows ingested
///
/// Malformed rows and unknown cities are fatal; a list-file is small,
/// hand-maintained input and silently dropping rows would defeat its
/// purpose.
pub fn load_location_listfile<C: CityLookup, R: BufRead>(
    lookup: &C,
    file_path: &Utf8Path,
    reader: R,
    index: &mut TimeIndex,
) -> Result<usize, GeogroupError> {
    let mut records_count = 0;

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let row = line.trim();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }

        let line_number = line_index + 1;
        let mut fields = row.splitn(3, ',');
        let (source_name, id, timestamp_phrase) =
            match (fields.next(), fields.next(), fields.next()) {
                (Some(source_name), Some(id), Some(timestamp_phrase)) => (
                    source_name.trim(),
                    id.trim(),
                    timestamp_phrase.trim(),
                ),
                _ => {
                    return Err(GeogroupError::ListfileRow {
                        line: line_number,
                        reason: "expected three comma-separated fields".to_string(),
                    })
                }
            };

        let timestamp =
            Epoch::from_str(timestamp_phrase).map_err(|err| GeogroupError::ListfileRow {
                line: line_number,
                reason: format!("could not parse timestamp [{timestamp_phrase}]: {err}"),
            })?;

        let city = lookup
            .get_by_id(source_name, id)
            .ok_or_else(|| GeogroupError::ListfileUnknownCity {
                source_name: source_name.to_string(),
                id: id.to_string(),
            })?;

        index.add(GeoRecord::new(
            RecordSource::Listfile,
            file_path.to_owned(),
            timestamp,
            true,
            city.latitude,
            city.longitude,
            String::new(),
        ));

        records_count += 1;
    }

    debug!("Ingested ({records_count}) location list-file records from [{file_path}]");

    Ok(records_count)
}
