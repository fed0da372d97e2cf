//! Persistence of the location time-series.
//!
//! Loading location data-files is by far the slowest part of a run, so the
//! assembled series is cached in a small framed binary file next to the
//! data. The frame carries two digests: one over the serialized payload
//! (integrity; a mismatch is fatal) and one over the union of the source
//! data files (freshness; a mismatch triggers a rebuild and an atomic
//! rewrite of the file).
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! magic "GGLS" | version u16 | source SHA-256 (32) | payload length u64
//! | bincode payload | payload SHA-256 (32)
//! ```

use std::fs::File;
use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use sha2::{Digest, Sha256};

use crate::geogroup_errors::GeogroupError;
use crate::records::time_index::TimeSlice;

const SERIES_MAGIC: &[u8; 4] = b"GGLS";
const SERIES_VERSION: u16 = 1;

/// SHA-256 digest length in bytes.
const DIGEST_LEN: usize = 32;

/// How an existing (or absent) series file was reconciled with the source
/// data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesDisposition {
    /// File present and its source digest matches; nothing rewritten.
    Reused,
    /// No file existed; one was created from the sources.
    Created,
    /// File existed but its source digest no longer matches; rebuilt and
    /// rewritten.
    Rewritten,
}

/// Digest the union of the source data files.
///
/// Paths are sorted first so the digest does not depend on the order the
/// caller discovered them in.
pub fn hash_source_files(paths: &[Utf8PathBuf]) -> Result<[u8; DIGEST_LEN], GeogroupError> {
    let mut sorted: Vec<&Utf8PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    for path in sorted {
        let mut reader = BufReader::new(File::open(path)?);
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
    }

    Ok(hasher.finalize().into())
}

/// Serialize `series` into a fresh frame at `path`, replacing any existing
/// file atomically (write-then-rename).
pub fn write_location_series(
    path: &Utf8Path,
    series: &TimeSlice,
    source_hash: &[u8; DIGEST_LEN],
) -> Result<(), GeogroupError> {
    let payload = bincode::serialize(series)?;
    let payload_hash: [u8; DIGEST_LEN] = Sha256::digest(&payload).into();

    let mut frame = Vec::with_capacity(payload.len() + 78);
    frame.extend_from_slice(SERIES_MAGIC);
    frame.extend_from_slice(&SERIES_VERSION.to_le_bytes());
    frame.extend_from_slice(source_hash);
    frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&payload_hash);

    let file_name = path.file_name().unwrap_or("location-series");
    let staging = path.with_file_name(format!("{file_name}.tmp"));

    std::fs::write(&staging, &frame)?;
    std::fs::rename(&staging, path)?;

    debug!(
        "Location series written to [{path}]: ({}) bytes",
        frame.len()
    );

    Ok(())
}

/// Read a series frame back.
///
/// Return
/// ------
/// * the series and the source digest stored alongside it
///
/// A payload digest mismatch means the file can not be trusted and is
/// reported as [`GeogroupError::LocationSeriesChecksum`].
pub fn read_location_series(
    path: &Utf8Path,
) -> Result<(TimeSlice, [u8; DIGEST_LEN]), GeogroupError> {
    let frame = std::fs::read(path)?;

    let header_len = SERIES_MAGIC.len() + 2 + DIGEST_LEN + 8;
    if frame.len() < header_len + DIGEST_LEN {
        return Err(GeogroupError::InvalidSeriesFrame(format!(
            "file is only ({}) bytes",
            frame.len()
        )));
    }

    if &frame[..4] != SERIES_MAGIC {
        return Err(GeogroupError::InvalidSeriesFrame(
            "bad magic bytes".to_string(),
        ));
    }

    let version = u16::from_le_bytes([frame[4], frame[5]]);
    if version != SERIES_VERSION {
        return Err(GeogroupError::UnsupportedSeriesVersion(version));
    }

    let mut source_hash = [0u8; DIGEST_LEN];
    source_hash.copy_from_slice(&frame[6..6 + DIGEST_LEN]);

    let length_offset = 6 + DIGEST_LEN;
    let payload_len = u64::from_le_bytes(
        frame[length_offset..length_offset + 8]
            .try_into()
            .expect("slice length is fixed"),
    ) as usize;

    let payload_offset = length_offset + 8;
    if frame.len() != payload_offset + payload_len + DIGEST_LEN {
        return Err(GeogroupError::InvalidSeriesFrame(format!(
            "expected ({}) payload bytes but the file holds ({})",
            payload_len,
            frame.len() - payload_offset - DIGEST_LEN
        )));
    }

    let payload = &frame[payload_offset..payload_offset + payload_len];
    let stored_payload_hash = &frame[payload_offset + payload_len..];

    let payload_hash: [u8; DIGEST_LEN] = Sha256::digest(payload).into();
    if payload_hash != stored_payload_hash {
        return Err(GeogroupError::LocationSeriesChecksum);
    }

    let series: TimeSlice = bincode::deserialize(payload)?;

    Ok((series, source_hash))
}

/// Reconcile the series file at `database_path` with the given source data
/// files.
///
/// Arguments
/// ---------
/// * `database_path`: location of the framed series file
/// * `source_paths`: the location data files the series derives from; may
///   be empty when an existing database is to be used as-is
/// * `build`: invoked to assemble the series when the file is absent or
///   stale
///
/// Return
/// ------
/// * the series plus a [`SeriesDisposition`] describing what happened
///
/// Calling with no database file and no sources is a usage error
/// ([`GeogroupError::NoLocationSources`]); a corrupt existing file is fatal
/// rather than silently rebuilt.
pub fn load_or_rebuild<F>(
    database_path: &Utf8Path,
    source_paths: &[Utf8PathBuf],
    build: F,
) -> Result<(TimeSlice, SeriesDisposition), GeogroupError>
where
    F: FnOnce() -> Result<TimeSlice, GeogroupError>,
{
    let database_exists = database_path.exists();

    if !database_exists && source_paths.is_empty() {
        return Err(GeogroupError::NoLocationSources);
    }

    if database_exists {
        let (series, stored_source_hash) = read_location_series(database_path)?;

        if source_paths.is_empty() {
            debug!("Database read and checked, and no data sources were given. Returning data.");
            return Ok((series, SeriesDisposition::Reused));
        }

        let current_source_hash = hash_source_files(source_paths)?;
        if current_source_hash == stored_source_hash {
            debug!("Database read and checked. Data sources were given and match. Returning data.");
            return Ok((series, SeriesDisposition::Reused));
        }

        debug!("Database read and checked. Data sources do not match. Database will be updated.");

        let rebuilt = build()?;
        write_location_series(database_path, &rebuilt, &current_source_hash)?;

        return Ok((rebuilt, SeriesDisposition::Rewritten));
    }

    debug!("Data sources were given and no database exists. Database will be created.");

    let current_source_hash = hash_source_files(source_paths)?;
    let built = build()?;
    write_location_series(database_path, &built, &current_source_hash)?;

    Ok((built, SeriesDisposition::Created))
}
