use hifitime::Epoch;

use crate::constants::TIME_KEY_ALIGNMENT_SECONDS;

/// Floor a Unix epoch to the nearest earlier time-key boundary.
///
/// Argument
/// --------
/// * `epoch_seconds`: seconds since the Unix epoch
///
/// Return
/// ------
/// * the largest multiple of the alignment interval not greater than the input
pub fn align_epoch(epoch_seconds: i64) -> i64 {
    epoch_seconds.div_euclid(TIME_KEY_ALIGNMENT_SECONDS) * TIME_KEY_ALIGNMENT_SECONDS
}

/// Floor a timestamp to its time-key, reinterpreted as a UTC instant.
pub fn align_time(timestamp: Epoch) -> Epoch {
    let epoch_seconds = timestamp.to_unix_seconds().floor() as i64;
    Epoch::from_unix_seconds(align_epoch(epoch_seconds) as f64)
}

/// Whole Unix seconds of a timestamp, as used in location time-keys.
pub fn unix_seconds(timestamp: Epoch) -> i64 {
    timestamp.to_unix_seconds().floor() as i64
}

/// RFC 3339 rendering of a UTC instant, second resolution.
pub fn format_utc(timestamp: Epoch) -> String {
    let (year, month, day, hour, minute, second, _) = timestamp.to_gregorian_utc();
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Condensed timestamp string, for use in directory and file stems.
pub fn condensed_datetime(timestamp: Epoch) -> String {
    let (year, month, day, hour, minute, second, _) = timestamp.to_gregorian_utc();
    format!("{year:04}{month:02}{day:02}-{hour:02}{minute:02}{second:02}")
}
