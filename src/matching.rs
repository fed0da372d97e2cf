//! Location matching: attaching a location fix to an image timestamp.
//!
//! Two strategies are offered, chosen once per engine. *Best guess* assumes
//! the location series samples frequently and refuses to extrapolate past a
//! ten-minute window. *Sparse data* assumes rare, high-confidence samples
//! and carries the last known position forward until the next fix, bounded
//! only at the ends of the series.

use std::fmt;
use std::str::FromStr;

use hifitime::Epoch;

use crate::constants::{BEST_GUESS_WINDOW_SECONDS, SPARSE_DATA_WINDOW_SECONDS};
use crate::geogroup_errors::GeogroupError;
use crate::records::time_index::{search_times, TimeEntry, TimeSlice};

/// Strategy for matching an image timestamp against the location series.
///
/// The strategy is a tagged variant rather than a stored callable so that
/// the selection happens once, at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMatchStrategy {
    #[default]
    BestGuess,
    SparseData,
}

impl LocationMatchStrategy {
    /// The location entry to use for an image taken at `image_time`, or
    /// `None` when no location record is near enough under this strategy.
    pub fn match_location<'t>(
        &self,
        location_series: &'t TimeSlice,
        image_time: Epoch,
    ) -> Option<&'t TimeEntry> {
        match self {
            LocationMatchStrategy::BestGuess => best_guess(location_series, image_time),
            LocationMatchStrategy::SparseData => sparse_data(location_series, image_time),
        }
    }
}

impl fmt::Display for LocationMatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationMatchStrategy::BestGuess => write!(f, "best guess"),
            LocationMatchStrategy::SparseData => write!(f, "sparse data"),
        }
    }
}

impl FromStr for LocationMatchStrategy {
    type Err = GeogroupError;

    fn from_str(phrase: &str) -> Result<Self, Self::Err> {
        match phrase {
            "best guess" => Ok(LocationMatchStrategy::BestGuess),
            "sparse data" => Ok(LocationMatchStrategy::SparseData),
            other => Err(GeogroupError::InvalidMatchStrategy(other.to_string())),
        }
    }
}

/// Nearest location entry within a ten-minute window on either side.
///
/// The insertion position found by binary search yields the entries
/// immediately before and after the image time. An exact timestamp match
/// wins outright; otherwise whichever neighbor sits within the window is
/// taken, the closer of the two if both do (ties go to the earlier entry).
fn best_guess(location_series: &TimeSlice, image_time: Epoch) -> Option<&TimeEntry> {
    let position = search_times(location_series, image_time);

    let mut previous: Option<&TimeEntry> = None;
    let mut next: Option<&TimeEntry> = None;

    if position >= location_series.len() {
        // Past the end of the series; only the last entry is a candidate.
        previous = location_series.last();
    } else {
        let candidate = &location_series[position];
        if candidate.timestamp == image_time {
            return Some(candidate);
        }

        next = Some(candidate);
        if position > 0 {
            previous = Some(&location_series[position - 1]);
        }
    }

    let since_previous =
        previous.map(|entry| (image_time - entry.timestamp).to_seconds());
    let until_next = next.map(|entry| (entry.timestamp - image_time).to_seconds());

    match (since_previous, until_next) {
        (Some(dp), None) if dp <= BEST_GUESS_WINDOW_SECONDS => previous,
        (Some(dp), Some(dn)) if dp <= BEST_GUESS_WINDOW_SECONDS && dn <= BEST_GUESS_WINDOW_SECONDS => {
            if dp <= dn {
                previous
            } else {
                next
            }
        }
        (Some(dp), Some(_)) if dp <= BEST_GUESS_WINDOW_SECONDS => previous,
        (_, Some(dn)) if dn <= BEST_GUESS_WINDOW_SECONDS => next,
        _ => None,
    }
}

/// Last location recorded before the image time, however long ago.
///
/// Sparse data implies the subject stayed put between fixes, so the previous
/// entry always stands. Only at the two ends of the series does the
/// twelve-hour proximity bound apply.
fn sparse_data(location_series: &TimeSlice, image_time: Epoch) -> Option<&TimeEntry> {
    let position = search_times(location_series, image_time);

    if position >= location_series.len() {
        let last = location_series.last()?;
        let since_last = (image_time - last.timestamp).to_seconds();
        return (since_last <= SPARSE_DATA_WINDOW_SECONDS).then_some(last);
    }

    let candidate = &location_series[position];
    if candidate.timestamp == image_time {
        return Some(candidate);
    }

    if position > 0 {
        return Some(&location_series[position - 1]);
    }

    // The image predates the whole series; take the first fix if it is
    // close enough ahead.
    let until_first = (candidate.timestamp - image_time).to_seconds();
    (until_first <= SPARSE_DATA_WINDOW_SECONDS).then_some(candidate)
}

#[cfg(test)]
mod matching_test {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::records::time_index::TimeIndex;
    use crate::records::{GeoRecord, RecordSource};

    fn location(file: &str, unix: f64) -> GeoRecord {
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

    fn series(timestamps: &[f64]) -> TimeSlice {
        let mut index = TimeIndex::new();
        for (i, unix) in timestamps.iter().enumerate() {
            index.add(location(&format!("file{i:02}.gpx"), *unix));
        }
        index.into_series()
    }

    fn matched_unix(entry: Option<&TimeEntry>) -> Option<f64> {
        entry.map(|entry| entry.timestamp.to_unix_seconds())
    }

    #[test]
    fn test_best_guess_exact_match() {
        let location_series = series(&[3600.0, 3660.0, 3720.0]);
        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3660.0));

        assert_eq!(matched_unix(matched), Some(3660.0));
    }

    #[test]
    fn test_best_guess_rounds_to_nearest() {
        let location_series = series(&[3600.0, 3660.0, 3720.0]);

        // 3630 sits halfway between 3600 and 3660; the tie goes to the
        // earlier entry.
        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3630.0));
        assert_eq!(matched_unix(matched), Some(3600.0));

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3631.0));
        assert_eq!(matched_unix(matched), Some(3660.0));

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3629.0));
        assert_eq!(matched_unix(matched), Some(3600.0));
    }

    #[test]
    fn test_best_guess_past_the_end() {
        let location_series = series(&[3600.0, 3660.0, 3720.0]);

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3780.0));
        assert_eq!(matched_unix(matched), Some(3720.0));
    }

    #[test]
    fn test_best_guess_before_the_start() {
        let location_series = series(&[3600.0, 3660.0, 3720.0]);

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3100.0));
        assert_eq!(matched_unix(matched), Some(3600.0));

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(2000.0));
        assert_eq!(matched_unix(matched), None);
    }

    #[test]
    fn test_best_guess_no_near_record() {
        let location_series = series(&[3600.0, 3660.0, 3720.0]);

        // Eleven minutes after the last fix.
        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3720.0 + 11.0 * 60.0));
        assert_eq!(matched_unix(matched), None);
    }

    #[test]
    fn test_best_guess_prefers_in_window_neighbor() {
        // Previous fix 9 minutes back, next fix 11 minutes ahead: only the
        // previous one is admissible.
        let location_series = series(&[3600.0, 3600.0 + 20.0 * 60.0]);

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3600.0 + 9.0 * 60.0));
        assert_eq!(matched_unix(matched), Some(3600.0));

        let matched = LocationMatchStrategy::BestGuess
            .match_location(&location_series, Epoch::from_unix_seconds(3600.0 + 11.0 * 60.0));
        assert_eq!(matched_unix(matched), Some(3600.0 + 20.0 * 60.0));
    }

    #[test]
    fn test_sparse_carries_last_position_forward() {
        let location_series = series(&[0.0]);

        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(3.0 * 3600.0));
        assert_eq!(matched_unix(matched), Some(0.0));

        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(13.0 * 3600.0));
        assert_eq!(matched_unix(matched), None);
    }

    #[test]
    fn test_sparse_prefers_previous_without_distance_check() {
        let location_series = series(&[0.0, 100.0 * 3600.0]);

        // Two days short of the next fix, but the previous one stands no
        // matter how old it is.
        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(50.0 * 3600.0));
        assert_eq!(matched_unix(matched), Some(0.0));
    }

    #[test]
    fn test_sparse_before_the_start() {
        let location_series = series(&[100.0 * 3600.0]);

        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(90.0 * 3600.0));
        assert_eq!(matched_unix(matched), Some(100.0 * 3600.0));

        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(50.0 * 3600.0));
        assert_eq!(matched_unix(matched), None);
    }

    #[test]
    fn test_sparse_exact_match() {
        let location_series = series(&[3600.0, 7200.0]);

        let matched = LocationMatchStrategy::SparseData
            .match_location(&location_series, Epoch::from_unix_seconds(7200.0));
        assert_eq!(matched_unix(matched), Some(7200.0));
    }

    #[test]
    fn test_strategy_tokens() {
        assert_eq!(
            "best guess".parse::<LocationMatchStrategy>().unwrap(),
            LocationMatchStrategy::BestGuess
        );
        assert_eq!(
            "sparse data".parse::<LocationMatchStrategy>().unwrap(),
            LocationMatchStrategy::SparseData
        );
        assert!("nearest".parse::<LocationMatchStrategy>().is_err());
    }
}
