//! Grant validity window resolution and calendar-year arithmetic.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Number of calendar years a grant stays valid when no expiry is given.
pub const DEFAULT_VALIDITY_YEARS: i32 = 2;

/// Shifts a timestamp by whole calendar years, keeping month, day, and
/// time of day.
///
/// A February 29 start whose target year is not a leap year clamps to
/// February 28 of that year; the window never extends past the shifted
/// calendar date.
#[must_use]
pub fn plus_calendar_years(value: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    let target_year = value.year() + years;
    value.with_year(target_year).unwrap_or_else(|| {
        value
            .with_day(28)
            .and_then(|clamped| clamped.with_year(target_year))
            .unwrap_or(value)
    })
}

/// Resolved validity window of a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// When the grant becomes effective.
    pub start: DateTime<Utc>,
    /// When the grant stops being effective.
    pub expiry: DateTime<Utc>,
}

impl ValidityWindow {
    /// Resolves the window from optional configured bounds.
    ///
    /// An omitted start becomes `now`; an omitted expiry becomes the
    /// effective start shifted by [`DEFAULT_VALIDITY_YEARS`] calendar years.
    #[must_use]
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let start = start.unwrap_or(now);
        let expiry = expiry.unwrap_or_else(|| plus_calendar_years(start, DEFAULT_VALIDITY_YEARS));
        Self { start, expiry }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
    use proptest::prelude::*;

    use super::{DEFAULT_VALIDITY_YEARS, ValidityWindow, plus_calendar_years};

    fn timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap_or_else(|error| panic!("bad test timestamp '{value}': {error}"))
            .with_timezone(&Utc)
    }

    #[test]
    fn plain_date_shifts_year_only() {
        let start = timestamp("2023-06-15T08:45:30Z");
        let shifted = plus_calendar_years(start, 2);
        assert_eq!(shifted, timestamp("2025-06-15T08:45:30Z"));
    }

    #[test]
    fn leap_day_start_clamps_to_february_28() {
        let start = timestamp("2024-02-29T10:30:00Z");
        let shifted = plus_calendar_years(start, 2);
        assert_eq!(shifted, timestamp("2026-02-28T10:30:00Z"));
    }

    #[test]
    fn leap_day_start_keeps_february_29_when_target_is_leap() {
        let start = timestamp("2024-02-29T10:30:00Z");
        let shifted = plus_calendar_years(start, 4);
        assert_eq!(shifted, timestamp("2028-02-29T10:30:00Z"));
    }

    #[test]
    fn omitted_start_becomes_now() {
        let now = timestamp("2025-01-10T12:00:00Z");
        let window = ValidityWindow::resolve(None, None, now);
        assert_eq!(window.start, now);
        assert_eq!(window.expiry, timestamp("2027-01-10T12:00:00Z"));
    }

    #[test]
    fn explicit_bounds_are_kept_verbatim() {
        let start = timestamp("2025-03-01T00:00:00Z");
        let expiry = timestamp("2025-09-01T00:00:00Z");
        let now = timestamp("2025-01-01T00:00:00Z");
        let window = ValidityWindow::resolve(Some(start), Some(expiry), now);
        assert_eq!(window.start, start);
        assert_eq!(window.expiry, expiry);
    }

    #[test]
    fn default_expiry_derives_from_explicit_start_not_now() {
        let start = timestamp("2024-02-29T23:59:59Z");
        let now = timestamp("2025-06-01T00:00:00Z");
        let window = ValidityWindow::resolve(Some(start), None, now);
        assert_eq!(window.expiry, timestamp("2026-02-28T23:59:59Z"));
    }

    proptest! {
        #[test]
        fn shifted_year_advances_by_two_and_preserves_the_rest(seconds in 0_i64..4_000_000_000) {
            let start = match Utc.timestamp_opt(seconds, 0).single() {
                Some(value) => value,
                None => return Ok(()),
            };
            let shifted = plus_calendar_years(start, DEFAULT_VALIDITY_YEARS);

            prop_assert_eq!(shifted.year(), start.year() + DEFAULT_VALIDITY_YEARS);
            prop_assert_eq!(shifted.time(), start.time());

            if start.month() == 2 && start.day() == 29 {
                prop_assert_eq!(shifted.month(), 2);
                prop_assert!(shifted.day() == 28 || shifted.day() == 29);
            } else {
                prop_assert_eq!(shifted.month(), start.month());
                prop_assert_eq!(shifted.day(), start.day());
            }
        }

        #[test]
        fn resolved_window_never_ends_before_it_starts(seconds in 0_i64..4_000_000_000) {
            let now = match Utc.timestamp_opt(seconds, 0).single() {
                Some(value) => value,
                None => return Ok(()),
            };
            let window = ValidityWindow::resolve(None, None, now);
            prop_assert!(window.expiry > window.start);
            prop_assert_eq!(window.start.hour(), window.expiry.hour());
        }
    }
}
