// crates/gauntlet-core/src/core/time.rs
// ============================================================================
// Module: Gauntlet Time Model
// Description: Canonical timestamp representation for workflow records.
// Purpose: Provide deterministic, replayable time values across Gauntlet records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Gauntlet uses explicit time values embedded in entry-point calls and
//! workflow records to keep replay deterministic. The pipeline engine never
//! reads wall-clock time directly; hosts supply timestamps at the boundary
//! and period dates derive from the workflow's creation time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used in Gauntlet logs and workflow records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the engine never reads the
///   wall clock.
/// - Stored as unix epoch milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the UTC calendar date of the timestamp, when representable.
    #[must_use]
    pub fn date(self) -> Option<Date> {
        let seconds = self.0.div_euclid(1_000);
        OffsetDateTime::from_unix_timestamp(seconds).ok().map(|value| value.date())
    }
}

// ============================================================================
// SECTION: Date Helpers
// ============================================================================

/// Shifts a date backwards by whole years, clamping 29 February to 28.
#[must_use]
pub fn years_before(date: Date, years: i32) -> Date {
    let year = date.year() - years;
    Date::from_calendar_date(year, date.month(), date.day())
        .or_else(|_| Date::from_calendar_date(year, date.month(), 28))
        .unwrap_or(date)
}

/// Shifts a date backwards by whole days.
#[must_use]
pub fn days_before(date: Date, days: i64) -> Date {
    date.checked_sub(time::Duration::days(days)).unwrap_or(date)
}

/// Shifts a date backwards by whole calendar months, clamping the day.
#[must_use]
pub fn months_before(date: Date, months: i32) -> Date {
    let total = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - months;
    let year = total.div_euclid(12);
    let month_index = total.rem_euclid(12) + 1;
    let Ok(month_u8) = u8::try_from(month_index) else {
        return date;
    };
    let Ok(month) = time::Month::try_from(month_u8) else {
        return date;
    };
    let mut day = date.day();
    loop {
        match Date::from_calendar_date(year, month, day) {
            Ok(value) => return value,
            Err(_) if day > 1 => day -= 1,
            Err(_) => return date,
        }
    }
}

/// Renders a date in the runner's `YYYY.MM.DD` configuration form.
#[must_use]
pub fn ini_date(date: Date) -> String {
    format!("{:04}.{:02}.{:02}", date.year(), u8::from(date.month()), date.day())
}
