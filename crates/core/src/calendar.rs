//! Business-day calendar.
//!
//! Order timestamps and "today" are truncated to a calendar day in the
//! tenant's business time, expressed as a fixed offset from UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Largest accepted offset from UTC, in minutes.
pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Maps instants onto business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    /// A calendar whose days start at UTC midnight.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// A calendar offset from UTC by the given number of minutes.
    ///
    /// Returns `None` if the offset is outside ±18 hours.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
            return None;
        }
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    /// Offset from UTC in minutes.
    #[must_use]
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// The business day an instant falls on.
    #[must_use]
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// The current business day.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_utc_truncation() {
        let cal = BusinessCalendar::utc();
        let instant = Utc.with_ymd_and_hms(2026, 5, 1, 23, 59, 0).unwrap();
        assert_eq!(cal.day_of(instant), NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    }

    #[test]
    fn test_positive_offset_rolls_into_next_day() {
        // UTC+05:30
        let cal = BusinessCalendar::from_offset_minutes(330).unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 5, 1, 19, 0, 0).unwrap();
        assert_eq!(cal.day_of(instant), NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        assert_eq!(cal.offset_minutes(), 330);
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        assert!(BusinessCalendar::from_offset_minutes(19 * 60).is_none());
        assert!(BusinessCalendar::from_offset_minutes(-18 * 60).is_some());
    }
}
