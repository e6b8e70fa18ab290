//! Calendar-based token lifetimes.

use time::{Date, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;

/// A lifetime of whole calendar months.
///
/// Adding a month keeps the day of month and the time of day. When the
/// target month is shorter, the day is clamped to its last day, so
/// January 31st plus one month is the last day of February.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMonths(pub u8);

impl CalendarMonths {
    /// Returns the instant this many months after `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the result falls outside the supported
    /// date range.
    pub fn after(self, issued_at: OffsetDateTime) -> AuthResult<OffsetDateTime> {
        let date = issued_at.date();
        let month = date.month().nth_next(self.0);
        let years = (i32::from(u8::from(date.month())) - 1 + i32::from(self.0)) / 12;
        let year = date.year() + years;

        let target = (1..=date.day())
            .rev()
            .find_map(|day| Date::from_calendar_date(year, month, day).ok())
            .ok_or_else(|| {
                AuthError::internal(format!(
                    "{} month(s) after {issued_at} is out of range",
                    self.0
                ))
            })?;

        Ok(issued_at.replace_date(target))
    }
}
