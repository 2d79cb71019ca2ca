use std::cmp::Ordering;
use std::fmt;

use time::{util, Date, Month, OffsetDateTime};

/// Years outside this range are rejected, which keeps `next`/`prev` well
/// clear of integer overflow at the window edges.
pub const MIN_YEAR: i32 = -9999;
pub const MAX_YEAR: i32 = 9999;

/// One calendar date. Months are zero-based (`0` = January) to match the
/// persisted view-state format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRecord {
    day: u8,
    month: u8,
    year: i32,
}

impl DayRecord {
    /// Returns `None` when the triple does not name a real calendar day.
    pub fn new(day: u8, month: u8, year: i32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        if month > 11 || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { day, month, year })
    }

    /// First day of a month, used to seed the window from persisted state.
    pub fn first_of_month(month: u8, year: i32) -> Option<Self> {
        Self::new(1, month, year)
    }

    pub fn today() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|err| {
            tracing::debug!(?err, "local offset unavailable, using UTC for today");
            OffsetDateTime::now_utc()
        });
        Self::from_date(now.date())
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            day: date.day(),
            month: u8::from(date.month()) - 1,
            year: date.year(),
        }
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn calendar_month(&self) -> Month {
        calendar_month(self.month)
    }

    /// `None` only for years outside the range `time::Date` supports.
    pub fn to_date(&self) -> Option<Date> {
        Date::from_calendar_date(self.year, self.calendar_month(), self.day).ok()
    }

    pub fn is_first_of_month(&self) -> bool {
        self.day == 1
    }

    pub fn next(&self) -> Self {
        next(*self)
    }

    pub fn prev(&self) -> Self {
        prev(*self)
    }

    fn sort_key(&self) -> (i32, u8, u8) {
        (self.year, self.month, self.day)
    }
}

impl Ord for DayRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for DayRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{}", self.day, self.month + 1, self.year)
    }
}

pub fn calendar_month(month: u8) -> Month {
    Month::January.nth_next(month % 12)
}

pub fn month_abbreviation(month: u8) -> String {
    calendar_month(month).to_string().chars().take(3).collect()
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    util::days_in_year_month(year, calendar_month(month))
}

pub fn next(d: DayRecord) -> DayRecord {
    if d.day < days_in_month(d.year, d.month) {
        return DayRecord {
            day: d.day + 1,
            ..d
        };
    }
    if d.month < 11 {
        return DayRecord {
            day: 1,
            month: d.month + 1,
            year: d.year,
        };
    }
    DayRecord {
        day: 1,
        month: 0,
        year: d.year + 1,
    }
}

pub fn prev(d: DayRecord) -> DayRecord {
    if d.day > 1 {
        return DayRecord {
            day: d.day - 1,
            ..d
        };
    }
    if d.month > 0 {
        let month = d.month - 1;
        return DayRecord {
            day: days_in_month(d.year, month),
            month,
            year: d.year,
        };
    }
    DayRecord {
        day: 31,
        month: 11,
        year: d.year - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u8, m: u8, y: i32) -> DayRecord {
        DayRecord::new(d, m, y).expect("valid test date")
    }

    #[test]
    fn next_rolls_over_year_end() {
        assert_eq!(next(day(31, 11, 2023)), day(1, 0, 2024));
    }

    #[test]
    fn next_respects_leap_years() {
        assert_eq!(next(day(28, 1, 2024)), day(29, 1, 2024));
        assert_eq!(next(day(28, 1, 2023)), day(1, 2, 2023));
        assert_eq!(next(day(29, 1, 2000)), day(1, 2, 2000));
    }

    #[test]
    fn prev_rolls_back_across_months_and_years() {
        assert_eq!(prev(day(1, 0, 2024)), day(31, 11, 2023));
        assert_eq!(prev(day(1, 2, 2024)), day(29, 1, 2024));
        assert_eq!(prev(day(1, 2, 1900)), day(28, 1, 1900));
        assert_eq!(prev(day(1, 4, 2024)), day(30, 3, 2024));
    }

    #[test]
    fn next_and_prev_round_trip_over_several_years() {
        let mut current = day(1, 0, 1999);
        let end = day(31, 11, 2004);
        while current < end {
            let following = next(current);
            assert!(following > current);
            assert_eq!(prev(following), current);
            assert_eq!(next(prev(following)), following);
            current = following;
        }
    }

    #[test]
    fn next_matches_time_crate_successor() {
        let mut current = day(20, 1, 2096);
        for _ in 0..2000 {
            let expected = current
                .to_date()
                .and_then(|date| date.next_day())
                .map(DayRecord::from_date)
                .expect("date in range");
            assert_eq!(next(current), expected);
            current = expected;
        }
    }

    #[test]
    fn rejects_years_outside_supported_range() {
        assert!(DayRecord::new(1, 0, MIN_YEAR).is_some());
        assert!(DayRecord::new(31, 11, MAX_YEAR).is_some());
        assert!(DayRecord::new(1, 0, MIN_YEAR - 1).is_none());
        assert!(DayRecord::new(1, 0, i32::MIN).is_none());
        assert!(DayRecord::new(31, 11, i32::MAX).is_none());
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(DayRecord::new(30, 1, 2024).is_none());
        assert!(DayRecord::new(29, 1, 2023).is_none());
        assert!(DayRecord::new(0, 3, 2024).is_none());
        assert!(DayRecord::new(1, 12, 2024).is_none());
        assert!(DayRecord::new(31, 3, 2024).is_none());
    }

    #[test]
    fn formats_like_journal_dates() {
        assert_eq!(day(5, 5, 2024).to_string(), "05/06/2024");
        assert_eq!(month_abbreviation(5), "Jun");
    }
}
