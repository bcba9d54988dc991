use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

/// Half-open `[start, end)` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Local midnight of `day` up to local midnight of the following day.
    pub fn day<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> Self {
        let next = day.succ_opt().unwrap_or(NaiveDate::MAX);
        Self {
            start: start_of_day(tz, day),
            end: start_of_day(tz, next),
        }
    }
}

/// The UTC instant of local midnight. Falls back to the earliest valid
/// local time when midnight falls in a DST gap.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => tz
            .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc()),
    }
}

/// A calendar month, independent of time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// `None` when `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days(&self) -> u32 {
        self.succ()
            .first_day()
            .signed_duration_since(self.first_day())
            .num_days() as u32
    }

    /// The same day-of-month in this month, clamped to its last day.
    pub fn clamp_day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.days());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_else(|| self.first_day())
    }

    /// First-of-month 00:00 up to first-of-next-month 00:00, local to `tz`.
    pub fn window<Tz: TimeZone>(&self, tz: &Tz) -> TimeWindow {
        TimeWindow {
            start: start_of_day(tz, self.first_day()),
            end: start_of_day(tz, self.succ().first_day()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.month {
            1 => "January",
            2 => "February",
            3 => "March",
            4 => "April",
            5 => "May",
            6 => "June",
            7 => "July",
            8 => "August",
            9 => "September",
            10 => "October",
            11 => "November",
            12 => "December",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn navigation_wraps_years() {
        let dec = Month::new(2023, 12).unwrap();
        assert_eq!(dec.succ(), Month::new(2024, 1).unwrap());
        assert_eq!(dec.succ().pred(), dec);
        assert!(Month::new(2024, 13).is_none());
    }

    #[test]
    fn days_handles_leap_years() {
        assert_eq!(Month::new(2024, 2).unwrap().days(), 29);
        assert_eq!(Month::new(2023, 2).unwrap().days(), 28);
        assert_eq!(Month::new(2024, 3).unwrap().clamp_day(31).day(), 31);
        assert_eq!(Month::new(2024, 4).unwrap().clamp_day(31).day(), 30);
    }

    #[test]
    fn window_is_local_midnight_to_next_month() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let w = Month::new(2024, 3).unwrap().window(&jst);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 2, 29, 15, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 31, 15, 0, 0).unwrap());
        assert!(w.contains(w.start));
        assert!(!w.contains(w.end));
    }

    #[test]
    fn display_is_year_dash_month() {
        assert_eq!(Month::new(2024, 3).unwrap().to_string(), "2024-03");
    }
}
