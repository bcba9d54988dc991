//! Per-day views over a month's events.
//!
//! The event list and the month grid's per-day counter share one
//! predicate: a saved event belongs to a day when it starts inside the
//! day's `[midnight, next midnight)` window and ends before the next
//! midnight.

use chrono::{NaiveDate, TimeZone};

use super::event::ScheduleEvent;
use super::month::TimeWindow;

fn belongs_to(event: &ScheduleEvent, window: &TimeWindow) -> bool {
    event.is_saved() && window.contains(event.start) && event.end < window.end
}

pub fn filter_by_day<'a, Tz: TimeZone>(
    events: &'a [ScheduleEvent],
    day: NaiveDate,
    tz: &Tz,
) -> Vec<&'a ScheduleEvent> {
    let window = TimeWindow::day(tz, day);
    events.iter().filter(|e| belongs_to(e, &window)).collect()
}

pub fn event_count_for_day<Tz: TimeZone>(
    events: &[ScheduleEvent],
    day: NaiveDate,
    tz: &Tz,
) -> usize {
    let window = TimeWindow::day(tz, day);
    events.iter().filter(|e| belongs_to(e, &window)).count()
}
