use chrono::{Local, NaiveDate, TimeZone};
use tracing::debug;

use super::error::ScheduleError;
use super::event::ScheduleEvent;
use super::filter;
use super::month::Month;

/// Token identifying one month fetch. Only the latest one is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub month: Month,
}

/// What the calendar screen shows: the visible month, the selected day,
/// and the events fetched for that month.
///
/// Mutated only by the UI loop, from user intents and from completed
/// repository calls.
#[derive(Debug, Clone)]
pub struct CalendarState<Tz: TimeZone = Local> {
    tz: Tz,
    selected_date: NaiveDate,
    visible_month: Month,
    events: Vec<ScheduleEvent>,
    generation: u64,
    loading: bool,
    last_error: Option<ScheduleError>,
}

impl<Tz: TimeZone> CalendarState<Tz> {
    pub fn new(tz: Tz, today: NaiveDate) -> Self {
        Self {
            tz,
            selected_date: today,
            visible_month: Month::of(today),
            events: Vec::new(),
            generation: 0,
            loading: false,
            last_error: None,
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn visible_month(&self) -> Month {
        self.visible_month
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&ScheduleError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Selects `date`. Returns a fetch ticket when the visible month
    /// changed as a result.
    pub fn select_date(&mut self, date: NaiveDate) -> Option<FetchTicket> {
        self.selected_date = date;
        let month = Month::of(date);
        if month == self.visible_month {
            return None;
        }
        self.visible_month = month;
        self.events.clear();
        Some(self.begin_fetch())
    }

    /// Shows `month`, keeping the selected day-of-month where possible.
    pub fn show_month(&mut self, month: Month) -> Option<FetchTicket> {
        use chrono::Datelike;
        let date = month.clamp_day(self.selected_date.day());
        self.select_date(date)
    }

    /// Starts a fetch for the visible month, superseding any in flight.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            month: self.visible_month,
        }
    }

    /// Applies a fetch result. Returns `false` when the ticket is stale
    /// and the result was discarded.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ScheduleEvent>, ScheduleError>,
    ) -> bool {
        if ticket.generation != self.generation || ticket.month != self.visible_month {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                month = %ticket.month,
                "discarding stale fetch"
            );
            return false;
        }
        self.loading = false;
        match result {
            Ok(events) => {
                self.events = events;
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e),
        }
        true
    }

    /// Replaces the event with the same id, or appends a new one. An
    /// event that no longer starts in the visible month is evicted.
    pub fn apply_saved(&mut self, event: ScheduleEvent) {
        let Some(id) = event.id.clone() else {
            return;
        };
        let in_month = self.visible_month.window(&self.tz).contains(event.start);
        let position = self
            .events
            .iter()
            .position(|e| e.id.as_deref() == Some(id.as_str()));
        match (position, in_month) {
            (Some(i), true) => self.events[i] = event,
            (Some(i), false) => {
                self.events.remove(i);
            }
            (None, true) => self.events.push(event),
            (None, false) => {}
        }
    }

    pub fn apply_deleted(&mut self, id: &str) {
        self.events.retain(|e| e.id.as_deref() != Some(id));
    }

    pub fn reset(&mut self, today: NaiveDate) {
        self.selected_date = today;
        self.visible_month = Month::of(today);
        self.events.clear();
        self.generation += 1;
        self.loading = false;
        self.last_error = None;
    }

    pub fn day_events(&self) -> Vec<&ScheduleEvent> {
        filter::filter_by_day(&self.events, self.selected_date, &self.tz)
    }

    pub fn event_count_for_day(&self, day: NaiveDate) -> usize {
        filter::event_count_for_day(&self.events, day, &self.tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ServiceError;
    use chrono::{DateTime, Utc};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn saved(id: &str, start: DateTime<Utc>) -> ScheduleEvent {
        let mut e = ScheduleEvent::draft(start, start + chrono::Duration::hours(1));
        e.id = Some(id.to_string());
        e
    }

    #[test]
    fn moving_within_month_does_not_refetch() {
        let mut state = CalendarState::new(Utc, day(3, 5));
        assert!(state.select_date(day(3, 20)).is_none());
        let ticket = state.select_date(day(4, 1)).unwrap();
        assert_eq!(ticket.month, Month::new(2024, 4).unwrap());
        assert_eq!(state.visible_month(), ticket.month);
    }

    #[test]
    fn show_month_clamps_day() {
        let mut state = CalendarState::new(Utc, day(3, 31));
        state.show_month(Month::new(2024, 4).unwrap());
        assert_eq!(state.selected_date(), day(4, 30));
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut state = CalendarState::new(Utc, day(3, 5));
        let march = state.begin_fetch();
        let april = state.show_month(Month::new(2024, 4).unwrap()).unwrap();

        assert!(state.apply_fetch(april, Ok(vec![saved("apr", at(4, 2, 9))])));
        assert!(!state.apply_fetch(march, Ok(vec![saved("mar", at(3, 5, 9))])));
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.events()[0].id.as_deref(), Some("apr"));
        assert!(!state.is_loading());
    }

    #[test]
    fn failed_fetch_keeps_events_and_records_error() {
        let mut state = CalendarState::new(Utc, day(3, 5));
        let t = state.begin_fetch();
        state.apply_fetch(t, Ok(vec![saved("a", at(3, 5, 9))]));

        let t = state.begin_fetch();
        let err = ScheduleError::Fetch {
            month: t.month,
            source: ServiceError::Network("offline".into()),
        };
        state.apply_fetch(t, Err(err.clone()));
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.last_error(), Some(&err));
        assert!(err.is_retryable());
    }

    #[test]
    fn saved_events_are_replaced_appended_or_evicted() {
        let mut state = CalendarState::new(Utc, day(3, 5));
        state.apply_saved(saved("a", at(3, 5, 9)));
        state.apply_saved(saved("b", at(3, 6, 9)));
        assert_eq!(state.events().len(), 2);

        let mut edited = saved("a", at(3, 7, 9));
        edited.title = "moved".into();
        state.apply_saved(edited);
        assert_eq!(state.events()[0].title, "moved");

        state.apply_saved(saved("b", at(4, 1, 9)));
        assert_eq!(state.events().len(), 1);

        state.apply_saved(ScheduleEvent::draft(at(3, 5, 9), at(3, 5, 10)));
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn deleted_events_are_evicted_by_id() {
        let mut state = CalendarState::new(Utc, day(3, 5));
        state.apply_saved(saved("a", at(3, 5, 9)));
        state.apply_saved(saved("b", at(3, 5, 11)));
        state.apply_deleted("a");
        let ids: Vec<_> = state.day_events().iter().filter_map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["b".to_string()]);
        assert_eq!(state.event_count_for_day(day(3, 5)), 1);
    }
}
