use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::calendar::ScheduleEvent;
use crate::theme;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormField {
    Title,
    Start,
    End,
    Body,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Title => FormField::Start,
            FormField::Start => FormField::End,
            FormField::End => FormField::Body,
            FormField::Body => FormField::Title,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Title => FormField::Body,
            FormField::Start => FormField::Title,
            FormField::End => FormField::Start,
            FormField::Body => FormField::End,
        }
    }
}

/// Editor for a new draft or an existing event.
#[derive(Debug, Clone)]
pub struct EventFormState {
    /// The event being edited; `None` for a new draft.
    pub original: Option<ScheduleEvent>,
    pub title: String,
    pub start: String,
    pub end: String,
    pub body: String,
    pub active_field: FormField,
    pub saving: bool,
}

impl EventFormState {
    /// A draft on `date` from 09:00 to 10:00.
    pub fn new(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN));
        Self {
            original: None,
            title: String::new(),
            start: start.format(DATETIME_FORMAT).to_string(),
            end: (start + Duration::hours(1)).format(DATETIME_FORMAT).to_string(),
            body: String::new(),
            active_field: FormField::Title,
            saving: false,
        }
    }

    pub fn edit(event: &ScheduleEvent) -> Self {
        Self {
            original: Some(event.clone()),
            title: event.title.clone(),
            start: event.local_start().format(DATETIME_FORMAT).to_string(),
            end: event.local_end().format(DATETIME_FORMAT).to_string(),
            body: event.body.clone(),
            active_field: FormField::Title,
            saving: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.original.as_ref().is_some_and(ScheduleEvent::is_saved)
    }

    pub fn parsed_start(&self) -> Option<DateTime<Utc>> {
        parse_local(&self.start)
    }

    pub fn parsed_end(&self) -> Option<DateTime<Utc>> {
        parse_local(&self.end)
    }

    pub fn input_char(&mut self, c: char) {
        match self.active_field {
            FormField::Title => self.title.push(c),
            FormField::Start => {
                self.start.push(c);
                self.follow_start();
            }
            FormField::End => self.end.push(c),
            FormField::Body => self.body.push(c),
        }
    }

    pub fn backspace(&mut self) {
        match self.active_field {
            FormField::Title => {
                self.title.pop();
            }
            FormField::Start => {
                self.start.pop();
                self.follow_start();
            }
            FormField::End => {
                self.end.pop();
            }
            FormField::Body => {
                self.body.pop();
            }
        }
    }

    /// Keeps the end one hour after a valid start.
    fn follow_start(&mut self) {
        if let Ok(start) = NaiveDateTime::parse_from_str(&self.start, DATETIME_FORMAT) {
            self.end = (start + Duration::hours(1)).format(DATETIME_FORMAT).to_string();
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && self.parsed_start().is_some()
            && self.parsed_end().is_some()
    }

    /// The event to save, keeping id and ACL of the edited original.
    pub fn to_event(&self) -> Option<ScheduleEvent> {
        if !self.is_valid() {
            return None;
        }
        let start = self.parsed_start()?;
        let end = self.parsed_end()?;
        let mut event = self
            .original
            .clone()
            .unwrap_or_else(|| ScheduleEvent::draft(start, end));
        event.title = self.title.trim().to_string();
        event.body = self.body.clone();
        event.start = start;
        event.end = end;
        Some(event)
    }
}

fn parse_local(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct EventForm;

impl EventForm {
    pub fn render(frame: &mut Frame, area: Rect, state: &EventFormState) {
        let theme = theme::current();

        // Center the form popup
        let form_w = area.width.min(56).max(30);
        let form_h = area.height.min(12).max(9);
        let x = area.x + (area.width.saturating_sub(form_w)) / 2;
        let y = area.y + (area.height.saturating_sub(form_h)) / 2;
        let form_area = Rect::new(x, y, form_w, form_h);

        frame.render_widget(Clear, form_area);

        let title = if state.is_editing() { " Edit Event " } else { " New Event " };
        let block = Block::default()
            .title(title)
            .title_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));

        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let rows = Layout::vertical([
            Constraint::Length(1), // title
            Constraint::Length(1), // start
            Constraint::Length(1), // end
            Constraint::Length(1), // body
            Constraint::Length(1), // spacer
            Constraint::Length(1), // help
            Constraint::Min(0),
        ])
        .split(inner);

        let active = state.active_field;
        render_field(frame, rows[0], "Title:", &state.title, active == FormField::Title);
        render_field(frame, rows[1], "Start:", &state.start, active == FormField::Start);
        render_field(frame, rows[2], "End:", &state.end, active == FormField::End);
        render_field(frame, rows[3], "Notes:", &state.body, state.active_field == FormField::Body);

        let key = Style::default().add_modifier(Modifier::BOLD);
        let mut help = vec![
            Span::styled("Tab", key),
            Span::styled(":Next ", theme.dim),
            Span::styled("Enter", key),
            Span::styled(":Save ", theme.dim),
        ];
        if state.is_editing() {
            help.push(Span::styled("^D", key));
            help.push(Span::styled(":Delete ", theme.dim));
        }
        help.push(Span::styled("Esc", key));
        help.push(Span::styled(":Cancel", theme.dim));
        if state.saving {
            help = vec![Span::styled("Saving...", theme.dim)];
        }
        frame.render_widget(Paragraph::new(Line::from(help)), rows[5]);
    }
}

pub(crate) fn render_field(frame: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    let label_w = if label.is_empty() { 0 } else { 7 };
    let cursor = if active { "_" } else { "" };

    let style = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let mut spans = Vec::new();
    if !label.is_empty() {
        spans.push(Span::styled(
            format!("{:<width$}", label, width = label_w),
            theme::current().dim,
        ));
    }
    spans.push(Span::styled(format!("{}{}", value, cursor), style));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_5() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn new_draft_defaults_to_nine_to_ten() {
        let form = EventFormState::new(march_5());
        assert_eq!(form.start, "2024-03-05 09:00");
        assert_eq!(form.end, "2024-03-05 10:00");
        assert!(!form.is_editing());
        assert!(!form.is_valid());
    }

    #[test]
    fn editing_start_moves_end() {
        let mut form = EventFormState::new(march_5());
        form.active_field = FormField::Start;
        for _ in 0..5 {
            form.backspace();
        }
        assert_eq!(form.end, "2024-03-05 10:00");
        for c in "13:30".chars() {
            form.input_char(c);
        }
        assert_eq!(form.start, "2024-03-05 13:30");
        assert_eq!(form.end, "2024-03-05 14:30");
    }

    #[test]
    fn to_event_keeps_identity_of_original() {
        let mut original = ScheduleEvent::draft(Utc::now(), Utc::now());
        original.id = Some("abc".into());
        original.title = "Old".into();

        let mut form = EventFormState::edit(&original);
        assert!(form.is_editing());
        form.title = "  New  ".into();
        let event = form.to_event().unwrap();
        assert_eq!(event.id.as_deref(), Some("abc"));
        assert_eq!(event.title, "New");
    }

    #[test]
    fn blank_title_is_invalid() {
        let mut form = EventFormState::new(march_5());
        form.title = "   ".into();
        assert!(form.to_event().is_none());
        form.title = "Lunch".into();
        let event = form.to_event().unwrap();
        assert!(event.id.is_none());
        assert!(event.start < event.end);
    }
}
