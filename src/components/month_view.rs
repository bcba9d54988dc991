use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::calendar::CalendarState;
use crate::theme;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub struct MonthView;

impl MonthView {
    pub fn render(frame: &mut Frame, area: Rect, calendar: &CalendarState, today: NaiveDate) {
        let theme = theme::current();
        let month = calendar.visible_month();
        let selected_date = calendar.selected_date();

        let title = if calendar.is_loading() {
            format!(" {} {} (loading) ", month.name(), month.year())
        } else {
            format!(" {} {} ", month.name(), month.year())
        };

        let block = Block::default()
            .title(title)
            .title_style(theme.header)
            .borders(Borders::ALL)
            .border_style(theme.border);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        // Header row
        let header_cells: Vec<Span> = DAY_NAMES
            .iter()
            .map(|d| Span::styled(format!("{:^5}", d), theme.header))
            .collect();
        let header = Line::from(header_cells);

        let first_weekday = month.first_day().weekday().num_days_from_sunday() as i32;
        let days_in_month = month.days() as i32;

        // Build weeks
        let mut weeks: Vec<Line> = Vec::new();
        let mut current_day: i32 = 1 - first_weekday;

        while current_day <= days_in_month {
            let mut cells: Vec<Span> = Vec::new();
            for _ in 0..7 {
                if current_day < 1 || current_day > days_in_month {
                    cells.push(Span::raw("     "));
                } else {
                    let date = month.clamp_day(current_day as u32);
                    let count = calendar.event_count_for_day(date);
                    let marker = "\u{2022}".repeat(count.min(2));

                    let style = if date == today && date == selected_date {
                        theme.today.add_modifier(Modifier::BOLD | Modifier::REVERSED)
                    } else if date == selected_date {
                        theme.selected
                    } else if date == today {
                        theme.today
                    } else {
                        Style::default()
                    };

                    cells.push(Span::styled(format!(" {:>2}", current_day), style));
                    cells.push(Span::styled(format!("{:<2}", marker), theme.marker));
                }
                current_day += 1;
            }
            weeks.push(Line::from(cells));
        }

        // Layout: header + weeks
        let mut constraints = vec![Constraint::Length(1)];
        for _ in &weeks {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Min(0));

        let rows = Layout::vertical(constraints).split(inner);

        frame.render_widget(Paragraph::new(header), rows[0]);
        for (i, week) in weeks.into_iter().enumerate() {
            frame.render_widget(Paragraph::new(week), rows[i + 1]);
        }
    }
}
