use chrono::NaiveDate;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::calendar::ScheduleEvent;
use crate::theme;

pub struct DayView;

impl DayView {
    /// Lists the events of `date`; `cursor` indexes into `events`.
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        date: NaiveDate,
        events: &[&ScheduleEvent],
        cursor: usize,
    ) {
        let theme = theme::current();
        let w = area.width as usize;

        let title = if w >= 30 {
            format!(" {} ", date.format("%A, %B %d, %Y"))
        } else if w >= 18 {
            format!(" {} ", date.format("%b %d, %Y"))
        } else {
            format!(" {} ", date.format("%m/%d"))
        };

        let count_str = match events.len() {
            0 => String::new(),
            1 => " 1 event ".to_string(),
            n => format!(" {} events ", n),
        };

        let block = Block::default()
            .title(title)
            .title_style(theme.header)
            .title_bottom(Line::from(Span::styled(count_str, theme.dim)))
            .borders(Borders::ALL)
            .border_style(theme.border);

        if events.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let msg = Paragraph::new("No events").style(theme.dim);
            frame.render_widget(msg, inner);
            return;
        }

        let inner_w = area.width.saturating_sub(2) as usize;

        // Keep the cursor row on screen: each event takes two rows.
        let visible_rows = area.height.saturating_sub(2) as usize;
        let per_page = (visible_rows / 2).max(1);
        let skip = (cursor + 1).saturating_sub(per_page);

        let items: Vec<ListItem> = events
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, ev)| format_event(ev, inner_w, i == cursor))
            .collect();

        let list = List::new(items).block(block);
        frame.render_widget(list, area);
    }
}

fn format_event(ev: &ScheduleEvent, max_width: usize, selected: bool) -> ListItem<'static> {
    let theme = theme::current();
    let time_str = format!(" {} ", ev.duration_display());
    let title_style = if selected {
        theme.selected
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let head = Line::from(vec![
        Span::styled(time_str.clone(), Style::default().add_modifier(Modifier::DIM)),
        Span::styled(
            truncate(&ev.title, max_width.saturating_sub(time_str.len())),
            title_style,
        ),
    ]);
    let body = Line::from(Span::styled(
        format!("  {}", truncate(&ev.body, max_width.saturating_sub(2))),
        theme.dim,
    ));

    ListItem::new(vec![head, body])
}

fn truncate(s: &str, max: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max {
        first_line.to_string()
    } else if max > 3 {
        let cut: String = first_line.chars().take(max - 3).collect();
        format!("{}...", cut)
    } else {
        first_line.chars().take(max).collect()
    }
}
