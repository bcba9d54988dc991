use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme;

/// One-line message shown at the right of the status bar until the next
/// key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

pub struct StatusBar;

impl StatusBar {
    /// `left` names the screen; `hints` is shown when there is no message.
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        left: &str,
        message: Option<&StatusMessage>,
        hints: &str,
    ) {
        let theme = theme::current();
        let w = area.width as usize;

        let (right_text, right_style) = match message {
            Some(msg) if msg.is_error => (format!(" {} ", msg.text), theme.error),
            Some(msg) => (format!(" {} ", msg.text), theme.status),
            None => (hints.to_string(), theme.status),
        };

        let left = format!(" {} ", left);
        let used = left.chars().count() + right_text.chars().count();
        let padding = " ".repeat(w.saturating_sub(used));

        let line = Line::from(vec![
            Span::styled(left, theme.status),
            Span::styled(padding, theme.status),
            Span::styled(right_text, right_style),
        ]);

        let bar = Paragraph::new(line).style(theme.status);
        frame.render_widget(bar, area);
    }
}
