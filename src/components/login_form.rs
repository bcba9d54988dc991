use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::event_form::render_field;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginField {
    UserName,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginFormState {
    pub user_name: String,
    pub password: String,
    pub active_field: LoginField,
    pub pending: bool,
}

impl Default for LoginFormState {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            password: String::new(),
            active_field: LoginField::UserName,
            pending: false,
        }
    }
}

impl LoginFormState {
    pub fn toggle_field(&mut self) {
        self.active_field = match self.active_field {
            LoginField::UserName => LoginField::Password,
            LoginField::Password => LoginField::UserName,
        };
    }

    pub fn input_char(&mut self, c: char) {
        match self.active_field {
            LoginField::UserName => self.user_name.push(c),
            LoginField::Password => self.password.push(c),
        }
    }

    pub fn backspace(&mut self) {
        match self.active_field {
            LoginField::UserName => {
                self.user_name.pop();
            }
            LoginField::Password => {
                self.password.pop();
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.user_name.trim().is_empty() && !self.password.is_empty()
    }
}

pub struct LoginForm;

impl LoginForm {
    pub fn render(frame: &mut Frame, area: Rect, state: &LoginFormState) {
        let theme = theme::current();

        let form_w = area.width.min(44).max(28);
        let form_h = area.height.min(8).max(7);
        let x = area.x + (area.width.saturating_sub(form_w)) / 2;
        let y = area.y + (area.height.saturating_sub(form_h)) / 2;
        let form_area = Rect::new(x, y, form_w, form_h);

        frame.render_widget(Clear, form_area);

        let block = Block::default()
            .title(" Sign up / Log in ")
            .title_style(theme.header)
            .borders(Borders::ALL)
            .border_style(theme.border);

        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let rows = Layout::vertical([
            Constraint::Length(1), // user
            Constraint::Length(1), // password
            Constraint::Length(1), // spacer
            Constraint::Length(1), // help
            Constraint::Min(0),
        ])
        .split(inner);

        let masked = "*".repeat(state.password.chars().count());
        render_field(
            frame,
            rows[0],
            "User:",
            &state.user_name,
            state.active_field == LoginField::UserName,
        );
        render_field(
            frame,
            rows[1],
            "Pass:",
            &masked,
            state.active_field == LoginField::Password,
        );

        let help = if state.pending {
            Line::from(Span::styled("Logging in...", theme.dim))
        } else {
            let key = Style::default().add_modifier(Modifier::BOLD);
            Line::from(vec![
                Span::styled("Tab", key),
                Span::styled(":Next ", theme.dim),
                Span::styled("Enter", key),
                Span::styled(":Log in ", theme.dim),
                Span::styled("Esc", key),
                Span::styled(":Quit", theme.dim),
            ])
        };
        frame.render_widget(Paragraph::new(help), rows[3]);
    }
}
