use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::info;

use schedule_tui::app::{App, InputMode};
use schedule_tui::components;
use schedule_tui::config::{Backend, Config};
use schedule_tui::remote::http::Credentials;
use schedule_tui::remote::{HttpService, MemoryService, RemoteDataService, SessionCache};
use schedule_tui::{logging, theme, tui};

fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load()?;
    logging::init(&config)?;
    theme::init(&config.theme);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let service = connect(&config)?;
    info!(backend = ?config.backend, "starting");
    let mut app = App::new(service, runtime.handle().clone());

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app);
    tui::restore()?;
    info!("exiting");
    result
}

fn connect(config: &Config) -> Result<Arc<dyn RemoteDataService>> {
    Ok(match config.backend {
        Backend::Memory => Arc::new(MemoryService::new()),
        Backend::Remote => {
            let (application_key, client_key) = config.credentials()?;
            let cache = match &config.session_file {
                Some(path) => Some(SessionCache::new(path.clone())),
                None => SessionCache::default_location(),
            };
            let service = HttpService::new(
                &config.base_url,
                Credentials {
                    application_key,
                    client_key,
                },
                cache,
            )?;
            Arc::new(service)
        }
    })
}

fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    while app.running {
        app.process_completions();

        terminal.draw(|frame| {
            let area = frame.area();
            let w = area.width;

            // Main layout: content + status bar
            let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);
            let content_area = layout[0];

            match app.input_mode() {
                InputMode::Login => {
                    components::LoginForm::render(frame, content_area, &app.login_form)
                }
                InputMode::Normal | InputMode::Form => {
                    render_calendar_layout(frame, content_area, app, w)
                }
            }

            if let Some(ref form) = app.form_state {
                components::EventForm::render(frame, area, form);
            }

            if app.show_help {
                render_help(frame, area);
            }

            render_status_bar(frame, layout[1], app, w);
        })?;

        if let Some(key) = tui::next_key_event(Duration::from_millis(100))? {
            // Clear status message on any key
            app.status_message = None;

            // Help overlay takes priority
            if app.show_help {
                if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
                    app.show_help = false;
                }
                continue;
            }

            match app.input_mode() {
                InputMode::Login => handle_login_input(app, key.code, key.modifiers),
                InputMode::Form => handle_form_input(app, key.code, key.modifiers),
                InputMode::Normal => handle_normal_input(app, key.code, key.modifiers),
            }
        }
    }

    Ok(())
}

fn handle_login_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Esc, _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => app.running = false,
        (KeyCode::Enter, _) => app.submit_login(),
        (KeyCode::Tab, _) | (KeyCode::BackTab, _) => app.login_form.toggle_field(),
        (KeyCode::Backspace, _) => app.login_form.backspace(),
        (KeyCode::Char(c), _) => app.login_form.input_char(c),
        _ => {}
    }
}

fn handle_normal_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.running = false;
        }
        (KeyCode::Char('t'), _) => app.go_to_today(),
        (KeyCode::Char('r'), _) => app.retry(),
        (KeyCode::Char('n'), _) => app.open_event_form(),
        (KeyCode::Char('d'), _) => app.delete_selected_event(),
        (KeyCode::Char('L'), _) => app.log_out(),
        (KeyCode::Enter, _) => app.open_edit_form(),
        (KeyCode::Left, _) | (KeyCode::Char('h'), _) => app.prev_day(),
        (KeyCode::Right, _) | (KeyCode::Char('l'), _) => app.next_day(),
        (KeyCode::Up, KeyModifiers::SHIFT) | (KeyCode::Char('K'), _) => app.prev_week(),
        (KeyCode::Down, KeyModifiers::SHIFT) | (KeyCode::Char('J'), _) => app.next_week(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.cursor_up(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.cursor_down(),
        (KeyCode::Char('['), _) => app.prev_month(),
        (KeyCode::Char(']'), _) => app.next_month(),
        (KeyCode::Char('?'), _) => app.show_help = true,
        _ => {}
    }
}

fn handle_form_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => app.delete_form_event(),
        (KeyCode::Esc, _) => app.close_event_form(),
        (KeyCode::Enter, _) => app.submit_event_form(),
        (KeyCode::Tab, _) => app.form_tab(),
        (KeyCode::BackTab, _) => app.form_backtab(),
        (KeyCode::Backspace, _) => app.form_backspace(),
        (KeyCode::Char(c), _) => app.form_input_char(c),
        _ => {}
    }
}

fn render_calendar_layout(frame: &mut ratatui::Frame, area: Rect, app: &App, total_width: u16) {
    let day_events = app.day_events();
    if total_width < 60 {
        let rows = Layout::vertical([Constraint::Length(10), Constraint::Min(3)]).split(area);
        components::MonthView::render(frame, rows[0], &app.calendar, app.today);
        components::DayView::render(
            frame,
            rows[1],
            app.calendar.selected_date(),
            &day_events,
            app.day_cursor,
        );
    } else {
        let month_w = if total_width >= 100 { 44 } else { 37 };
        let content =
            Layout::horizontal([Constraint::Length(month_w), Constraint::Min(20)]).split(area);

        components::MonthView::render(frame, content[0], &app.calendar, app.today);
        components::DayView::render(
            frame,
            content[1],
            app.calendar.selected_date(),
            &day_events,
            app.day_cursor,
        );
    }
}

fn render_status_bar(frame: &mut ratatui::Frame, area: Rect, app: &App, w: u16) {
    let w = w as usize;

    let (left, hints) = match app.input_mode() {
        InputMode::Login => ("Log in".to_string(), " Tab:Next Enter:Log in Esc:Quit"),
        InputMode::Form => ("Event".to_string(), " Tab:Next Enter:Save Esc:Cancel"),
        InputMode::Normal => {
            let user = app
                .auth
                .session()
                .map(|s| s.user_name.clone())
                .unwrap_or_default();
            let hints = if w >= 90 {
                " hl:Day jk:Select [/]:Mon t:Today Enter:Edit n:New d:Del r:Reload ?:Help q:Quit"
            } else if w >= 50 {
                " jk:Select Enter:Edit n:New q:Quit"
            } else {
                " ?:Help q:Quit"
            };
            (user, hints)
        }
    };

    let message = app.status_message.clone().or_else(|| {
        app.calendar
            .last_error()
            .map(|e| components::StatusMessage::error(e.to_string()))
    });
    components::StatusBar::render(frame, area, &left, message.as_ref(), hints);
}

fn render_help(frame: &mut ratatui::Frame, area: Rect) {
    use ratatui::style::{Color, Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

    let dim = theme::current().dim;
    let popup_w = area.width.min(52).max(30);
    let popup_h = area.height.min(22).max(12);
    let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
    let popup_area = Rect::new(x, y, popup_w, popup_h);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Keybindings ")
        .title_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let entry = |keys: &'static str, desc: &'static str| {
        Line::from(vec![Span::styled(keys, key_style), Span::raw(desc)])
    };

    let lines = vec![
        Line::from(Span::styled("Navigation", section_style)),
        Line::from(vec![
            Span::styled("  h/l ", key_style),
            Span::styled("or ", dim),
            Span::styled("\u{2190}/\u{2192}  ", key_style),
            Span::raw("Previous/next day"),
        ]),
        entry("  J/K       ", "Next/previous week"),
        entry("  [/]       ", "Previous/next month"),
        entry("  t         ", "Jump to today"),
        entry("  j/k       ", "Select event in day list"),
        Line::from(""),
        Line::from(Span::styled("Events", section_style)),
        entry("  n         ", "Create new event"),
        entry("  Enter     ", "Edit selected event"),
        entry("  d         ", "Delete selected event"),
        entry("  Ctrl-D    ", "Delete event open in editor"),
        entry("  r         ", "Reload month"),
        Line::from(""),
        entry("  L         ", "Log out"),
        Line::from(vec![
            Span::styled("  q", key_style),
            Span::styled(" / ", dim),
            Span::styled("Esc     ", key_style),
            Span::raw("Quit / close popup"),
        ]),
    ];

    let para = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}
