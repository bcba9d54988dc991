use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::auth::{self, AuthState};
use crate::calendar::{CalendarState, FetchTicket, ScheduleError, ScheduleEvent, ScheduleRepository};
use crate::components::{EventFormState, LoginFormState, StatusMessage};
use crate::remote::{RemoteDataService, ServiceError, Session};

/// Result of a backend call, delivered back to the UI loop.
#[derive(Debug)]
pub enum Completion {
    Fetched(FetchTicket, Result<Vec<ScheduleEvent>, ScheduleError>),
    Saved(WriteTicket, Result<ScheduleEvent, ScheduleError>),
    Deleted(WriteTicket, Result<String, ScheduleError>),
    LoggedIn(Result<Session, ServiceError>),
    LoggedOut(Result<(), ServiceError>),
}

/// The session and editor a save or delete was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket {
    pub session: u64,
    pub form: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Login,
    Normal,
    Form,
}

pub struct App {
    pub running: bool,
    pub today: NaiveDate,
    pub auth: AuthState,
    pub calendar: CalendarState,
    pub login_form: LoginFormState,
    pub form_state: Option<EventFormState>,
    pub day_cursor: usize,
    pub show_help: bool,
    pub status_message: Option<StatusMessage>,
    repository: ScheduleRepository,
    runtime: Handle,
    session_serial: u64,
    form_serial: u64,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
}

impl App {
    /// Backend calls are spawned on `runtime`; their results are applied
    /// by [`App::process_completions`].
    pub fn new(service: Arc<dyn RemoteDataService>, runtime: Handle) -> Self {
        let today = Local::now().date_naive();
        let auth = AuthState::resolve(service.as_ref());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            running: true,
            today,
            auth,
            calendar: CalendarState::new(Local, today),
            login_form: LoginFormState::default(),
            form_state: None,
            day_cursor: 0,
            show_help: false,
            status_message: None,
            repository: ScheduleRepository::new(service),
            runtime,
            session_serial: 0,
            form_serial: 0,
            completions_tx,
            completions_rx,
        };

        if app.auth.is_logged_in() {
            app.refresh_events();
        }
        app
    }

    pub fn input_mode(&self) -> InputMode {
        if !self.auth.is_logged_in() {
            InputMode::Login
        } else if self.form_state.is_some() {
            InputMode::Form
        } else {
            InputMode::Normal
        }
    }

    pub fn day_events(&self) -> Vec<&ScheduleEvent> {
        self.calendar.day_events()
    }

    pub fn selected_event(&self) -> Option<&ScheduleEvent> {
        self.day_events().get(self.day_cursor).copied()
    }

    // ── backend calls ──

    fn write_ticket(&self) -> WriteTicket {
        WriteTicket {
            session: self.session_serial,
            form: self.form_serial,
        }
    }

    pub fn refresh_events(&mut self) {
        let ticket = self.calendar.begin_fetch();
        self.spawn_fetch(ticket);
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        debug!(month = %ticket.month, generation = ticket.generation, "fetching month");
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = repository.fetch_month(ticket.month, &Local).await;
            let _ = tx.send(Completion::Fetched(ticket, result));
        });
    }

    /// Retries the month fetch after a failure.
    pub fn retry(&mut self) {
        self.calendar.clear_error();
        self.refresh_events();
        self.status_message = Some(StatusMessage::info("Refreshing..."));
    }

    pub fn submit_login(&mut self) {
        if self.login_form.pending {
            return;
        }
        if !self.login_form.is_complete() {
            self.status_message = Some(StatusMessage::error("Enter a user name and password"));
            return;
        }
        self.login_form.pending = true;
        let service = Arc::clone(self.repository.service());
        let user_name = self.login_form.user_name.trim().to_string();
        let password = self.login_form.password.clone();
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = auth::sign_up_or_log_in(service.as_ref(), &user_name, &password).await;
            let _ = tx.send(Completion::LoggedIn(result));
        });
    }

    pub fn log_out(&mut self) {
        let service = Arc::clone(self.repository.service());
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = service.log_out().await;
            let _ = tx.send(Completion::LoggedOut(result));
        });
        self.auth = AuthState::LoggedOut;
        self.session_serial += 1;
        self.form_state = None;
        self.login_form = LoginFormState::default();
        self.calendar.reset(self.today);
        self.day_cursor = 0;
        self.status_message = Some(StatusMessage::info("Logged out"));
    }

    pub fn submit_event_form(&mut self) {
        let Some(form) = self.form_state.as_mut() else {
            return;
        };
        if form.saving {
            return;
        }
        let Some(event) = form.to_event() else {
            self.status_message = Some(StatusMessage::error(
                "Title and start/end (YYYY-MM-DD HH:MM) are required",
            ));
            return;
        };
        let Some(user_id) = self.auth.session().map(|s| s.user_id.clone()) else {
            self.status_message =
                Some(StatusMessage::error(ScheduleError::NotLoggedIn.to_string()));
            return;
        };
        form.saving = true;

        let ticket = self.write_ticket();
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = repository.save(&event, &user_id).await;
            let _ = tx.send(Completion::Saved(ticket, result));
        });
    }

    pub fn delete_selected_event(&mut self) {
        if let Some(event) = self.selected_event().cloned() {
            self.spawn_delete(event);
        }
    }

    /// Deletes the event open in the editor.
    pub fn delete_form_event(&mut self) {
        let event = self
            .form_state
            .as_ref()
            .filter(|f| f.is_editing())
            .and_then(|f| f.original.clone());
        if let Some(event) = event {
            self.spawn_delete(event);
        }
    }

    fn spawn_delete(&self, event: ScheduleEvent) {
        let ticket = self.write_ticket();
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = repository.delete(&event).await;
            let _ = tx.send(Completion::Deleted(ticket, result));
        });
    }

    /// Applies every completion that has arrived since the last tick.
    pub fn process_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
        }
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched(ticket, result) => {
                let error = result.as_ref().err().cloned();
                if self.calendar.apply_fetch(ticket, result) {
                    self.clamp_cursor();
                    if let Some(e) = error {
                        warn!(error = %e, "month fetch failed");
                        let hint = if e.is_retryable() { " (r to retry)" } else { "" };
                        self.status_message = Some(StatusMessage::error(format!("{e}{hint}")));
                    }
                }
            }
            Completion::Saved(ticket, _) | Completion::Deleted(ticket, _)
                if ticket.session != self.session_serial =>
            {
                debug!(?ticket, "discarding write from a previous session");
            }
            Completion::Saved(ticket, Ok(event)) => {
                self.calendar.apply_saved(event);
                if ticket.form == self.form_serial {
                    self.form_state = None;
                }
                self.clamp_cursor();
                self.status_message = Some(StatusMessage::info("Saved"));
            }
            Completion::Saved(ticket, Err(e)) => {
                warn!(error = %e, "save failed");
                if ticket.form == self.form_serial {
                    if let Some(form) = self.form_state.as_mut() {
                        form.saving = false;
                    }
                }
                self.report_write_error(ticket, &e);
            }
            Completion::Deleted(_, Ok(id)) => {
                self.calendar.apply_deleted(&id);
                let editing_deleted = self
                    .form_state
                    .as_ref()
                    .and_then(|f| f.original.as_ref())
                    .is_some_and(|e| e.id.as_deref() == Some(id.as_str()));
                if editing_deleted {
                    self.form_state = None;
                }
                self.clamp_cursor();
                self.status_message = Some(StatusMessage::info("Deleted"));
            }
            Completion::Deleted(ticket, Err(e)) => {
                warn!(error = %e, "delete failed");
                self.report_write_error(ticket, &e);
            }
            Completion::LoggedIn(Ok(session)) => {
                self.status_message =
                    Some(StatusMessage::info(format!("Logged in as {}", session.user_name)));
                self.auth = AuthState::LoggedIn(session);
                self.session_serial += 1;
                self.login_form = LoginFormState::default();
                self.calendar.reset(self.today);
                self.day_cursor = 0;
                self.refresh_events();
            }
            Completion::LoggedIn(Err(e)) => {
                warn!(error = %e, "log-in failed");
                self.login_form.pending = false;
                self.status_message = Some(StatusMessage::error(format!("Log-in failed: {e}")));
            }
            Completion::LoggedOut(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "remote log-out failed");
                }
            }
        }
    }

    /// A record that vanished remotely means the local month is stale.
    fn report_write_error(&mut self, ticket: WriteTicket, e: &ScheduleError) {
        if e.is_not_found() {
            self.status_message = Some(StatusMessage::error("Schedule no longer exists"));
            if ticket.form == self.form_serial {
                self.form_state = None;
            }
            self.refresh_events();
        } else {
            self.status_message = Some(StatusMessage::error(e.to_string()));
        }
    }

    // ── navigation ──

    fn select_date(&mut self, date: NaiveDate) {
        self.day_cursor = 0;
        if let Some(ticket) = self.calendar.select_date(date) {
            self.spawn_fetch(ticket);
        }
    }

    pub fn next_day(&mut self) {
        let date = self.calendar.selected_date();
        self.select_date(date.succ_opt().unwrap_or(date));
    }

    pub fn prev_day(&mut self) {
        let date = self.calendar.selected_date();
        self.select_date(date.pred_opt().unwrap_or(date));
    }

    pub fn next_week(&mut self) {
        self.select_date(self.calendar.selected_date() + Duration::weeks(1));
    }

    pub fn prev_week(&mut self) {
        self.select_date(self.calendar.selected_date() - Duration::weeks(1));
    }

    pub fn next_month(&mut self) {
        self.day_cursor = 0;
        if let Some(ticket) = self.calendar.show_month(self.calendar.visible_month().succ()) {
            self.spawn_fetch(ticket);
        }
    }

    pub fn prev_month(&mut self) {
        self.day_cursor = 0;
        if let Some(ticket) = self.calendar.show_month(self.calendar.visible_month().pred()) {
            self.spawn_fetch(ticket);
        }
    }

    pub fn go_to_today(&mut self) {
        self.today = Local::now().date_naive();
        self.select_date(self.today);
    }

    pub fn cursor_down(&mut self) {
        let len = self.day_events().len();
        if self.day_cursor + 1 < len {
            self.day_cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.day_cursor = self.day_cursor.saturating_sub(1);
    }

    fn clamp_cursor(&mut self) {
        let len = self.day_events().len();
        self.day_cursor = self.day_cursor.min(len.saturating_sub(1));
    }

    // ── event form ──

    pub fn open_event_form(&mut self) {
        self.form_serial += 1;
        self.form_state = Some(EventFormState::new(self.calendar.selected_date()));
    }

    pub fn open_edit_form(&mut self) {
        if let Some(form) = self.selected_event().map(EventFormState::edit) {
            self.form_serial += 1;
            self.form_state = Some(form);
        }
    }

    pub fn close_event_form(&mut self) {
        self.form_state = None;
    }

    pub fn form_tab(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.active_field = form.active_field.next();
        }
    }

    pub fn form_backtab(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.active_field = form.active_field.prev();
        }
    }

    pub fn form_input_char(&mut self, c: char) {
        if let Some(ref mut form) = self.form_state {
            form.input_char(c);
        }
    }

    pub fn form_backspace(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.backspace();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryService;
    use chrono::{TimeZone, Utc};

    async fn settle(app: &mut App) {
        let completion = app.completions_rx.recv().await.unwrap();
        app.apply(completion);
    }

    fn logged_out_app() -> App {
        App::new(Arc::new(MemoryService::new()), Handle::current())
    }

    async fn logged_in_app() -> App {
        let mut app = logged_out_app();
        app.login_form.user_name = "alice".into();
        app.login_form.password = "pw".into();
        app.submit_login();
        settle(&mut app).await; // log-in
        settle(&mut app).await; // first fetch
        app
    }

    #[tokio::test]
    async fn starts_logged_out_without_session() {
        let app = logged_out_app();
        assert_eq!(app.input_mode(), InputMode::Login);
    }

    #[tokio::test]
    async fn login_switches_to_calendar_and_fetches() {
        let app = logged_in_app().await;
        assert_eq!(app.input_mode(), InputMode::Normal);
        assert!(!app.calendar.is_loading());
        assert!(app.calendar.events().is_empty());
    }

    #[tokio::test]
    async fn failed_login_stays_on_login_screen() {
        let service = Arc::new(MemoryService::new());
        service.sign_up("alice", "pw").await.unwrap();
        let mut app = App::new(service, Handle::current());
        app.login_form.user_name = "alice".into();
        app.login_form.password = "wrong".into();
        app.submit_login();
        settle(&mut app).await;
        assert_eq!(app.input_mode(), InputMode::Login);
        assert!(!app.login_form.pending);
        assert!(app.status_message.as_ref().is_some_and(|m| m.is_error));
    }

    #[tokio::test]
    async fn create_then_delete_from_day_list() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        for c in "Dentist".chars() {
            app.form_input_char(c);
        }
        app.submit_event_form();
        settle(&mut app).await;

        assert!(app.form_state.is_none());
        assert_eq!(app.day_events().len(), 1);
        assert_eq!(app.selected_event().unwrap().title, "Dentist");

        app.delete_selected_event();
        settle(&mut app).await;
        assert!(app.day_events().is_empty());
        assert!(app.calendar.events().is_empty());
    }

    #[tokio::test]
    async fn editing_replaces_event_in_place() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        "Old".chars().for_each(|c| app.form_input_char(c));
        app.submit_event_form();
        settle(&mut app).await;

        app.open_edit_form();
        assert!(app.form_state.as_ref().unwrap().is_editing());
        app.form_backspace();
        app.form_backspace();
        app.form_backspace();
        "New".chars().for_each(|c| app.form_input_char(c));
        app.submit_event_form();
        settle(&mut app).await;

        assert_eq!(app.calendar.events().len(), 1);
        assert_eq!(app.calendar.events()[0].title, "New");
    }

    #[tokio::test]
    async fn ctrl_d_in_editor_deletes_the_edited_event() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        "Gym".chars().for_each(|c| app.form_input_char(c));
        app.submit_event_form();
        settle(&mut app).await;

        app.open_edit_form();
        app.delete_form_event();
        settle(&mut app).await;
        assert!(app.form_state.is_none());
        assert!(app.calendar.events().is_empty());

        app.open_event_form();
        app.delete_form_event();
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), app.completions_rx.recv())
                .await;
        assert!(pending.is_err());
        assert!(app.form_state.is_some());
    }

    #[tokio::test]
    async fn finished_save_keeps_a_form_opened_afterwards() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        "First".chars().for_each(|c| app.form_input_char(c));
        app.submit_event_form();

        app.close_event_form();
        app.open_event_form();
        "Second".chars().for_each(|c| app.form_input_char(c));
        settle(&mut app).await;

        assert_eq!(app.calendar.events().len(), 1);
        let form = app.form_state.as_ref().unwrap();
        assert_eq!(form.title, "Second");
        assert!(!form.saving);
    }

    #[tokio::test]
    async fn writes_from_before_log_out_are_discarded() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        "Late".chars().for_each(|c| app.form_input_char(c));
        app.submit_event_form();
        app.log_out();

        settle(&mut app).await;
        settle(&mut app).await;
        assert!(app.calendar.events().is_empty());
        assert_eq!(app.status_message, Some(StatusMessage::info("Logged out")));
    }

    #[tokio::test]
    async fn invalid_form_is_not_submitted() {
        let mut app = logged_in_app().await;
        app.open_event_form();
        app.submit_event_form();
        assert!(!app.form_state.as_ref().unwrap().saving);
        assert!(app.status_message.as_ref().is_some_and(|m| m.is_error));
    }

    #[tokio::test]
    async fn month_navigation_refetches_and_ignores_stale_results() {
        let mut app = logged_in_app().await;
        app.next_month();
        app.prev_month();
        assert!(app.calendar.is_loading());
        settle(&mut app).await; // stale, discarded
        assert!(app.calendar.is_loading());
        settle(&mut app).await;
        assert!(!app.calendar.is_loading());
        assert_eq!(app.calendar.visible_month(), crate::calendar::Month::of(app.today));
    }

    #[tokio::test]
    async fn stale_delete_reports_and_refreshes() {
        let mut app = logged_in_app().await;
        let mut ghost = ScheduleEvent::draft(
            Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        );
        ghost.id = Some("ghost".into());
        app.spawn_delete(ghost);
        settle(&mut app).await;
        assert_eq!(
            app.status_message,
            Some(StatusMessage::error("Schedule no longer exists"))
        );
        assert!(app.calendar.is_loading());
    }

    #[tokio::test]
    async fn log_out_returns_to_login() {
        let mut app = logged_in_app().await;
        app.log_out();
        assert_eq!(app.input_mode(), InputMode::Login);
        settle(&mut app).await;
        assert!(app.repository.service().current_session().is_none());
    }
}
