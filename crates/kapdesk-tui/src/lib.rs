// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use kapdesk_app::locale::{self, Direction as TextDirection};
use kapdesk_app::ticket::{VIEW_NOTES_ACTION, notes_query};
use kapdesk_app::{
    AppCommand, AppEvent, AppState, CellValue, Company, CrudController, CrudEvent, CrudOptions,
    DEFAULT_PAGE_SIZE, DispatchError, Dispatcher, FieldKind, FormInput, FormView, NO_DATA_LABEL,
    Pager, Phase, ProfileUpdate, RenderMode, Resource, ResourceCache, Route, RowAction, Screen,
    Sector, Session, SessionUser, TOAST_DURATION, TableInput, TableView, Ticket, TicketId,
    TicketNote, Toast, ToastKind, User, ViewRow, decode_login, list_scope, login_request,
    logout_request, routes_for,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const PROGRESS_WIDTH: usize = 10;
const AVATAR_GLYPH: &str = "◉";
const AVATAR_PLACEHOLDER: &str = "○";
const LOADING_LABEL: &str = "Loading...";

/// What the console needs from the outside world. Auth calls default to the
/// dispatcher; implementors only have to say where the session lives.
pub trait ConsoleRuntime {
    fn dispatcher(&self) -> &dyn Dispatcher;

    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    fn login(&mut self, username: &str, password: &str) -> Result<SessionUser, DispatchError> {
        let envelope = self
            .dispatcher()
            .dispatch(&login_request(username, password))?;
        decode_login(&envelope)
    }

    fn update_profile(&mut self, update: &ProfileUpdate) -> Result<(), DispatchError> {
        self.dispatcher().dispatch(&update.request()).map(|_| ())
    }

    fn logout(&mut self) -> Result<(), DispatchError> {
        self.dispatcher().dispatch(&logout_request()).map(|_| ())
    }

    fn persist_session(&mut self, session: &Session) -> Result<()>;
    fn clear_session(&mut self) -> Result<()>;
}

/// Which controller a toast or a blocking call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Screen,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    DismissToast { layer: Layer, token: u64 },
}

/// Blocking work queued by a key press. The loop draws one frame with the
/// loading indicator before running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Mount,
    Refresh(Layer),
    Submit(Layer),
    Confirm(Layer),
    OpenNotes(TicketId),
    Login,
    CompleteProfile,
    Logout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LoginUiState {
    username: String,
    password: String,
    focus: usize,
    error: Option<String>,
}

impl LoginUiState {
    fn field_mut(&mut self) -> &mut String {
        if self.focus == 0 {
            &mut self.username
        } else {
            &mut self.password
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProfileUiState {
    update: ProfileUpdate,
    focus: usize,
    error: Option<String>,
}

impl ProfileUiState {
    const FIELDS: [&'static str; 3] = ["Full Name", "Email", "New Password"];

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.update.full_name,
            1 => &mut self.update.email,
            _ => &mut self.update.new_password,
        }
    }
}

struct NotesOverlay {
    ticket: TicketId,
    screen: Box<dyn Screen>,
}

#[derive(Default)]
struct ViewData {
    screen: Option<Box<dyn Screen>>,
    notes: Option<NotesOverlay>,
    cache: ResourceCache,
    login: LoginUiState,
    profile: ProfileUiState,
    search: Option<String>,
    help_visible: bool,
    status_token: u64,
    page_size: usize,
    pending: Option<Pending>,
}

pub fn run_app<R: ConsoleRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        page_size: runtime.page_size(),
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();
    locale::set(state.locale);
    enter_route(state, &mut view_data, state.route);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        if let Some(pending) = view_data.pending.take() {
            run_pending(state, runtime, &mut view_data, &internal_tx, pending);
            continue;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

pub fn route_resource(route: Route) -> Option<Resource> {
    match route {
        Route::Login | Route::CompleteProfile => None,
        Route::Sectors => Some(Resource::Sectors),
        Route::Companies => Some(Resource::Companies),
        Route::SectorUsers => Some(Resource::SectorUsers),
        Route::CompanyUsers => Some(Resource::CompanyUsers),
        Route::Tickets => Some(Resource::Tickets),
    }
}

/// Builds the controller behind a table route, scoped to the session.
pub fn screen_for(route: Route, session: &Session, page_size: usize) -> Option<Box<dyn Screen>> {
    let resource = route_resource(route)?;
    let options = CrudOptions {
        page_size,
        list_query: list_scope(resource, session),
        ..CrudOptions::default()
    };
    let screen: Box<dyn Screen> = match resource {
        Resource::Sectors => Box::new(CrudController::<Sector>::new(resource, options)),
        Resource::Companies => Box::new(CrudController::<Company>::new(resource, options)),
        Resource::SectorUsers | Resource::CompanyUsers => {
            Box::new(CrudController::<User>::new(resource, options))
        }
        Resource::Tickets => Box::new(CrudController::<Ticket>::new(resource, options)),
        Resource::TicketNotes => Box::new(CrudController::<TicketNote>::new(resource, options)),
    };
    Some(screen)
}

fn notes_screen(ticket: TicketId, page_size: usize) -> Box<dyn Screen> {
    let options = CrudOptions {
        page_size,
        list_query: notes_query(ticket),
        ..CrudOptions::default()
    };
    Box::new(CrudController::<TicketNote>::new(
        Resource::TicketNotes,
        options,
    ))
}

fn page_size(view_data: &ViewData) -> usize {
    if view_data.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        view_data.page_size
    }
}

fn enter_route(state: &AppState, view_data: &mut ViewData, route: Route) {
    view_data.notes = None;
    view_data.search = None;
    view_data.screen = None;
    match route {
        Route::Login => {
            view_data.cache.clear();
            view_data.login = LoginUiState::default();
        }
        Route::CompleteProfile => {
            let full_name = state
                .session
                .as_ref()
                .map(|session| session.user.full_name.clone())
                .unwrap_or_default();
            view_data.profile = ProfileUiState {
                update: ProfileUpdate {
                    full_name,
                    ..ProfileUpdate::default()
                },
                ..ProfileUiState::default()
            };
        }
        _ => {
            if let Some(session) = &state.session {
                view_data.screen = screen_for(route, session, page_size(view_data));
                view_data.pending = Some(Pending::Mount);
            }
        }
    }
}

fn layer_parts(
    view_data: &mut ViewData,
    layer: Layer,
) -> Option<(&mut Box<dyn Screen>, &mut ResourceCache)> {
    let ViewData {
        screen,
        notes,
        cache,
        ..
    } = view_data;
    let screen = match layer {
        Layer::Screen => screen.as_mut()?,
        Layer::Notes => &mut notes.as_mut()?.screen,
    };
    Some((screen, cache))
}

fn layer_screen(view_data: &ViewData, layer: Layer) -> Option<&dyn Screen> {
    match layer {
        Layer::Screen => view_data.screen.as_deref(),
        Layer::Notes => view_data.notes.as_ref().map(|notes| &*notes.screen),
    }
}

fn active_layer(view_data: &ViewData) -> Layer {
    if view_data.notes.is_some() {
        Layer::Notes
    } else {
        Layer::Screen
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::DismissToast { layer, token } => {
                if let Some((screen, _)) = layer_parts(view_data, layer) {
                    screen.dismiss_toast(token);
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn schedule_toast_dismiss(internal_tx: &Sender<InternalEvent>, layer: Layer, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(TOAST_DURATION);
        let _ = sender.send(InternalEvent::DismissToast { layer, token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    let events = state.dispatch(AppCommand::SetStatus(message.into()));
    apply_app_events(state, view_data, internal_tx, events);
}

fn apply_app_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    for event in events {
        match event {
            AppEvent::RouteChanged(route) => enter_route(state, view_data, route),
            AppEvent::SignedIn => {
                if let Some(session) = &state.session {
                    info!(
                        user = %session.user.username,
                        role = session.role().as_str(),
                        "signed in"
                    );
                }
            }
            AppEvent::SignedOut => info!("signed out"),
            AppEvent::LocaleChanged(next, _) => locale::set(next),
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::StatusCleared => {}
        }
    }
}

fn apply_crud_events(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    layer: Layer,
    events: Vec<CrudEvent>,
) {
    for event in events {
        match event {
            CrudEvent::ToastShown { token, .. } => {
                schedule_toast_dismiss(internal_tx, layer, token);
            }
            CrudEvent::Delegated { action, id } if action == VIEW_NOTES_ACTION.key => {
                match id.parse::<i64>() {
                    Ok(id) => view_data.pending = Some(Pending::OpenNotes(TicketId::new(id))),
                    Err(error) => warn!(%id, %error, "notes requested for a malformed ticket id"),
                }
            }
            _ => {}
        }
    }
}

fn run_pending<R: ConsoleRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    pending: Pending,
) {
    let (layer, events) = match pending {
        Pending::Login => return sign_in(state, runtime, view_data, internal_tx),
        Pending::CompleteProfile => {
            return complete_profile(state, runtime, view_data, internal_tx);
        }
        Pending::Logout => return sign_out(state, runtime, view_data, internal_tx),
        Pending::OpenNotes(ticket) => {
            let mut screen = notes_screen(ticket, page_size(view_data));
            let events = screen.mount(runtime.dispatcher(), &mut view_data.cache);
            view_data.notes = Some(NotesOverlay { ticket, screen });
            (Layer::Notes, events)
        }
        Pending::Mount => {
            let Some((screen, cache)) = layer_parts(view_data, Layer::Screen) else {
                return;
            };
            (Layer::Screen, screen.mount(runtime.dispatcher(), cache))
        }
        Pending::Refresh(layer) | Pending::Submit(layer) | Pending::Confirm(layer) => {
            let Some((screen, cache)) = layer_parts(view_data, layer) else {
                return;
            };
            let events = match pending {
                Pending::Refresh(_) => screen.refresh(runtime.dispatcher(), cache),
                Pending::Submit(_) => screen.submit(runtime.dispatcher(), cache),
                _ => screen.confirm(runtime.dispatcher(), cache),
            };
            (layer, events)
        }
    };
    apply_crud_events(view_data, internal_tx, layer, events);
}

fn sign_in<R: ConsoleRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let username = view_data.login.username.trim().to_owned();
    let password = view_data.login.password.clone();
    match runtime.login(&username, &password) {
        Ok(user) => {
            let session = Session::new(user);
            if let Err(error) = runtime.persist_session(&session) {
                warn!(error = %format!("{error:#}"), "session not persisted");
            }
            let events = state.dispatch(AppCommand::SignIn(session));
            apply_app_events(state, view_data, internal_tx, events);
        }
        Err(error) => {
            warn!(%username, %error, "login failed");
            view_data.login.password.clear();
            view_data.login.error = Some(error.user_message());
        }
    }
}

fn complete_profile<R: ConsoleRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let update = view_data.profile.update.clone();
    if let Err(error) = runtime.update_profile(&update) {
        view_data.profile.error = Some(error.user_message());
        return;
    }
    if let Some(session) = state.session.as_mut() {
        session.user.full_name = update.full_name.trim().to_owned();
    }
    let events = state.dispatch(AppCommand::ProfileCompleted);
    if let Some(session) = &state.session {
        if let Err(error) = runtime.persist_session(session) {
            warn!(error = %format!("{error:#}"), "session not persisted");
        }
    }
    apply_app_events(state, view_data, internal_tx, events);
}

fn sign_out<R: ConsoleRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Err(error) = runtime.logout() {
        warn!(%error, "logout request failed; clearing local session anyway");
    }
    if let Err(error) = runtime.clear_session() {
        warn!(error = %format!("{error:#}"), "stored session not removed");
    }
    let events = state.dispatch(AppCommand::SignOut);
    apply_app_events(state, view_data, internal_tx, events);
}

fn handle_key_event(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    if key.code == KeyCode::F(2) {
        let events = state.dispatch(AppCommand::ToggleLocale);
        apply_app_events(state, view_data, internal_tx, events);
        return false;
    }
    match state.route {
        Route::Login => handle_login_key(view_data, key),
        Route::CompleteProfile => {
            handle_profile_key(view_data, key);
            false
        }
        _ => handle_screen_key(state, view_data, internal_tx, key),
    }
}

fn handle_login_key(view_data: &mut ViewData, key: KeyEvent) -> bool {
    let login = &mut view_data.login;
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
            login.focus = 1 - login.focus.min(1);
        }
        KeyCode::Backspace => {
            login.field_mut().pop();
        }
        KeyCode::Enter => {
            if login.username.trim().is_empty() {
                login.error = Some("Username is required".to_owned());
            } else if login.password.is_empty() {
                login.error = Some("Password is required".to_owned());
            } else {
                login.error = None;
                view_data.pending = Some(Pending::Login);
            }
        }
        KeyCode::Char(ch) => login.field_mut().push(ch),
        _ => {}
    }
    false
}

fn handle_profile_key(view_data: &mut ViewData, key: KeyEvent) {
    let profile = &mut view_data.profile;
    let count = ProfileUiState::FIELDS.len();
    match key.code {
        KeyCode::Esc => view_data.pending = Some(Pending::Logout),
        KeyCode::Tab | KeyCode::Down => profile.focus = (profile.focus + 1) % count,
        KeyCode::BackTab | KeyCode::Up => profile.focus = (profile.focus + count - 1) % count,
        KeyCode::Backspace => {
            profile.field_mut().pop();
        }
        KeyCode::Enter => match profile.update.validate() {
            Ok(()) => {
                profile.error = None;
                view_data.pending = Some(Pending::CompleteProfile);
            }
            Err(error) => profile.error = Some(error.to_string()),
        },
        KeyCode::Char(ch) => profile.field_mut().push(ch),
        _ => {}
    }
}

fn handle_screen_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }
    let layer = active_layer(view_data);
    let Some(phase) = layer_screen(view_data, layer).map(|screen| screen.phase()) else {
        return key.code == KeyCode::Char('q');
    };
    match phase {
        Phase::ModalOpen(_) => {
            handle_form_key(view_data, internal_tx, layer, key);
            return false;
        }
        Phase::ConfirmPending => {
            handle_confirm_key(view_data, internal_tx, layer, key);
            return false;
        }
        Phase::Loading => return false,
        Phase::Loaded => {}
    }
    if view_data.search.is_some() {
        handle_search_key(view_data, layer, key);
        return false;
    }
    if let Some(input) = table_input_for_key(key) {
        if let Some((screen, _)) = layer_parts(view_data, layer) {
            screen.table_input(input);
        }
        return false;
    }

    match key.code {
        KeyCode::Esc if layer == Layer::Notes => view_data.notes = None,
        KeyCode::Char('q') if layer == Layer::Screen => return true,
        KeyCode::Tab if layer == Layer::Screen => {
            let events = state.dispatch(AppCommand::NextScreen);
            apply_app_events(state, view_data, internal_tx, events);
        }
        KeyCode::BackTab if layer == Layer::Screen => {
            let events = state.dispatch(AppCommand::PrevScreen);
            apply_app_events(state, view_data, internal_tx, events);
        }
        KeyCode::Char('O') => view_data.pending = Some(Pending::Logout),
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('r') => view_data.pending = Some(Pending::Refresh(layer)),
        KeyCode::Char('/') => {
            let query = layer_screen(view_data, layer)
                .map(|screen| screen.query().to_owned())
                .unwrap_or_default();
            view_data.search = Some(query);
        }
        KeyCode::Char('x') => {
            if let Some((screen, _)) = layer_parts(view_data, layer) {
                screen.close_toast();
            }
        }
        KeyCode::Char('c') | KeyCode::Char('+') => {
            let Some((screen, _)) = layer_parts(view_data, layer) else {
                return false;
            };
            if screen.can_create() {
                let events = screen.open_create();
                apply_crud_events(view_data, internal_tx, layer, events);
            } else {
                let label = screen.resource().label();
                emit_status(state, view_data, internal_tx, format!("{label} cannot be added here"));
            }
        }
        KeyCode::Char('D') => {
            let Some((screen, _)) = layer_parts(view_data, layer) else {
                return false;
            };
            let Some(action) = screen.view().bulk_actions.first().copied() else {
                return false;
            };
            let events = screen.request_bulk(action.key);
            apply_crud_events(view_data, internal_tx, layer, events);
        }
        KeyCode::Char(ch) => {
            let Some((screen, cache)) = layer_parts(view_data, layer) else {
                return false;
            };
            let Some(action) = row_action_for_hotkey(&screen.view().row_actions, ch) else {
                return false;
            };
            let events = screen.invoke_focused(cache, action.key);
            apply_crud_events(view_data, internal_tx, layer, events);
        }
        _ => {}
    }
    false
}

fn handle_form_key(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    layer: Layer,
    key: KeyEvent,
) {
    if key.code == KeyCode::Enter {
        view_data.pending = Some(Pending::Submit(layer));
        return;
    }
    let Some((screen, _)) = layer_parts(view_data, layer) else {
        return;
    };
    let input = match key.code {
        KeyCode::Esc => {
            let events = screen.cancel_modal();
            apply_crud_events(view_data, internal_tx, layer, events);
            return;
        }
        KeyCode::Tab | KeyCode::Down => FormInput::NextField,
        KeyCode::BackTab | KeyCode::Up => FormInput::PrevField,
        KeyCode::Left => FormInput::CycleOption(-1),
        KeyCode::Right => FormInput::CycleOption(1),
        KeyCode::Backspace => FormInput::Backspace,
        KeyCode::Char(ch) => FormInput::Char(ch),
        _ => return,
    };
    screen.form_input(input);
}

fn handle_confirm_key(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    layer: Layer,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('y') => {
            view_data.pending = Some(Pending::Confirm(layer));
        }
        KeyCode::Esc | KeyCode::Char('n') => {
            let Some((screen, _)) = layer_parts(view_data, layer) else {
                return;
            };
            let events = screen.cancel_confirm();
            apply_crud_events(view_data, internal_tx, layer, events);
        }
        _ => {}
    }
}

fn handle_search_key(view_data: &mut ViewData, layer: Layer, key: KeyEvent) {
    let Some(mut query) = view_data.search.take() else {
        return;
    };
    let editing = match key.code {
        KeyCode::Enter => false,
        KeyCode::Esc => {
            query.clear();
            false
        }
        KeyCode::Backspace => {
            query.pop();
            true
        }
        KeyCode::Char(ch) => {
            query.push(ch);
            true
        }
        _ => true,
    };
    if let Some((screen, _)) = layer_parts(view_data, layer) {
        screen.set_query(&query);
    }
    if editing {
        view_data.search = Some(query);
    }
}

fn table_input_for_key(key: KeyEvent) -> Option<TableInput> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(TableInput::CursorUp),
        KeyCode::Down | KeyCode::Char('j') => Some(TableInput::CursorDown),
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => Some(TableInput::NextPage),
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => Some(TableInput::PrevPage),
        KeyCode::Char(' ') => Some(TableInput::ToggleRow),
        KeyCode::Char('a') => Some(TableInput::ToggleAll),
        _ => None,
    }
}

fn action_hotkey(action: &str) -> Option<char> {
    match action {
        "edit" => Some('e'),
        "delete" => Some('d'),
        "assign" => Some('g'),
        "progress" => Some('u'),
        "transfer" => Some('t'),
        "note" => Some('o'),
        "view-notes" => Some('v'),
        _ => None,
    }
}

fn row_action_for_hotkey(actions: &[RowAction], ch: char) -> Option<RowAction> {
    actions
        .iter()
        .copied()
        .find(|action| action_hotkey(action.key) == Some(ch))
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());
    let direction = state.locale.direction();
    let loading = view_data.pending.is_some();

    render_header(frame, layout[0], state);

    match state.route {
        Route::Login => render_login(frame, layout[1], &view_data.login, direction, loading),
        Route::CompleteProfile => {
            render_profile(frame, layout[1], &view_data.profile, direction, loading);
        }
        _ => match view_data.screen.as_deref() {
            Some(screen) => render_screen(frame, layout[1], screen, direction, loading),
            None => frame.render_widget(
                Block::default()
                    .borders(Borders::ALL)
                    .title(locale::t(state.route.label())),
                layout[1],
            ),
        },
    }

    let status = Paragraph::new(status_text(state, view_data))
        .alignment(alignment_for(direction))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(notes) = &view_data.notes {
        let area = centered_rect(84, 70, frame.area());
        frame.render_widget(Clear, area);
        render_screen(frame, area, &*notes.screen, direction, loading);
    }

    if let Some(screen) = layer_screen(view_data, active_layer(view_data)) {
        if let Some(form) = screen.form_view() {
            let area = centered_rect(60, 60, frame.area());
            frame.render_widget(Clear, area);
            let modal = Paragraph::new(form_text(&form).join("\n"))
                .alignment(alignment_for(direction))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title(locale::t(form.title))
                        .borders(Borders::ALL)
                        .style(Style::default().fg(Color::Cyan)),
                );
            frame.render_widget(modal, area);
        }
        if let Some((title, message)) = screen.confirm_view() {
            let area = centered_rect(50, 25, frame.area());
            frame.render_widget(Clear, area);
            let dialog = Paragraph::new(format!(
                "{message}\n\n[y] {}    [n] {}",
                locale::t("Confirm"),
                locale::t("Cancel")
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(locale::t(title))
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
            frame.render_widget(dialog, area);
        }
        if let Some(toast) = screen.ui().toast.current() {
            render_toast(frame, toast, direction);
        }
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_header(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState) {
    let title = format!("kapdesk [{}]", state.locale.code());
    let routes = match &state.session {
        Some(session) if !session.user.first_login => routes_for(session.role()),
        _ => Vec::new(),
    };
    if routes.is_empty() {
        let header = Paragraph::new(locale::t(state.route.label()))
            .alignment(alignment_for(state.locale.direction()))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(header, area);
        return;
    }

    let selected = routes
        .iter()
        .position(|route| *route == state.route)
        .unwrap_or(0);
    let mut titles = routes
        .iter()
        .map(|route| locale::t(route.label()))
        .collect::<Vec<_>>();
    let selected = if state.locale.direction() == TextDirection::Rtl {
        titles.reverse();
        titles.len() - 1 - selected
    } else {
        selected
    };
    let user = state
        .session
        .as_ref()
        .map(|session| format!("{title} {}", session.user.username))
        .unwrap_or(title);
    let tabs = Tabs::new(titles)
        .block(Block::default().title(user).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, area);
}

fn render_login(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    login: &LoginUiState,
    direction: TextDirection,
    loading: bool,
) {
    let lines = [
        credential_line("Username", &login.username, false, login.focus == 0),
        credential_line("Password", &login.password, true, login.focus == 1),
    ];
    render_credentials(frame, area, "Login", &lines, login.error.as_deref(), direction, loading);
}

fn render_profile(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    profile: &ProfileUiState,
    direction: TextDirection,
    loading: bool,
) {
    let values = [
        &profile.update.full_name,
        &profile.update.email,
        &profile.update.new_password,
    ];
    let lines = ProfileUiState::FIELDS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(index, (label, value))| {
            credential_line(label, value, index == 2, index == profile.focus)
        })
        .collect::<Vec<_>>();
    render_credentials(
        frame,
        area,
        "Complete Profile",
        &lines,
        profile.error.as_deref(),
        direction,
        loading,
    );
}

fn render_credentials(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    lines: &[String],
    error: Option<&str>,
    direction: TextDirection,
    loading: bool,
) {
    let mut text = lines.to_vec();
    if let Some(error) = error {
        text.push(String::new());
        text.push(format!("! {}", locale::t(error)));
    }
    if loading {
        text.push(String::new());
        text.push(locale::t(LOADING_LABEL));
    }
    let area = centered_rect(60, 50, area);
    let form = Paragraph::new(text.join("\n"))
        .alignment(alignment_for(direction))
        .block(
            Block::default()
                .title(locale::t(title))
                .borders(Borders::ALL),
        );
    frame.render_widget(form, area);
}

fn credential_line(label: &str, value: &str, masked: bool, focused: bool) -> String {
    let shown = if masked {
        "*".repeat(value.chars().count())
    } else {
        value.to_owned()
    };
    let cursor = if focused { "_" } else { "" };
    let marker = if focused { ">" } else { " " };
    format!("{marker} {}: {shown}{cursor}", locale::t(label))
}

fn render_screen(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    screen: &dyn Screen,
    direction: TextDirection,
    loading: bool,
) {
    let view = screen.view();
    let loading = loading || screen.ui().is_loading;
    let block = Block::default()
        .title(table_title(&view, screen.can_create(), loading))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut widths = vec![Constraint::Length(3)];
    widths.extend(view.columns.iter().map(|column| match column.render {
        RenderMode::Progress => Constraint::Length(PROGRESS_WIDTH as u16 + 6),
        RenderMode::Image | RenderMode::ActionIcon => Constraint::Length(6),
        RenderMode::Plain => Constraint::Min(8),
    }));
    widths.push(Constraint::Length(
        row_actions_text(&view.row_actions).chars().count().max(7) as u16,
    ));

    let all_selected = view.selected_count > 0
        && view
            .rows
            .iter()
            .all(|row| matches!(row, ViewRow::Data { selected: true, .. }));
    let mut header = vec![Cell::from(if all_selected { "[x]" } else { "[ ]" })];
    header.extend(view.columns.iter().map(|column| Cell::from(locale::t(column.label))));
    header.push(Cell::from(locale::t("Actions")));
    let header = Row::new(ordered(header, direction)).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let actions = row_actions_text(&view.row_actions);
    let no_data = view.rows.iter().any(|row| matches!(row, ViewRow::NoData));
    let rows = view.rows.iter().filter_map(|row| match row {
        ViewRow::NoData => None,
        ViewRow::Data {
            selected,
            focused,
            cells,
            ..
        } => {
            let mut line = vec![Cell::from(if *selected { "[x]" } else { "[ ]" })];
            line.extend(
                view.columns
                    .iter()
                    .zip(cells)
                    .map(|(column, cell)| Cell::from(cell_text(column.render, cell))),
            );
            line.push(Cell::from(actions.clone()));
            let style = if *focused {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else if *selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Some(Row::new(ordered(line, direction)).style(style))
        }
    });

    let widths = ordered(widths, direction);
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    frame.render_widget(table, parts[0]);

    // The placeholder spans the grid, one line under the header.
    if no_data && parts[0].height > 1 {
        let line = Rect {
            y: parts[0].y + 1,
            height: 1,
            ..parts[0]
        };
        let placeholder = Paragraph::new(locale::t(NO_DATA_LABEL))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, line);
    }

    if let Some(pager) = view.pager {
        let footer = Paragraph::new(pager_text(pager)).alignment(Alignment::Center);
        frame.render_widget(footer, parts[1]);
    }
}

fn render_toast(frame: &mut ratatui::Frame<'_>, toast: &Toast, direction: TextDirection) {
    let area = frame.area();
    let text = format!("{} {}", toast.kind.icon(), locale::t(&toast.message));
    let width = (text.chars().count() as u16 + 4).min(area.width);
    let x = match direction {
        TextDirection::Ltr => area.right().saturating_sub(width),
        TextDirection::Rtl => area.x,
    };
    let rect = Rect {
        x,
        y: area.y + 1,
        width,
        height: 3.min(area.height),
    };
    let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Info => Color::Blue,
        ToastKind::Warning => Color::Yellow,
    };
    frame.render_widget(Clear, rect);
    let widget = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(color)),
    );
    frame.render_widget(widget, rect);
}

fn table_title(view: &TableView, can_create: bool, loading: bool) -> String {
    let mut parts = vec![locale::t(&view.heading)];
    if can_create {
        parts.push(format!("[+ {}]", locale::t("Add")));
    }
    for action in &view.bulk_actions {
        let mut label = format!("[{} {}", action.icon, locale::t(action.label));
        if view.selected_count > 0 {
            label.push_str(&format!(" ({})", view.selected_count));
        }
        label.push(']');
        parts.push(label);
    }
    if loading {
        parts.push(locale::t(LOADING_LABEL));
    }
    parts.join("  ")
}

fn pager_text(pager: Pager) -> String {
    format!(
        "‹ {} {} {} {} ›",
        locale::t("Page"),
        pager.page,
        locale::t("of"),
        pager.total_pages
    )
}

fn row_actions_text(actions: &[RowAction]) -> String {
    actions
        .iter()
        .map(|action| match action_hotkey(action.key) {
            Some(key) => format!("{key}:{}", action.icon),
            None => action.icon.to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell_text(render: RenderMode, cell: &CellValue) -> String {
    match (render, cell) {
        (RenderMode::Image, CellValue::Image(Some(_))) => AVATAR_GLYPH.to_owned(),
        (RenderMode::Image, _) => AVATAR_PLACEHOLDER.to_owned(),
        (RenderMode::Progress, CellValue::Progress(percentage)) => progress_bar(*percentage),
        (_, CellValue::Label(label)) => locale::t(label),
        (_, cell) => cell.display(),
    }
}

fn progress_bar(percentage: u8) -> String {
    let percentage = percentage.min(100);
    let filled = usize::from(percentage) * PROGRESS_WIDTH / 100;
    format!(
        "{}{} {percentage:>3}%",
        "█".repeat(filled),
        "░".repeat(PROGRESS_WIDTH - filled)
    )
}

/// Tooltip of the first icon cell in the focused row.
fn focused_tooltip(view: &TableView) -> Option<String> {
    view.rows.iter().find_map(|row| match row {
        ViewRow::Data {
            focused: true,
            cells,
            ..
        } => view
            .columns
            .iter()
            .zip(cells)
            .find_map(|(column, cell)| match (column.render, cell) {
                (RenderMode::ActionIcon, CellValue::Icon { tooltip, .. }) => {
                    Some(locale::t(tooltip))
                }
                _ => None,
            }),
        _ => None,
    })
}

fn form_text(form: &FormView<'_>) -> Vec<String> {
    let mut lines = form
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let raw = form.draft.get(field.key);
            let value = match field.kind {
                FieldKind::Password => "*".repeat(raw.chars().count()),
                FieldKind::Select(options) => {
                    let label = options
                        .iter()
                        .find(|(value, _)| *value == raw)
                        .map(|(_, label)| locale::t(label))
                        .unwrap_or_else(|| raw.to_owned());
                    format!("‹ {label} ›")
                }
                _ => raw.to_owned(),
            };
            let focused = index == form.focus;
            format!(
                "{} {}{}: {value}{}",
                if focused { ">" } else { " " },
                locale::t(field.label),
                if field.required { "*" } else { "" },
                if focused && !matches!(field.kind, FieldKind::Select(_)) {
                    "_"
                } else {
                    ""
                },
            )
        })
        .collect::<Vec<_>>();
    if let Some(error) = form.error {
        lines.push(String::new());
        lines.push(format!("! {}", locale::t(error)));
    }
    lines.push(String::new());
    lines.push(format!(
        "[enter] {}  [esc] {}",
        locale::t("Save"),
        locale::t("Cancel")
    ));
    lines
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(query) = &view_data.search {
        return format!("{}: /{query}_", locale::t("Search"));
    }
    if let Some(status) = &state.status_line {
        return locale::t(status);
    }
    let tooltip = layer_screen(view_data, active_layer(view_data))
        .and_then(|screen| focused_tooltip(&screen.view()));
    if let Some(tooltip) = tooltip {
        return tooltip;
    }
    match state.route {
        Route::Login => "tab field · enter sign in · F2 language · esc quit".to_owned(),
        Route::CompleteProfile => "tab field · enter save · esc sign out".to_owned(),
        _ if view_data.notes.is_some() => "esc close notes · d delete · ? help".to_owned(),
        _ => "? help · tab screen · / search · F2 language · q quit".to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "j/k move · n/p page · space select · a select all\n\
     c add · e edit · d delete · D delete selected\n\
     g assign · u progress · t transfer · o note · v notes\n\
     / search · r refresh · x close toast · tab/shift-tab screen\n\
     F2 language · O sign out · q quit"
}

fn alignment_for(direction: TextDirection) -> Alignment {
    match direction {
        TextDirection::Ltr => Alignment::Left,
        TextDirection::Rtl => Alignment::Right,
    }
}

/// Right-to-left layouts mirror the column order.
fn ordered<T>(mut items: Vec<T>, direction: TextDirection) -> Vec<T> {
    if direction == TextDirection::Rtl {
        items.reverse();
    }
    items
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        ConsoleRuntime, InternalEvent, Layer, Pending, ViewData, alignment_for, cell_text,
        enter_route, handle_key_event, layer_screen, ordered, pager_text, process_internal_events,
        progress_bar, render, row_action_for_hotkey, run_pending, status_text, table_title,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use kapdesk_app::locale::{Direction as TextDirection, Locale};
    use kapdesk_app::{
        AppState, CellValue, Dispatcher, Method, Pager, Phase, RenderMode, Role, Route, Session,
        ToastKind,
    };
    use kapdesk_testkit::{KapFaker, ScriptedDispatcher, ok_envelope, server_error};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Alignment;
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver, Sender};

    #[derive(Default)]
    struct TestRuntime {
        dispatcher: ScriptedDispatcher,
        persisted: Option<Session>,
        cleared: bool,
    }

    impl ConsoleRuntime for TestRuntime {
        fn dispatcher(&self) -> &dyn Dispatcher {
            &self.dispatcher
        }

        fn persist_session(&mut self, session: &Session) -> anyhow::Result<()> {
            self.persisted = Some(session.clone());
            Ok(())
        }

        fn clear_session(&mut self) -> anyhow::Result<()> {
            self.persisted = None;
            self.cleared = true;
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn signed_out() -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                state: AppState::default(),
                runtime: TestRuntime::default(),
                view_data: ViewData::default(),
                tx,
                rx,
            }
        }

        fn signed_in(role: Role, seed: impl FnOnce(&ScriptedDispatcher)) -> Self {
            let mut harness = Self::signed_out();
            seed(&harness.runtime.dispatcher);
            let user = KapFaker::new(5).session_user(role);
            harness.state = AppState::with_session(Some(Session::new(user)), Locale::En);
            let route = harness.state.route;
            enter_route(&harness.state, &mut harness.view_data, route);
            harness.settle();
            harness
        }

        fn key(&mut self, code: KeyCode) -> bool {
            self.key_with(code, KeyModifiers::NONE)
        }

        fn key_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            )
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.key(KeyCode::Char(ch));
            }
        }

        /// Runs queued blocking work until the queue is empty.
        fn settle(&mut self) {
            while let Some(pending) = self.view_data.pending.take() {
                run_pending(
                    &mut self.state,
                    &mut self.runtime,
                    &mut self.view_data,
                    &self.tx,
                    pending,
                );
            }
        }

        fn screen_phase(&self) -> Option<Phase> {
            self.view_data.screen.as_ref().map(|screen| screen.phase())
        }

        fn toast_token(&self) -> Option<u64> {
            layer_screen(&self.view_data, Layer::Screen)
                .and_then(|screen| screen.ui().toast.current())
                .map(|toast| toast.token)
        }

        fn toast(&self, layer: Layer) -> Option<(ToastKind, String)> {
            layer_screen(&self.view_data, layer)
                .and_then(|screen| screen.ui().toast.current())
                .map(|toast| (toast.kind, toast.message.clone()))
        }
    }

    #[test]
    fn login_signs_in_persists_and_mounts_landing_screen() {
        let mut harness = Harness::signed_out();
        let mut faker = KapFaker::new(3);
        let sectors = faker.sectors(7);
        harness.runtime.dispatcher.respond(
            Method::Post,
            "/auth/login",
            Ok(ok_envelope(json!({
                "user": {"id": 1, "username": "root", "full_name": "Root", "role": "kap_admin"}
            }))),
        );
        harness.runtime.dispatcher.list("sector", &sectors);

        harness.type_text("root");
        harness.key(KeyCode::Tab);
        harness.type_text("password1");
        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.pending, Some(Pending::Login));
        harness.settle();

        assert_eq!(harness.state.route, Route::Sectors);
        assert_eq!(
            harness.runtime.persisted.as_ref().map(|s| s.user.username.as_str()),
            Some("root")
        );
        let view = harness.view_data.screen.as_ref().expect("screen").view();
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.pager.map(|pager| pager.total_pages), Some(2));
    }

    #[test]
    fn login_failure_shows_server_message_inline() {
        let mut harness = Harness::signed_out();
        harness.runtime.dispatcher.fail(
            Method::Post,
            "/auth/login",
            server_error(401, "Invalid credentials"),
        );

        harness.type_text("root");
        harness.key(KeyCode::Tab);
        harness.type_text("nope-nope");
        harness.key(KeyCode::Enter);
        harness.settle();

        assert_eq!(harness.state.route, Route::Login);
        assert_eq!(
            harness.view_data.login.error.as_deref(),
            Some("Invalid credentials")
        );
        assert!(harness.view_data.login.password.is_empty());
    }

    #[test]
    fn blank_login_never_reaches_the_server() {
        let mut harness = Harness::signed_out();
        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.pending, None);
        assert_eq!(
            harness.view_data.login.error.as_deref(),
            Some("Username is required")
        );
        assert!(harness.runtime.dispatcher.requests().is_empty());
    }

    #[test]
    fn first_login_completes_profile_before_landing() {
        let mut harness = Harness::signed_out();
        harness.runtime.dispatcher.respond(
            Method::Post,
            "/auth/login",
            Ok(ok_envelope(json!({
                "user": {"id": 4, "username": "lina", "role": "company_manager",
                         "company_id": 3, "first_login": true}
            }))),
        );
        harness.type_text("lina");
        harness.key(KeyCode::Tab);
        harness.type_text("temporary");
        harness.key(KeyCode::Enter);
        harness.settle();
        assert_eq!(harness.state.route, Route::CompleteProfile);

        harness.type_text("Lina Haddad");
        harness.key(KeyCode::Tab);
        harness.type_text("lina@kap.gov");
        harness.key(KeyCode::Tab);
        harness.type_text("short");
        harness.key(KeyCode::Enter);
        assert_eq!(harness.view_data.pending, None);
        assert!(
            harness
                .view_data
                .profile
                .error
                .as_deref()
                .is_some_and(|error| error.contains("at least 8"))
        );

        harness.type_text("-enough");
        harness.key(KeyCode::Enter);
        harness.settle();

        assert_eq!(harness.state.route, Route::CompanyUsers);
        assert_eq!(
            harness.runtime.dispatcher.count_path(Method::Put, "/auth/update-admin"),
            1
        );
        let persisted = harness.runtime.persisted.as_ref().expect("persisted session");
        assert!(!persisted.user.first_login);
        assert_eq!(persisted.user.full_name, "Lina Haddad");
    }

    #[test]
    fn create_through_modal_posts_once_and_toasts() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list("sector", &KapFaker::new(9).sectors(2));
        });
        harness.runtime.dispatcher.clear_log();

        harness.key(KeyCode::Char('c'));
        assert!(matches!(harness.screen_phase(), Some(Phase::ModalOpen(_))));
        harness.type_text("Energy");
        harness.key(KeyCode::Tab);
        harness.type_text("EN");
        harness.key(KeyCode::Tab);
        harness.type_text("energy@kap.gov");
        harness.key(KeyCode::Enter);
        harness.settle();

        assert_eq!(harness.runtime.dispatcher.count(Method::Post), 1);
        assert_eq!(
            harness.runtime.dispatcher.count_path(Method::Get, "/protected/sector"),
            1
        );
        assert_eq!(harness.screen_phase(), Some(Phase::Loaded));
        assert_eq!(
            harness.toast(Layer::Screen),
            Some((ToastKind::Success, "Sector created successfully".to_owned()))
        );
    }

    #[test]
    fn escape_cancels_modal_without_requests() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |_| {});
        harness.runtime.dispatcher.clear_log();
        harness.key(KeyCode::Char('c'));
        harness.type_text("Draft");
        harness.key(KeyCode::Esc);
        assert_eq!(harness.screen_phase(), Some(Phase::Loaded));
        assert!(harness.runtime.dispatcher.requests().is_empty());
    }

    #[test]
    fn delete_key_confirms_then_issues_one_delete() {
        let sectors = KapFaker::new(4).sectors(3);
        let first = sectors[0].id;
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list("sector", &sectors);
        });
        harness.runtime.dispatcher.clear_log();

        harness.key(KeyCode::Char('d'));
        assert_eq!(harness.screen_phase(), Some(Phase::ConfirmPending));
        harness.key(KeyCode::Char('y'));
        harness.settle();

        assert_eq!(
            harness
                .runtime
                .dispatcher
                .count_path(Method::Delete, &format!("/protected/sector/{first}")),
            1
        );
        assert_eq!(harness.screen_phase(), Some(Phase::Loaded));
    }

    #[test]
    fn bulk_delete_without_selection_warns() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list("sector", &KapFaker::new(4).sectors(3));
        });
        harness.runtime.dispatcher.clear_log();

        harness.key(KeyCode::Char('D'));
        assert!(harness.runtime.dispatcher.requests().is_empty());
        assert_eq!(
            harness.toast(Layer::Screen).map(|(kind, _)| kind),
            Some(ToastKind::Warning)
        );

        harness.key(KeyCode::Char('a'));
        harness.key(KeyCode::Char('D'));
        harness.key(KeyCode::Enter);
        harness.settle();
        assert_eq!(harness.runtime.dispatcher.count(Method::Delete), 3);
    }

    #[test]
    fn view_notes_opens_overlay_scoped_to_ticket() {
        let mut faker = KapFaker::new(8);
        let tickets = faker.tickets(2);
        let ticket = tickets[0].id;
        let notes = vec![faker.note(ticket), faker.note(ticket)];
        let mut harness = Harness::signed_in(Role::CompanyEmployee, |dispatcher| {
            dispatcher.list("ticket", &tickets);
            dispatcher.list("ticket-note", &notes);
        });
        assert_eq!(harness.state.route, Route::Tickets);

        harness.key(KeyCode::Char('v'));
        assert_eq!(harness.view_data.pending, Some(Pending::OpenNotes(ticket)));
        harness.settle();

        let overlay = harness.view_data.notes.as_ref().expect("notes overlay");
        assert_eq!(overlay.ticket, ticket);
        assert_eq!(overlay.screen.view().rows.len(), 2);
        let request = harness
            .runtime
            .dispatcher
            .requests()
            .into_iter()
            .find(|request| request.path == "/protected/ticket-note")
            .expect("notes fetch");
        assert_eq!(
            request.query,
            vec![("ticket_id".to_owned(), ticket.to_string())]
        );

        harness.key(KeyCode::Esc);
        assert!(harness.view_data.notes.is_none());
    }

    #[test]
    fn tab_rotates_screens_and_remounts() {
        let mut harness = Harness::signed_in(Role::CompanyManager, |_| {});
        assert_eq!(harness.state.route, Route::CompanyUsers);
        harness.key(KeyCode::Tab);
        assert_eq!(harness.state.route, Route::Tickets);
        assert_eq!(harness.view_data.pending, Some(Pending::Mount));
        harness.settle();
        assert_eq!(
            harness
                .view_data
                .screen
                .as_ref()
                .map(|screen| screen.resource()),
            Some(kapdesk_app::Resource::Tickets)
        );
    }

    #[test]
    fn sign_out_clears_session_and_returns_to_login() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |_| {});
        harness.key(KeyCode::Char('O'));
        harness.settle();
        assert!(harness.state.session.is_none());
        assert_eq!(harness.state.route, Route::Login);
        assert!(harness.runtime.cleared);
        assert!(harness.view_data.screen.is_none());
        assert_eq!(
            harness.runtime.dispatcher.count_path(Method::Post, "/auth/logout"),
            1
        );
    }

    #[test]
    fn stale_toast_token_leaves_newer_toast() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list::<kapdesk_app::Sector>("sector", &[]);
        });
        harness.key(KeyCode::Char('D'));
        let stale = harness.toast_token().expect("first toast");
        harness.key(KeyCode::Char('D'));
        let current = harness.toast_token().expect("second toast");
        assert_ne!(stale, current);

        for token in [stale, current] {
            harness
                .tx
                .send(InternalEvent::DismissToast {
                    layer: Layer::Screen,
                    token,
                })
                .expect("send");
            process_internal_events(&mut harness.state, &mut harness.view_data, &harness.rx);
            if token == stale {
                assert_eq!(harness.toast_token(), Some(current));
            }
        }
        assert!(harness.toast(Layer::Screen).is_none());
    }

    #[test]
    fn locale_key_flips_state_and_alignment() {
        let mut harness = Harness::signed_out();
        harness.key(KeyCode::F(2));
        assert_eq!(harness.state.locale, Locale::Ar);
        assert_eq!(alignment_for(harness.state.locale.direction()), Alignment::Right);
        assert_eq!(ordered(vec![1, 2, 3], TextDirection::Rtl), vec![3, 2, 1]);
        harness.key(KeyCode::F(2));
        assert_eq!(harness.state.locale, Locale::En);
    }

    #[test]
    fn ctrl_c_quits_from_any_route() {
        let mut harness = Harness::signed_out();
        assert!(harness.key_with(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!harness.key(KeyCode::Char('c')));
    }

    #[test]
    fn search_filters_rows_and_escape_clears() {
        let mut sectors = KapFaker::new(2).sectors(4);
        sectors[2].name = "Zephyr Authority".to_owned();
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list("sector", &sectors);
        });

        harness.key(KeyCode::Char('/'));
        harness.type_text("zephyr");
        let view = harness.view_data.screen.as_ref().expect("screen").view();
        assert_eq!(view.rows.len(), 1);
        assert!(status_text(&harness.state, &harness.view_data).contains("/zephyr"));

        harness.key(KeyCode::Esc);
        assert!(harness.view_data.search.is_none());
        let view = harness.view_data.screen.as_ref().expect("screen").view();
        assert_eq!(view.rows.len(), 4);
    }

    #[test]
    fn cells_render_by_mode() {
        assert_eq!(progress_bar(40), "████░░░░░░  40%");
        assert_eq!(progress_bar(120), "██████████ 100%");
        assert_eq!(cell_text(RenderMode::Image, &CellValue::Image(None)), "○");
        assert_eq!(
            cell_text(RenderMode::Image, &CellValue::Image(Some("/a.png".to_owned()))),
            "◉"
        );
        assert_eq!(cell_text(RenderMode::Plain, &CellValue::text("Acme")), "Acme");
        assert_eq!(
            cell_text(RenderMode::Plain, &CellValue::Label("In Progress")),
            "In Progress"
        );
        assert_eq!(
            pager_text(Pager {
                page: 2,
                total_pages: 3
            }),
            "‹ Page 2 of 3 ›"
        );
    }

    #[test]
    fn title_lists_create_bulk_and_loading() {
        let mut harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list("sector", &KapFaker::new(1).sectors(3));
        });
        harness.key(KeyCode::Char(' '));
        let view = harness.view_data.screen.as_ref().expect("screen").view();
        assert_eq!(
            table_title(&view, true, true),
            "Sectors  [+ Add]  [✖ Delete Selected (1)]  Loading..."
        );
        assert_eq!(
            row_action_for_hotkey(&view.row_actions, 'e').map(|action| action.key),
            Some("edit")
        );
        assert_eq!(row_action_for_hotkey(&view.row_actions, 'g'), None);
    }

    #[test]
    fn empty_table_renders_single_no_data_row() {
        let harness = Harness::signed_in(Role::KapAdmin, |dispatcher| {
            dispatcher.list::<kapdesk_app::Sector>("sector", &[]);
        });
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| render(frame, &harness.state, &harness.view_data))
            .expect("draw");
        let text = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert_eq!(text.matches("No data available").count(), 1);
        assert!(!text.contains("Page"));
    }
}
