// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use atrium_app::{
    ACTION_COLUMN, AppCommand, AppMode, AppState, CheckState, ColumnDef, ConfirmDialog,
    DEFAULT_PAGE_SIZE, DialogStatus, EntityList, Invalidate, Mutation, MutationDialog,
    MutationRequest, PageSize, Project, ProjectId, QueryKey, Repository, RepositoryError,
    RepositoryMutation, RowAction, SELECT_COLUMN, SaveStep, Section, SortDirection, TableEngine,
    TableRow, TextInputEvent, ToastQueue, fetch_with_retry, format_timestamp,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const FILTER_COLUMN: &str = "name";
const DASHBOARD_RECENT: usize = 5;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

pub trait AppRuntime {
    fn projects(&self) -> Arc<dyn Repository<Project>>;

    fn page_size(&self) -> PageSize {
        DEFAULT_PAGE_SIZE
    }

    fn show_dashboard(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    SaveFinished {
        outcome: Result<Project, RepositoryError>,
        keys: Vec<QueryKey>,
    },
    DeleteFinished(Result<(), RepositoryError>),
    ListFetched {
        outcome: Result<Vec<Project>, RepositoryError>,
        attempts: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveCol(isize),
    ToggleRow,
    ToggleAll,
    Sort { multi: bool },
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
}

#[derive(Debug, Clone)]
struct DialogUiState {
    dialog: MutationDialog<Project>,
    field_index: usize,
}

#[derive(Debug, Clone)]
struct ConfirmUiState {
    prompt: ConfirmDialog,
    id: ProjectId,
    pending: bool,
}

#[derive(Debug, Clone)]
struct ViewData {
    list: EntityList<Project>,
    toasts: ToastQueue,
    cursor_row: usize,
    cursor_col: usize,
    dialog: Option<DialogUiState>,
    confirm: Option<ConfirmUiState>,
    column_menu: Option<usize>,
    filter_input: String,
    load_error: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn new(page_size: PageSize) -> Self {
        Self {
            list: EntityList::projects(page_size),
            toasts: ToastQueue::default(),
            cursor_row: 0,
            cursor_col: 0,
            dialog: None,
            confirm: None,
            column_menu: None,
            filter_input: String::new(),
            load_error: None,
            status_token: 0,
        }
    }

    fn table(&self) -> &TableEngine<Project> {
        self.list.table()
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(runtime.page_size());
    let (internal_tx, internal_rx) = mpsc::channel();

    if !runtime.show_dashboard() {
        state.dispatch(AppCommand::OpenSection(Section::Projects));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);
        refresh_if_stale(runtime, &mut view_data, &internal_tx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
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

/// Starts a background list fetch when the cache is stale. The loop keeps
/// drawing from the previous snapshot until `ListFetched` arrives.
fn refresh_if_stale<R: AppRuntime>(
    runtime: &R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.load_error.is_some() || !view_data.list.begin_sync() {
        return;
    }
    let key = view_data.list.query().key().to_owned();
    spawn_fetch(runtime.projects(), key, internal_tx.clone());
}

fn apply_fetched_list(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    outcome: Result<Vec<Project>, RepositoryError>,
    attempts: usize,
) {
    match view_data.list.finish_sync(outcome, attempts) {
        Ok(()) => {
            view_data.load_error = None;
            clamp_cursor(view_data);
        }
        Err(error) => {
            let message = format!("load projects: {error}");
            warn!(error = %message, "project list load failed");
            emit_status(
                state,
                view_data,
                tx,
                format!("load failed: {message}; press r to retry"),
            );
            view_data.load_error = Some(message);
        }
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(state, view_data, tx, event);
    }
}

fn handle_internal_event(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    match event {
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            state.dispatch(AppCommand::ClearStatus);
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::SaveFinished { outcome, keys } => {
            let ViewData {
                dialog,
                list,
                toasts,
                ..
            } = &mut *view_data;
            let Some(ui) = dialog.as_mut() else {
                debug!("save finished without an open dialog");
                return;
            };
            let status = ui.dialog.finish_save(outcome, &keys, list, toasts);
            if let DialogStatus::Closed(_) = status {
                *dialog = None;
                state.dispatch(AppCommand::ExitToNav);
            }
            announce_latest_toast(state, view_data, tx);
        }
        InternalEvent::DeleteFinished(outcome) => {
            view_data.list.finish_delete(outcome, &mut view_data.toasts);
            view_data.confirm = None;
            state.dispatch(AppCommand::ExitToNav);
            announce_latest_toast(state, view_data, tx);
        }
        InternalEvent::ListFetched { outcome, attempts } => {
            apply_fetched_list(state, view_data, tx, outcome, attempts);
        }
    }
}

fn announce_latest_toast(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if let Some(toast) = view_data.toasts.latest() {
        let text = toast.text.clone();
        emit_status(state, view_data, tx, text);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn spawn_save(
    repository: Arc<dyn Repository<Project>>,
    request: MutationRequest<Project>,
    tx: Sender<InternalEvent>,
) {
    thread::spawn(move || {
        let mutation = RepositoryMutation::new(repository);
        let outcome = mutation.submit(request);
        let keys = mutation.invalidation_keys();
        let _ = tx.send(InternalEvent::SaveFinished { outcome, keys });
    });
}

fn spawn_fetch(
    repository: Arc<dyn Repository<Project>>,
    key: QueryKey,
    tx: Sender<InternalEvent>,
) {
    thread::spawn(move || {
        let (outcome, attempts) = fetch_with_retry(&key, repository.as_ref());
        let _ = tx.send(InternalEvent::ListFetched { outcome, attempts });
    });
}

fn spawn_delete(
    repository: Arc<dyn Repository<Project>>,
    id: ProjectId,
    tx: Sender<InternalEvent>,
) {
    thread::spawn(move || {
        let outcome = repository.delete(&id);
        let _ = tx.send(InternalEvent::DeleteFinished(outcome));
    });
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.mode {
        AppMode::Dialog => {
            handle_dialog_key(state, runtime, view_data, internal_tx, key);
            return false;
        }
        AppMode::Confirm => {
            handle_confirm_key(state, runtime, view_data, internal_tx, key);
            return false;
        }
        AppMode::Filter => {
            handle_filter_key(state, view_data, key);
            return false;
        }
        AppMode::Nav => {}
    }

    if view_data.column_menu.is_some() {
        handle_column_menu_key(view_data, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextSection);
            return false;
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevSection);
            return false;
        }
        KeyCode::Char('r') => {
            view_data.load_error = None;
            let keys = view_data.list.invalidation_keys();
            view_data.list.invalidate(&keys);
            emit_status(state, view_data, internal_tx, "reloading projects");
            return false;
        }
        _ => {}
    }

    if state.section != Section::Projects {
        return false;
    }

    if let Some(command) = table_command_for_key(key) {
        if let Some(status) = apply_table_command(view_data, command) {
            emit_status(state, view_data, internal_tx, status);
        }
        return false;
    }

    match key.code {
        KeyCode::Char('+') => open_create_dialog(state, view_data),
        KeyCode::Char('e') => {
            if !open_update_dialog(state, view_data) {
                emit_status(state, view_data, internal_tx, "no project under the cursor");
            }
        }
        KeyCode::Char('d') => {
            if !open_delete_confirm(state, view_data) {
                emit_status(state, view_data, internal_tx, "no project under the cursor");
            }
        }
        KeyCode::Char('/') => {
            state.dispatch(AppCommand::EditFilter);
            view_data.filter_input = view_data.table().filter_value(FILTER_COLUMN).to_owned();
        }
        KeyCode::Char('c') => {
            view_data.column_menu = Some(0);
        }
        _ => {}
    }
    false
}

fn cursor_project(view_data: &ViewData) -> Option<Project> {
    let view = view_data.table().view();
    view.page.get(view_data.cursor_row).map(|row| (*row).clone())
}

fn open_create_dialog(state: &mut AppState, view_data: &mut ViewData) {
    let dialog = view_data.list.open_create();
    view_data.dialog = Some(DialogUiState {
        dialog,
        field_index: 0,
    });
    state.dispatch(AppCommand::OpenDialog);
}

fn open_update_dialog(state: &mut AppState, view_data: &mut ViewData) -> bool {
    let Some(project) = cursor_project(view_data) else {
        return false;
    };
    let mut dialog = view_data.list.open_update(&project);
    dialog.on_display();
    view_data.dialog = Some(DialogUiState {
        dialog,
        field_index: 0,
    });
    state.dispatch(AppCommand::OpenDialog);
    true
}

fn open_delete_confirm(state: &mut AppState, view_data: &mut ViewData) -> bool {
    let Some(project) = cursor_project(view_data) else {
        return false;
    };
    view_data.confirm = Some(ConfirmUiState {
        prompt: view_data.list.request_delete(&project.name),
        id: project.id,
        pending: false,
    });
    state.dispatch(AppCommand::OpenConfirm);
    true
}

fn editable_fields(dialog: &MutationDialog<Project>) -> Vec<&'static str> {
    dialog
        .group()
        .map(|group| {
            group
                .editable_controls()
                .map(|control| control.name())
                .collect()
        })
        .unwrap_or_default()
}

fn handle_dialog_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(ui) = view_data.dialog.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let fields = editable_fields(&ui.dialog);
    let field_count = fields.len().max(1);

    match key.code {
        KeyCode::Esc => {
            if ui.dialog.is_pending() {
                emit_status(state, view_data, internal_tx, "save in progress");
                return;
            }
            ui.dialog.cancel();
            view_data.dialog = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => {
            ui.field_index = (ui.field_index + 1) % field_count;
        }
        KeyCode::BackTab | KeyCode::Up => {
            ui.field_index = (ui.field_index + field_count - 1) % field_count;
        }
        KeyCode::Enter => match ui.dialog.begin_save() {
            SaveStep::Submit(request) => {
                spawn_save(runtime.projects(), request, internal_tx.clone());
            }
            SaveStep::Invalid => {
                emit_status(state, view_data, internal_tx, "fix the highlighted fields");
            }
            SaveStep::Busy => {}
        },
        KeyCode::Backspace => {
            if let Some(name) = fields.get(ui.field_index) {
                let mut value = ui
                    .dialog
                    .group()
                    .map(|group| group.value(name).to_owned())
                    .unwrap_or_default();
                value.pop();
                ui.dialog.set_field(name, value);
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(name) = fields.get(ui.field_index) {
                let mut value = ui
                    .dialog
                    .group()
                    .map(|group| group.value(name).to_owned())
                    .unwrap_or_default();
                value.push(ch);
                ui.dialog.set_field(name, value);
            }
        }
        _ => {}
    }
}

fn handle_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(confirm) = view_data.confirm.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    if confirm.pending {
        return;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            confirm.pending = true;
            spawn_delete(runtime.projects(), confirm.id.clone(), internal_tx.clone());
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            view_data.confirm = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        _ => {}
    }
}

fn handle_filter_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Esc => {
            view_data.filter_input.clear();
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            view_data.filter_input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.filter_input.push(ch);
        }
        _ => return,
    }
    let event = TextInputEvent::new(view_data.filter_input.clone());
    view_data
        .list
        .table_mut()
        .filter_changed(&event, FILTER_COLUMN);
    view_data.cursor_row = 0;
}

fn handle_column_menu_key(view_data: &mut ViewData, key: KeyEvent) {
    let Some(cursor) = view_data.column_menu else {
        return;
    };
    let hidable = view_data
        .table()
        .hidable_columns()
        .into_iter()
        .map(|column| column.id)
        .collect::<Vec<_>>();
    if hidable.is_empty() {
        view_data.column_menu = None;
        return;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('c') => view_data.column_menu = None,
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.column_menu = Some((cursor + 1).min(hidable.len() - 1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.column_menu = Some(cursor.saturating_sub(1));
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(id) = hidable.get(cursor) {
                view_data.list.table_mut().toggle_column_visibility(id);
                clamp_cursor(view_data);
            }
        }
        _ => {}
    }
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('j') | KeyCode::Down => TableCommand::MoveRow(1),
        KeyCode::Char('k') | KeyCode::Up => TableCommand::MoveRow(-1),
        KeyCode::Char('l') | KeyCode::Right => TableCommand::MoveCol(1),
        KeyCode::Char('h') | KeyCode::Left => TableCommand::MoveCol(-1),
        KeyCode::Char(' ') => TableCommand::ToggleRow,
        KeyCode::Char('a') => TableCommand::ToggleAll,
        KeyCode::Char('s') => TableCommand::Sort { multi: false },
        KeyCode::Char('S') => TableCommand::Sort { multi: true },
        KeyCode::Char('n') | KeyCode::PageDown => TableCommand::NextPage,
        KeyCode::Char('p') | KeyCode::PageUp => TableCommand::PrevPage,
        KeyCode::Char('g') | KeyCode::Home => TableCommand::FirstPage,
        KeyCode::Char('G') | KeyCode::End => TableCommand::LastPage,
        KeyCode::Char('z') => TableCommand::CyclePageSize,
        _ => return None,
    };
    Some(command)
}

fn apply_table_command(view_data: &mut ViewData, command: TableCommand) -> Option<String> {
    match command {
        TableCommand::MoveRow(delta) => {
            let rows = view_data.table().view().page.len();
            view_data.cursor_row = step_index(view_data.cursor_row, delta, rows);
            None
        }
        TableCommand::MoveCol(delta) => {
            let columns = data_columns(view_data.table()).len();
            view_data.cursor_col = step_index(view_data.cursor_col, delta, columns);
            None
        }
        TableCommand::ToggleRow => {
            let project = cursor_project(view_data)?;
            let selected = view_data
                .list
                .table_mut()
                .toggle_row_selected(&project.id);
            Some(format!(
                "{} {}",
                project.name,
                if selected { "selected" } else { "deselected" }
            ))
        }
        TableCommand::ToggleAll => {
            view_data.list.table_mut().toggle_all_rows_selected();
            Some(selection_summary(view_data.table()))
        }
        TableCommand::Sort { multi } => {
            let column = **data_columns(view_data.table()).get(view_data.cursor_col)?;
            let direction = view_data.list.table_mut().cycle_sort(column.id, multi);
            view_data.cursor_row = 0;
            Some(match direction {
                Some(direction) => format!("sort {} {}", column.header, direction.as_str()),
                None => format!("sort {} cleared", column.header),
            })
        }
        TableCommand::NextPage => {
            view_data.list.table_mut().next_page();
            view_data.cursor_row = 0;
            None
        }
        TableCommand::PrevPage => {
            view_data.list.table_mut().previous_page();
            view_data.cursor_row = 0;
            None
        }
        TableCommand::FirstPage => {
            view_data.list.table_mut().first_page();
            view_data.cursor_row = 0;
            None
        }
        TableCommand::LastPage => {
            view_data.list.table_mut().last_page();
            view_data.cursor_row = 0;
            None
        }
        TableCommand::CyclePageSize => {
            let next = view_data.table().pagination().page_size.next();
            view_data.list.table_mut().set_page_size(next);
            view_data.cursor_row = 0;
            Some(format!("rows per page: {}", next.label()))
        }
    }
}

fn step_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current
        .saturating_add_signed(delta)
        .min(len.saturating_sub(1))
}

/// Visible columns that carry data, in display order.
fn data_columns(table: &TableEngine<Project>) -> Vec<&ColumnDef> {
    table
        .visible_columns()
        .into_iter()
        .filter(|column| column.accessor.is_some())
        .collect()
}

fn clamp_cursor(view_data: &mut ViewData) {
    let rows = view_data.table().view().page.len();
    view_data.cursor_row = view_data.cursor_row.min(rows.saturating_sub(1));
    let columns = data_columns(view_data.table()).len();
    view_data.cursor_col = view_data.cursor_col.min(columns.saturating_sub(1));
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(1)])
        .split(rows[0]);

    let sidebar = Paragraph::new(render_sidebar_text(state))
        .block(Block::default().title("atrium").borders(Borders::ALL));
    frame.render_widget(sidebar, body[0]);

    match state.section {
        Section::Dashboard => {
            let dashboard = Paragraph::new(render_dashboard_text(view_data))
                .block(Block::default().title("Dashboard").borders(Borders::ALL));
            frame.render_widget(dashboard, body[1]);
        }
        Section::Projects => render_table(frame, body[1], view_data),
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, rows[1]);

    if view_data.column_menu.is_some() {
        let area = centered_rect(40, 40, frame.area());
        frame.render_widget(Clear, area);
        let menu = Paragraph::new(render_column_menu_text(view_data))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(menu, area);
    }

    if let Some(ui) = &view_data.dialog {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(render_dialog_text(ui)).block(
            Block::default()
                .title(ui.dialog.context().title.clone())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(dialog, area);
    }

    if let Some(confirm) = &view_data.confirm {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(render_confirm_text(confirm)).block(
            Block::default()
                .title(confirm.prompt.title.clone())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(prompt, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let table = view_data.table();
    let view = table.view();
    let columns = table.visible_columns();
    let focused = data_columns(table)
        .get(view_data.cursor_col)
        .map(|column| column.id);

    let widths = columns
        .iter()
        .map(|column| match column.id {
            SELECT_COLUMN => Constraint::Length(3),
            ACTION_COLUMN => Constraint::Length(22),
            _ => Constraint::Min(8),
        })
        .collect::<Vec<_>>();

    let header = Row::new(columns.iter().map(|column| {
        Cell::from(header_label(table, column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let body = if view.page.is_empty() {
        vec![Row::new(vec![Cell::from("No Data")])]
    } else {
        view.page
            .iter()
            .enumerate()
            .map(|(index, project)| {
                let cursor = index == view_data.cursor_row;
                let cells = columns
                    .iter()
                    .map(|column| {
                        let text = cell_text(table, column, project);
                        let mut style = Style::default();
                        if cursor {
                            style = style.bg(Color::DarkGray);
                        }
                        if cursor && focused == Some(column.id) {
                            style = Style::default()
                                .fg(Color::Black)
                                .bg(Color::Cyan)
                                .add_modifier(Modifier::BOLD);
                        }
                        Cell::from(text).style(style)
                    })
                    .collect::<Vec<_>>();
                Row::new(cells)
            })
            .collect()
    };

    let widget = Table::new(body, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(view_data))
                .title_bottom(table_footer_text(table))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, area);
}

fn checkbox(state: CheckState) -> &'static str {
    match state {
        CheckState::Checked => "[x]",
        CheckState::Indeterminate => "[-]",
        CheckState::Unchecked => "[ ]",
    }
}

fn row_action_key(action: RowAction) -> char {
    match action {
        RowAction::Update => 'e',
        RowAction::Delete => 'd',
    }
}

fn header_label(table: &TableEngine<Project>, column: &ColumnDef) -> String {
    match column.id {
        SELECT_COLUMN => return checkbox(table.header_selection()).to_owned(),
        ACTION_COLUMN => return "Actions".to_owned(),
        _ => {}
    }

    let mut label = column.header.to_owned();
    let sorting = table.sorting();
    if let Some((position, sort)) = sorting
        .iter()
        .enumerate()
        .find(|(_, sort)| sort.column == column.id)
    {
        if sorting.len() == 1 {
            label.push_str(match sort.direction {
                SortDirection::Asc => " ↑",
                SortDirection::Desc => " ↓",
            });
        } else {
            label.push_str(match sort.direction {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            });
            label.push_str(&(position + 1).to_string());
        }
    }
    label
}

fn cell_text(table: &TableEngine<Project>, column: &ColumnDef, project: &Project) -> String {
    match (column.id, column.accessor) {
        (SELECT_COLUMN, _) => {
            let state = if table.is_selected(&project.row_key()) {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
            checkbox(state).to_owned()
        }
        (ACTION_COLUMN, _) => RowAction::ALL
            .iter()
            .map(|action| format!("{} {}", row_action_key(*action), action.label()))
            .collect::<Vec<_>>()
            .join("  "),
        (_, Some(accessor)) => project.cell(accessor).display(),
        (_, None) => String::new(),
    }
}

fn selection_summary(table: &TableEngine<Project>) -> String {
    format!(
        "{} of {} row(s) selected.",
        table.selected_count(),
        table.row_count()
    )
}

fn table_title(view_data: &ViewData) -> String {
    let filter = view_data.table().filter_value(FILTER_COLUMN);
    if filter.is_empty() {
        Section::Projects.label().to_owned()
    } else {
        format!("{} (name ~ {filter:?})", Section::Projects.label())
    }
}

fn table_footer_text(table: &TableEngine<Project>) -> String {
    let pagination = table.pagination();
    let pages = table.page_count().max(1);
    let page = pagination.page_index.min(pages - 1) + 1;
    format!(
        " {} | Rows per page: {} | Page {page} of {pages} ",
        selection_summary(table),
        pagination.page_size.label()
    )
}

fn render_sidebar_text(state: &AppState) -> String {
    Section::ALL
        .iter()
        .map(|section| {
            let marker = if *section == state.section { ">" } else { " " };
            format!("{marker} {}", section.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_dashboard_text(view_data: &ViewData) -> String {
    let data = view_data.table().data();
    let mut lines = vec![format!("projects: {}", data.len()), String::new()];
    if let Some(error) = &view_data.load_error {
        lines.push(format!("load failed: {error}"));
        return lines.join("\n");
    }
    if data.is_empty() && view_data.list.query().is_fetching() {
        lines.push("loading projects...".to_owned());
        return lines.join("\n");
    }

    let mut recent = data.iter().collect::<Vec<_>>();
    recent.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
    if recent.is_empty() {
        lines.push("no projects yet; press tab then + to add one".to_owned());
    } else {
        lines.push("recently updated:".to_owned());
        lines.extend(recent.into_iter().take(DASHBOARD_RECENT).map(|project| {
            format!(
                "  {}  {}  {}",
                format_timestamp(project.updated_at),
                project.name,
                project.description
            )
        }));
    }
    lines.join("\n")
}

fn render_dialog_text(ui: &DialogUiState) -> String {
    let dialog = &ui.dialog;
    let mut lines = vec![dialog.context().description.clone(), String::new()];
    if let Some(group) = dialog.group() {
        for (index, control) in group.editable_controls().enumerate() {
            let marker = if index == ui.field_index { ">" } else { " " };
            lines.push(format!("{marker} {}: {}", control.label(), control.value()));
            if let Some(error) = control.error() {
                lines.push(format!("    {error}"));
            }
        }
    }
    lines.push(String::new());
    if let Some(failure) = dialog.last_failure() {
        lines.push(format!("error: {failure}"));
    }
    let save = if dialog.is_pending() {
        "Saving..."
    } else {
        "Save changes"
    };
    lines.push(format!("[enter] {save}  [esc] Cancel  [tab] next field"));
    lines.join("\n")
}

fn render_confirm_text(confirm: &ConfirmUiState) -> String {
    let actions = if confirm.pending {
        "Deleting...".to_owned()
    } else {
        format!(
            "[y] {}  [n] {}",
            confirm.prompt.proceed_text, confirm.prompt.cancel_text
        )
    };
    [confirm.prompt.description.clone(), String::new(), actions].join("\n")
}

fn render_column_menu_text(view_data: &ViewData) -> String {
    let cursor = view_data.column_menu.unwrap_or(0);
    let table = view_data.table();
    let mut lines = table
        .hidable_columns()
        .into_iter()
        .enumerate()
        .map(|(index, column)| {
            let marker = if index == cursor { ">" } else { " " };
            let state = if table.is_column_visible(column.id) {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
            format!("{marker} {} {}", checkbox(state), column.header)
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("space toggle | j/k move | esc close".to_owned());
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Filter => "FILTER",
        AppMode::Dialog => "DIALOG",
        AppMode::Confirm => "CONFIRM",
    };
    let hints = match (state.mode, state.section) {
        (AppMode::Filter, _) => format!("name: {}_ | enter keep | esc clear", view_data.filter_input),
        (AppMode::Dialog, _) => "tab field | enter save | esc cancel".to_owned(),
        (AppMode::Confirm, _) => "y/enter proceed | n/esc cancel".to_owned(),
        (AppMode::Nav, Section::Dashboard) => "tab sections | r reload | q quit".to_owned(),
        (AppMode::Nav, Section::Projects) => {
            "j/k/h/l | space/a select | / filter | s/S sort | n/p g/G z pages | c cols | + add e edit d del | q"
                .to_owned()
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
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
        AppRuntime, InternalEvent, TableCommand, ViewData, apply_table_command, handle_internal_event,
        handle_key_event, header_label, refresh_if_stale, render_confirm_text,
        render_dashboard_text, render_dialog_text, render_sidebar_text, status_text,
        table_command_for_key, table_footer_text,
    };
    use atrium_app::{
        AppMode, AppState, PageSize, Project, ProjectId, Repository, RepositoryError, Section,
    };
    use atrium_testkit::{Call, ScriptedRepository, projects};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    struct TestRuntime {
        repository: Arc<ScriptedRepository>,
    }

    impl TestRuntime {
        fn with_rows(count: usize) -> Self {
            Self {
                repository: Arc::new(ScriptedRepository::with_rows(projects(count))),
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn projects(&self) -> Arc<dyn Repository<Project>> {
            self.repository.clone()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn projects_state() -> AppState {
        AppState {
            section: Section::Projects,
            ..AppState::default()
        }
    }

    /// Runs one background list fetch to completion.
    fn load(state: &mut AppState, runtime: &TestRuntime, view_data: &mut ViewData) {
        let (tx, rx) = mpsc::channel();
        refresh_if_stale(runtime, view_data, &tx);
        let event = next_worker_event(&rx);
        assert!(matches!(event, InternalEvent::ListFetched { .. }));
        handle_internal_event(state, view_data, &tx, event);
    }

    fn loaded_view(runtime: &TestRuntime) -> ViewData {
        let mut view_data = ViewData::new(PageSize::Rows(5));
        load(&mut AppState::default(), runtime, &mut view_data);
        assert!(view_data.load_error.is_none());
        view_data
    }

    fn press(
        state: &mut AppState,
        runtime: &TestRuntime,
        view_data: &mut ViewData,
        tx: &mpsc::Sender<InternalEvent>,
        keys: &[KeyEvent],
    ) {
        for key in keys {
            let _ = handle_key_event(state, runtime, view_data, tx, *key);
        }
    }

    fn type_text(
        state: &mut AppState,
        runtime: &TestRuntime,
        view_data: &mut ViewData,
        tx: &mpsc::Sender<InternalEvent>,
        text: &str,
    ) {
        let keys = text.chars().map(|ch| key(KeyCode::Char(ch))).collect::<Vec<_>>();
        press(state, runtime, view_data, tx, &keys);
    }

    /// Waits for the worker thread's result, skipping status timers.
    fn next_worker_event(rx: &mpsc::Receiver<InternalEvent>) -> InternalEvent {
        loop {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("worker event should arrive");
            if !matches!(event, InternalEvent::ClearStatus { .. }) {
                return event;
            }
        }
    }

    #[test]
    fn q_quits_and_tab_switches_section() {
        let runtime = TestRuntime::with_rows(0);
        let mut state = AppState::default();
        let mut view_data = ViewData::new(PageSize::Rows(5));
        let (tx, _rx) = mpsc::channel();

        assert!(!handle_key_event(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            key(KeyCode::Tab)
        ));
        assert_eq!(state.section, Section::Projects);
        assert!(handle_key_event(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            key(KeyCode::Char('q'))
        ));
    }

    #[test]
    fn table_keys_map_to_commands() {
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('S'))),
            Some(TableCommand::Sort { multi: true })
        );
        assert_eq!(
            table_command_for_key(key(KeyCode::Char('z'))),
            Some(TableCommand::CyclePageSize)
        );
        assert_eq!(table_command_for_key(key(KeyCode::Char('+'))), None);
    }

    #[test]
    fn paging_and_page_size_update_footer() {
        let runtime = TestRuntime::with_rows(12);
        let mut view_data = loaded_view(&runtime);
        assert_eq!(
            table_footer_text(view_data.table()),
            " 0 of 12 row(s) selected. | Rows per page: 5 | Page 1 of 3 "
        );

        apply_table_command(&mut view_data, TableCommand::LastPage);
        assert!(table_footer_text(view_data.table()).contains("Page 3 of 3"));
        assert_eq!(view_data.table().view().page.len(), 2);

        let status = apply_table_command(&mut view_data, TableCommand::CyclePageSize);
        assert_eq!(status.as_deref(), Some("rows per page: 10"));
        assert!(table_footer_text(view_data.table()).contains("Page 1 of 2"));
    }

    #[test]
    fn empty_table_reports_single_page() {
        let runtime = TestRuntime::with_rows(0);
        let view_data = loaded_view(&runtime);
        assert!(table_footer_text(view_data.table()).contains("Page 1 of 1"));
        assert!(render_dashboard_text(&view_data).contains("no projects yet"));
    }

    #[test]
    fn sort_marks_header_and_select_all_sets_checkbox() {
        let runtime = TestRuntime::with_rows(6);
        let mut view_data = loaded_view(&runtime);

        apply_table_command(&mut view_data, TableCommand::Sort { multi: false });
        let name = view_data
            .table()
            .column("name")
            .copied()
            .expect("name column");
        assert_eq!(header_label(view_data.table(), &name), "Name ↑");

        apply_table_command(&mut view_data, TableCommand::MoveCol(1));
        apply_table_command(&mut view_data, TableCommand::Sort { multi: true });
        assert_eq!(header_label(view_data.table(), &name), "Name ▲1");

        let select = view_data
            .table()
            .column("select")
            .copied()
            .expect("select column");
        apply_table_command(&mut view_data, TableCommand::ToggleRow);
        assert_eq!(header_label(view_data.table(), &select), "[-]");
        apply_table_command(&mut view_data, TableCommand::ToggleAll);
        assert_eq!(header_label(view_data.table(), &select), "[x]");
        assert!(table_footer_text(view_data.table()).contains("6 of 6 row(s) selected."));
    }

    #[test]
    fn filter_mode_narrows_rows_live() {
        let runtime = TestRuntime::with_rows(8);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, _rx) = mpsc::channel();

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Char('/'))]);
        assert_eq!(state.mode, AppMode::Filter);
        type_text(&mut state, &runtime, &mut view_data, &tx, "roof");
        assert_eq!(view_data.table().row_count(), 1);
        assert!(status_text(&state, &view_data).contains("name: roof_"));

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Esc)]);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(view_data.table().row_count(), 8);
    }

    #[test]
    fn create_dialog_validates_then_saves_on_worker() {
        let runtime = TestRuntime::with_rows(2);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, rx) = mpsc::channel();

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Char('+'))]);
        assert_eq!(state.mode, AppMode::Dialog);

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Enter)]);
        let ui = view_data.dialog.as_ref().expect("dialog stays open");
        let text = render_dialog_text(ui);
        assert!(text.contains("Name is required."));
        assert!(text.contains("Description is required."));
        assert_eq!(runtime.repository.calls(), vec![Call::List]);

        type_text(&mut state, &runtime, &mut view_data, &tx, "Trip");
        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Tab)]);
        type_text(&mut state, &runtime, &mut view_data, &tx, "Vacation");
        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Enter)]);

        let ui = view_data.dialog.as_ref().expect("dialog open while saving");
        assert!(ui.dialog.is_pending());
        assert!(render_dialog_text(ui).contains("Saving..."));
        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Enter)]);

        let event = next_worker_event(&rx);
        handle_internal_event(&mut state, &mut view_data, &tx, event);
        assert!(view_data.dialog.is_none());
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(state.status_line.as_deref(), Some("Project has been created"));
        assert!(view_data.list.query().is_stale());

        load(&mut state, &runtime, &mut view_data);
        assert_eq!(view_data.table().row_count(), 3);
        let creates = runtime
            .repository
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[test]
    fn update_dialog_prefills_and_reports_failure() {
        let runtime = TestRuntime::with_rows(3);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, rx) = mpsc::channel();

        press(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            &[key(KeyCode::Char('j')), key(KeyCode::Char('e'))],
        );
        let ui = view_data.dialog.as_ref().expect("update dialog");
        assert_eq!(ui.dialog.context().title, "Update Project");
        assert!(render_dialog_text(ui).contains("Name: Kitchen 2"));

        runtime.repository.fail_next(RepositoryError::Network {
            status: 500,
            message: "upstream down".to_owned(),
        });
        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Enter)]);
        let event = next_worker_event(&rx);
        handle_internal_event(&mut state, &mut view_data, &tx, event);

        let ui = view_data.dialog.as_ref().expect("dialog stays open on failure");
        assert!(!ui.dialog.is_pending());
        assert!(render_dialog_text(ui).contains("error: upstream down"));
        assert_eq!(state.status_line.as_deref(), Some("Failed to update project"));
        assert_eq!(state.mode, AppMode::Dialog);
    }

    #[test]
    fn delete_confirm_runs_on_worker_and_keeps_row_on_failure() {
        let runtime = TestRuntime::with_rows(3);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, rx) = mpsc::channel();

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Char('d'))]);
        let confirm = view_data.confirm.as_ref().expect("confirm prompt");
        assert!(render_confirm_text(confirm).contains("\"Garden 1\""));

        runtime
            .repository
            .fail_next(RepositoryError::NotFound("gone".to_owned()));
        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Char('y'))]);
        let confirm = view_data.confirm.as_ref().expect("pending prompt");
        assert!(render_confirm_text(confirm).contains("Deleting..."));

        let event = next_worker_event(&rx);
        assert_eq!(
            event,
            InternalEvent::DeleteFinished(Err(RepositoryError::NotFound("gone".to_owned())))
        );
        handle_internal_event(&mut state, &mut view_data, &tx, event);
        assert!(view_data.confirm.is_none());
        assert_eq!(state.status_line.as_deref(), Some("Failed to delete project"));
        assert!(
            view_data
                .table()
                .data()
                .iter()
                .any(|row| row.id == ProjectId::new("1"))
        );
    }

    #[test]
    fn confirm_cancel_issues_no_request() {
        let runtime = TestRuntime::with_rows(1);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, _rx) = mpsc::channel();

        press(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            &[key(KeyCode::Char('d')), key(KeyCode::Esc)],
        );
        assert!(view_data.confirm.is_none());
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(runtime.repository.calls(), vec![Call::List]);
    }

    #[test]
    fn column_menu_hides_description() {
        let runtime = TestRuntime::with_rows(2);
        let mut state = projects_state();
        let mut view_data = loaded_view(&runtime);
        let (tx, _rx) = mpsc::channel();

        press(
            &mut state,
            &runtime,
            &mut view_data,
            &tx,
            &[
                key(KeyCode::Char('c')),
                key(KeyCode::Char('j')),
                key(KeyCode::Char(' ')),
                key(KeyCode::Esc),
            ],
        );
        assert!(view_data.column_menu.is_none());
        assert!(!view_data.table().is_column_visible("description"));
        assert!(view_data.table().is_column_visible("name"));
    }

    #[test]
    fn sidebar_marks_active_section() {
        let state = projects_state();
        assert_eq!(render_sidebar_text(&state), "  Dashboard\n> Projects");
    }

    #[test]
    fn dashboard_lists_recent_projects_first() {
        let runtime = TestRuntime::with_rows(7);
        let view_data = loaded_view(&runtime);
        let text = render_dashboard_text(&view_data);
        assert!(text.starts_with("projects: 7"));
        let latest = text.find("Attic 7").expect("latest project listed");
        let older = text.find("Porch 5").expect("older project listed");
        assert!(latest < older);
        assert!(!text.contains("Garden 1"));
    }

    #[test]
    fn stale_refresh_runs_off_the_loop_thread() {
        let runtime = TestRuntime::with_rows(4);
        runtime.repository.delay_lists(Duration::from_millis(400));
        let mut state = projects_state();
        let mut view_data = ViewData::new(PageSize::Rows(5));
        let (tx, rx) = mpsc::channel();

        let started = Instant::now();
        refresh_if_stale(&runtime, &mut view_data, &tx);
        refresh_if_stale(&runtime, &mut view_data, &tx);
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(view_data.list.query().is_fetching());
        assert!(render_dashboard_text(&view_data).contains("loading projects..."));

        let event = next_worker_event(&rx);
        handle_internal_event(&mut state, &mut view_data, &tx, event);
        assert_eq!(view_data.table().row_count(), 4);
        assert!(!view_data.list.query().is_stale());
        assert_eq!(runtime.repository.calls(), vec![Call::List]);
    }

    #[test]
    fn failed_load_waits_for_reload_key() {
        let runtime = TestRuntime::with_rows(2);
        let mut state = projects_state();
        let mut view_data = ViewData::new(PageSize::Rows(5));
        let (tx, _rx) = mpsc::channel();
        for _ in 0..2 {
            runtime
                .repository
                .fail_next(RepositoryError::Transport("offline".to_owned()));
        }

        load(&mut state, &runtime, &mut view_data);
        assert_eq!(view_data.load_error.as_deref(), Some("load projects: offline"));
        assert_eq!(
            state.status_line.as_deref(),
            Some("load failed: load projects: offline; press r to retry")
        );
        refresh_if_stale(&runtime, &mut view_data, &tx);
        assert!(!view_data.list.query().is_fetching());

        press(&mut state, &runtime, &mut view_data, &tx, &[key(KeyCode::Char('r'))]);
        load(&mut state, &runtime, &mut view_data);
        assert!(view_data.load_error.is_none());
        assert_eq!(view_data.table().row_count(), 2);
    }
}
