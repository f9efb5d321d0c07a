//! TUI application state and event handling.
//!
//! [`App`] holds everything except the terminal, so key handling and route
//! changes can be driven from tests. [`TuiApp`] owns the terminal and runs
//! the event loop.
//!
//! Network work never runs on the event loop. Mounts and commands are
//! spawned as tasks whose results come back as [`Outcome`]s on a channel the
//! loop drains every iteration, so keys and redraws keep flowing while a
//! call is pending.

use crate::screens;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use queue_client::prelude::*;
use queue_client::synchronizer::REMOVAL_PROMPT;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Available screens in the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Sign-in form
    Login,
    /// Staff queue management
    Staff,
    /// Public waiting-room display
    Display,
}

impl Screen {
    /// Get screen title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Sign In",
            Self::Staff => "Queue",
            Self::Display => "Now Serving",
        }
    }
}

impl From<Route> for Screen {
    fn from(route: Route) -> Self {
        match route {
            Route::Login => Self::Login,
            Route::Staff => Self::Staff,
            Route::Display => Self::Display,
        }
    }
}

/// Focused login field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

/// Login form contents
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    /// Inline error from the last attempt
    pub error: Option<String>,
}

impl LoginForm {
    /// Password as shown on screen
    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

/// Focused add-patient field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatientField {
    #[default]
    Name,
    Age,
    Phone,
    Complaint,
    Priority,
}

impl PatientField {
    const ORDER: [PatientField; 5] = [
        Self::Name,
        Self::Age,
        Self::Phone,
        Self::Complaint,
        Self::Priority,
    ];

    /// Field label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Age => "Age",
            Self::Phone => "Phone",
            Self::Complaint => "Complaint",
            Self::Priority => "Priority",
        }
    }

    fn index(&self) -> usize {
        Self::ORDER.iter().position(|f| f == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    fn prev(&self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Add-patient form contents
#[derive(Debug, Clone, Default)]
pub struct PatientForm {
    pub name: String,
    pub age: String,
    pub phone: String,
    pub complaint: String,
    pub priority: Priority,
    pub focus: PatientField,
}

impl PatientForm {
    /// Payload exactly as entered
    pub fn to_new_patient(&self) -> NewPatient {
        NewPatient {
            name: self.name.clone(),
            age: self.age.clone(),
            phone: self.phone.clone(),
            complaint: self.complaint.clone(),
            priority: self.priority,
        }
    }

    /// Text of a field, for rendering
    pub fn value(&self, field: PatientField) -> String {
        match field {
            PatientField::Name => self.name.clone(),
            PatientField::Age => self.age.clone(),
            PatientField::Phone => self.phone.clone(),
            PatientField::Complaint => self.complaint.clone(),
            PatientField::Priority => self.priority.label().to_string(),
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            PatientField::Name => Some(&mut self.name),
            PatientField::Age => Some(&mut self.age),
            PatientField::Phone => Some(&mut self.phone),
            PatientField::Complaint => Some(&mut self.complaint),
            PatientField::Priority => None,
        }
    }

    fn input(&mut self, c: char) {
        match self.text_mut() {
            Some(text) => text.push(c),
            None if c == ' ' => self.priority = self.priority.next(),
            None => {}
        }
    }

    fn backspace(&mut self) {
        if let Some(text) = self.text_mut() {
            text.pop();
        }
    }
}

/// Interaction mode on the staff screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Moving through the queue
    Browse,
    /// Filling in the add-patient form
    AddPatient,
    /// Waiting for y/n on a removal
    ConfirmRemoval { id: EntryId, name: String },
}

/// Work that needs the network, produced by a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login { email: String, password: String },
    Logout,
    AddPatient(NewPatient),
    Call(EntryId),
    Complete(EntryId),
    SetPriority(EntryId, Priority),
    Remove(EntryId),
}

impl Action {
    /// Status text while the action is in flight
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Signing in...",
            Self::Logout => "Signing out...",
            Self::AddPatient(_) => "Adding...",
            Self::Call(_) => "Calling...",
            Self::Complete(_) => "Completing...",
            Self::SetPriority(..) => "Updating priority...",
            Self::Remove(_) => "Removing...",
        }
    }
}

/// The view currently mounted, if any
enum ActiveView {
    None,
    Staff(Mounted<QueueSynchronizer>),
    Display(Mounted<DisplayProjector>),
}

/// Result of background work, applied on the event loop
enum Outcome {
    /// A view finished its first fetch. Stale generations are dropped.
    Mounted { generation: u64, view: ActiveView },
    Login(Result<(), String>),
    Logout,
    Added(Result<(), CommandError>),
    Command(Result<(), CommandError>),
    /// A queue command issued before the queue view was mounted
    Skipped,
}

/// Rendering state snapshot
#[derive(Debug, Clone)]
pub struct RenderState {
    pub screen: Screen,
    pub user: String,
    pub login: LoginForm,
    pub staff: StaffView,
    pub display: DisplayView,
    pub patient: PatientForm,
    pub mode: Mode,
    pub selected: usize,
    pub status: Option<String>,
    pub busy: Option<&'static str>,
}

/// Application state, independent of the terminal
pub struct App {
    client: Arc<QueueClient>,
    screen: Option<Screen>,
    view: ActiveView,
    generation: u64,
    pending: usize,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    login: LoginForm,
    patient: PatientForm,
    mode: Mode,
    selected: usize,
    status: Option<String>,
    busy: Option<&'static str>,
    should_quit: bool,
}

impl App {
    /// Create the application over a client
    pub fn new(client: QueueClient) -> Self {
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(client),
            screen: None,
            view: ActiveView::None,
            generation: 0,
            pending: 0,
            outcome_tx,
            outcomes,
            login: LoginForm::default(),
            patient: PatientForm::default(),
            mode: Mode::Browse,
            selected: 0,
            status: None,
            busy: None,
            should_quit: false,
        }
    }

    /// Underlying client
    pub fn client(&self) -> &QueueClient {
        &self.client
    }

    /// Screen currently shown
    pub fn screen(&self) -> Option<Screen> {
        self.screen
    }

    /// Current staff interaction mode
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Whether the user asked to exit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether background work is still outstanding
    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    /// Follow the navigator: gate the requested route, drop the old view and
    /// start mounting the new one. Returns without waiting for the mount.
    pub fn sync_route(&mut self) {
        let navigator = self.client.navigator();
        let requested = navigator.current();
        let route = self.client.gate().resolve(requested);
        if route != requested {
            navigator.navigate(route);
        }

        let screen = Screen::from(route);
        if self.screen == Some(screen) {
            return;
        }

        // Dropping the previous handle tears that view down.
        self.view = ActiveView::None;
        self.generation += 1;
        if screen != Screen::Login {
            let generation = self.generation;
            let client = Arc::clone(&self.client);
            let tx = self.outcome_tx.clone();
            tokio::spawn(async move {
                let view = match screen {
                    Screen::Staff => ActiveView::Staff(client.mount_staff().await),
                    Screen::Display => ActiveView::Display(client.mount_display().await),
                    Screen::Login => ActiveView::None,
                };
                let _ = tx.send(Outcome::Mounted { generation, view });
            });
        }
        tracing::debug!(screen = screen.title(), "Screen changed");

        self.screen = Some(screen);
        self.mode = Mode::Browse;
        self.selected = 0;
        self.status = None;
    }

    fn staff(&self) -> Option<Arc<QueueSynchronizer>> {
        match &self.view {
            ActiveView::Staff(mounted) => Some(mounted.shared()),
            _ => None,
        }
    }

    fn staff_view(&self) -> StaffView {
        match &self.view {
            ActiveView::Staff(mounted) => mounted.view(),
            _ => StaffView::default(),
        }
    }

    fn display_view(&self) -> DisplayView {
        match &self.view {
            ActiveView::Display(mounted) => mounted.view(),
            _ => DisplayView::default(),
        }
    }

    /// Get a snapshot of the render state
    pub fn render_state(&self) -> RenderState {
        let staff = self.staff_view();
        let selected = self.selected.min(staff.rows.len().saturating_sub(1));
        RenderState {
            screen: self.screen.unwrap_or(Screen::Login),
            user: self
                .client
                .session()
                .profile()
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| "User".to_string()),
            login: self.login.clone(),
            staff,
            display: self.display_view(),
            patient: self.patient.clone(),
            mode: self.mode.clone(),
            selected,
            status: self.status.clone(),
            busy: self.busy,
        }
    }

    /// Handle keyboard input. Returns network work to perform, if any.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<Action> {
        let action = match self.screen.unwrap_or(Screen::Login) {
            Screen::Login => self.handle_login_key(key),
            Screen::Staff => match self.mode {
                Mode::Browse => self.handle_browse_key(key),
                Mode::AddPatient => self.handle_form_key(key),
                Mode::ConfirmRemoval { .. } => self.handle_confirm_key(key),
            },
            Screen::Display => self.handle_display_key(key),
        };
        if let Some(action) = &action {
            self.busy = Some(action.progress_label());
        }
        action
    }

    fn handle_login_key(&mut self, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.login.toggle_focus(),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            KeyCode::Enter => {
                self.login.error = None;
                return Some(Action::Login {
                    email: self.login.email.clone(),
                    password: self.login.password.clone(),
                });
            }
            _ => {}
        }
        None
    }

    fn handle_browse_key(&mut self, key: KeyCode) -> Option<Action> {
        let view = self.staff_view();
        let selected = view
            .rows
            .get(self.selected.min(view.rows.len().saturating_sub(1)));

        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('a') => self.mode = Mode::AddPatient,
            KeyCode::Char('2') => self.client.navigator().navigate(Route::Display),
            KeyCode::Char('o') => return Some(Action::Logout),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.min(view.rows.len()).saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < view.rows.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('c') => {
                let row = selected.filter(|r| r.actions.contains(&RowAction::Call))?;
                return Some(Action::Call(row.id.clone()));
            }
            KeyCode::Char('d') => {
                let row = selected.filter(|r| r.actions.contains(&RowAction::Complete))?;
                return Some(Action::Complete(row.id.clone()));
            }
            KeyCode::Char('p') => {
                let row = selected?;
                return Some(Action::SetPriority(row.id.clone(), row.priority.next()));
            }
            KeyCode::Char('x') => {
                let row = selected?;
                self.mode = Mode::ConfirmRemoval {
                    id: row.id.clone(),
                    name: row.name.clone(),
                };
            }
            _ => {}
        }
        None
    }

    fn handle_form_key(&mut self, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Tab | KeyCode::Down => self.patient.focus = self.patient.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.patient.focus = self.patient.focus.prev(),
            KeyCode::Left if self.patient.focus == PatientField::Priority => {
                // Three priorities, so two steps forward is one back
                self.patient.priority = self.patient.priority.next().next();
            }
            KeyCode::Right if self.patient.focus == PatientField::Priority => {
                self.patient.priority = self.patient.priority.next();
            }
            KeyCode::Backspace => self.patient.backspace(),
            KeyCode::Char(c) => self.patient.input(c),
            KeyCode::Enter => return Some(Action::AddPatient(self.patient.to_new_patient())),
            _ => {}
        }
        None
    }

    fn handle_confirm_key(&mut self, key: KeyCode) -> Option<Action> {
        let Mode::ConfirmRemoval { id, .. } = &self.mode else {
            return None;
        };
        match key {
            KeyCode::Char('y') | KeyCode::Enter => {
                let id = id.clone();
                self.mode = Mode::Browse;
                Some(Action::Remove(id))
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                tracing::debug!(%id, "Removal cancelled");
                self.mode = Mode::Browse;
                None
            }
            _ => None,
        }
    }

    fn handle_display_key(&mut self, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('1') => self.client.navigator().navigate(Route::Staff),
            _ => {}
        }
        None
    }

    /// Start network work produced by a key press. The result arrives
    /// later through [`App::drain`] or [`App::next_outcome`].
    pub fn dispatch(&mut self, action: Action) {
        let client = Arc::clone(&self.client);
        let staff = self.staff();
        let tx = self.outcome_tx.clone();

        let task = async move {
            let outcome = async {
                match action {
                    Action::Login { email, password } => Outcome::Login(
                        client
                            .session()
                            .login(&email, &password)
                            .await
                            .map(|_| ())
                            .map_err(|e| e.to_string()),
                    ),
                    Action::Logout => {
                        client.session().logout().await;
                        Outcome::Logout
                    }
                    Action::AddPatient(patient) => {
                        let Some(staff) = staff else {
                            return Outcome::Skipped;
                        };
                        Outcome::Added(staff.add_patient(&patient).await.map(|_| ()))
                    }
                    Action::Call(id) => {
                        let Some(staff) = staff else {
                            return Outcome::Skipped;
                        };
                        Outcome::Command(staff.call_patient(&id).await.map(|_| ()))
                    }
                    Action::Complete(id) => {
                        let Some(staff) = staff else {
                            return Outcome::Skipped;
                        };
                        Outcome::Command(staff.complete_patient(&id).await.map(|_| ()))
                    }
                    Action::SetPriority(id, priority) => {
                        let Some(staff) = staff else {
                            return Outcome::Skipped;
                        };
                        Outcome::Command(staff.update_priority(&id, priority).await.map(|_| ()))
                    }
                    Action::Remove(id) => {
                        let Some(staff) = staff else {
                            return Outcome::Skipped;
                        };
                        Outcome::Command(staff.request_removal(id).confirm().await)
                    }
                }
            }
            .await;
            let _ = tx.send(outcome);
        };

        self.pending += 1;
        tokio::spawn(task);
    }

    /// Apply every outcome that has already arrived
    pub fn drain(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.apply(outcome);
        }
    }

    /// Wait for the next outcome and apply it
    pub async fn next_outcome(&mut self) {
        if let Some(outcome) = self.outcomes.recv().await {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Mounted { generation, view } => {
                // A late mount for a screen already left is dropped here.
                if generation == self.generation {
                    self.view = view;
                }
                return;
            }
            Outcome::Login(Ok(())) => {
                self.login = LoginForm::default();
                self.client.navigator().navigate(Route::Staff);
            }
            Outcome::Login(Err(message)) => self.login.error = Some(message),
            Outcome::Logout | Outcome::Skipped => {}
            Outcome::Added(Ok(())) => {
                self.patient = PatientForm::default();
                self.mode = Mode::Browse;
                self.status = None;
            }
            Outcome::Added(result) | Outcome::Command(result) => self.report(result),
        }

        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 {
            self.busy = None;
        }
    }

    fn report(&mut self, result: Result<(), CommandError>) {
        // An expired session has no message; the redirect says it all.
        self.status = result.err().and_then(|e| e.user_message());
    }

    /// Draw the current screen
    pub fn draw(frame: &mut Frame, state: &RenderState) {
        let area = frame.size();
        match state.screen {
            Screen::Login => screens::draw_login(frame, area, &state.login, state.busy),
            Screen::Display => screens::draw_display(frame, area, &state.display),
            Screen::Staff => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3), // Header
                        Constraint::Min(0),    // Content
                        Constraint::Length(1), // Status
                        Constraint::Length(3), // Footer
                    ])
                    .split(area);

                Self::draw_header(frame, chunks[0], state);
                screens::draw_staff(frame, chunks[1], state);
                Self::draw_status(frame, chunks[2], state);
                Self::draw_footer(frame, chunks[3], &state.mode);
            }
        }
    }

    /// Draw header
    fn draw_header(frame: &mut Frame, area: Rect, state: &RenderState) {
        let title = format!(
            " Walk-in Queue - {}  |  Signed in as {} ",
            state.screen.title(),
            state.user
        );
        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    /// Draw the in-flight or error line
    fn draw_status(frame: &mut Frame, area: Rect, state: &RenderState) {
        let line = match (state.busy, &state.status) {
            (Some(busy), _) => Span::styled(busy, Style::default().fg(Color::Yellow)),
            (None, Some(status)) => Span::styled(status.clone(), Style::default().fg(Color::Red)),
            (None, None) => Span::raw(""),
        };
        frame.render_widget(Paragraph::new(Line::from(line)), area);
    }

    /// Draw footer with keybindings
    fn draw_footer(frame: &mut Frame, area: Rect, mode: &Mode) {
        let footer_text = match mode {
            Mode::Browse => {
                " [a]Add [j/k]Select [c]Call [d]Complete [p]Priority [x]Remove | [2]Display [o]Logout [q]Quit "
            }
            Mode::AddPatient => " [Tab]Next field [Space]Cycle priority [Enter]Add [Esc]Close ",
            Mode::ConfirmRemoval { .. } => " [y]Remove [n]Cancel ",
        };
        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, area);
    }
}

/// Prompt shown while a removal awaits confirmation
pub fn removal_prompt(name: &str) -> String {
    if name.is_empty() {
        REMOVAL_PROMPT.to_string()
    } else {
        format!("{REMOVAL_PROMPT} ({name})")
    }
}

/// Terminal-owning application
pub struct TuiApp {
    app: App,
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TuiApp {
    /// Create a new TUI application
    pub fn new(client: QueueClient) -> Result<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            app: App::new(client),
            terminal,
        })
    }

    /// Run the TUI event loop
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.app.drain();
            self.app.sync_route();
            self.redraw()?;

            if self.app.should_quit() {
                break;
            }

            // Handle events with timeout so polled snapshots show up
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(action) = self.app.handle_key(key.code) {
                            self.app.dispatch(action);
                        }
                    }
                }
            }

            // Let spawned mounts and commands run between key polls
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let state = self.app.render_state();
        self.terminal.draw(|frame| App::draw(frame, &state))?;
        Ok(())
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
