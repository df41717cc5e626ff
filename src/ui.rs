use anyhow::Result;
use bank_atm::{
    AccountType, AtmController, AtmError, Bank, Notifier, RecordingNotifier, ViewChange, ViewState,
};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

/// Messages kept on screen
const SCREEN_LINES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Card number or PIN, depending on the view
    Keypad,
    DepositAmount,
    WithdrawAmount,
}

pub struct App {
    pub atm: AtmController,
    pub screen: Arc<RecordingNotifier>,
    pub input: String,
    pub mode: InputMode,
    pub status: Option<String>,
}

impl App {
    pub fn new(bank: Arc<Bank>, default_account_type: AccountType) -> Self {
        let screen = Arc::new(RecordingNotifier::new());
        let notifier: Arc<dyn Notifier> = screen.clone();
        let atm = AtmController::with_default_account_type(bank, notifier, default_account_type);

        Self {
            atm,
            screen,
            input: String::new(),
            mode: InputMode::Keypad,
            status: None,
        }
    }

    fn recent(&self) -> Vec<ViewChange> {
        self.screen.recent(SCREEN_LINES)
    }

    fn report(&mut self, result: Result<(), AtmError>) {
        self.status = match result {
            Ok(()) => None,
            // Already on screen through the notifier
            Err(AtmError::InsufficientFunds { .. }) | Err(AtmError::AuthenticationFailed(_)) => None,
            Err(err) => Some(err.to_string()),
        };
    }

    pub fn submit(&mut self) {
        let input = std::mem::take(&mut self.input);
        let mode = std::mem::replace(&mut self.mode, InputMode::Keypad);

        let result = match (self.atm.view(), mode) {
            (ViewState::Welcome, _) => self.atm.insert_card(input.trim()),
            (ViewState::CardInserted, _) => self.atm.enter_pin(input.trim()),
            (_, InputMode::DepositAmount) => parse_amount(&input).and_then(|a| self.atm.deposit(a).map(drop)),
            (_, InputMode::WithdrawAmount) => parse_amount(&input).and_then(|a| self.atm.withdraw(a).map(drop)),
            (_, InputMode::Keypad) => Ok(()),
        };
        self.report(result);
    }

    pub fn select(&mut self, account_type: AccountType) {
        let result = self.atm.select_account_type(account_type).map(drop);
        self.report(result);
    }

    pub fn see_balance(&mut self) {
        let result = self.atm.see_balance().map(drop);
        self.report(result);
    }

    pub fn start_amount(&mut self, mode: InputMode) {
        if self.atm.view().is_authenticated() {
            self.mode = mode;
            self.input.clear();
            self.status = None;
        }
    }

    pub fn eject(&mut self) {
        self.atm.reset();
        self.input.clear();
        self.mode = InputMode::Keypad;
        self.status = None;
    }
}

fn parse_amount(input: &str) -> Result<u64, AtmError> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|_| AtmError::InvalidAmount(format!("'{}' is not a whole amount", input.trim())))
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            let authenticated = app.atm.view().is_authenticated();
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
                KeyCode::Char(c) if c.is_ascii_digit() => app.input.push(c),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Enter => app.submit(),
                KeyCode::Char('c') if authenticated => app.select(AccountType::Checking),
                KeyCode::Char('s') if authenticated => app.select(AccountType::Savings),
                KeyCode::Char('b') if authenticated => app.see_balance(),
                KeyCode::Char('d') => app.start_amount(InputMode::DepositAmount),
                KeyCode::Char('w') => app.start_amount(InputMode::WithdrawAmount),
                KeyCode::Char('x') => app.eject(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with current view
            Constraint::Min(0),    // Screen messages
            Constraint::Length(3), // Input line
            Constraint::Length(3), // Key help / status
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_screen(f, chunks[1], app);
    render_input(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let session = app.atm.session();
    let mut spans = vec![
        Span::styled(
            app.atm.view().title(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if session.is_authenticated() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("Account: {}", session.account_type()),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" ATM "),
    );
    f.render_widget(header, area);
}

fn render_screen(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = app
        .recent()
        .iter()
        .map(|change| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", change.at.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(change.message()),
            ])
        })
        .collect();

    let screen = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Screen "));
    f.render_widget(screen, area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let (label, shown) = match (app.atm.view(), app.mode) {
        (ViewState::Welcome, _) => ("Card number", app.input.clone()),
        (ViewState::CardInserted, _) => ("PIN", "*".repeat(app.input.len())),
        (_, InputMode::DepositAmount) => ("Deposit amount", app.input.clone()),
        (_, InputMode::WithdrawAmount) => ("Withdraw amount", app.input.clone()),
        (_, InputMode::Keypad) => ("Input", app.input.clone()),
    };

    let input = Paragraph::new(Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Cyan)),
        Span::raw(shown),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(input, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.status {
        Some(message) => Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red))),
        None if app.atm.view().is_authenticated() => Line::from(
            "c checking | s savings | b balance | d deposit | w withdraw | x eject | q quit",
        ),
        None => Line::from("digits + Enter | x eject | q quit"),
    };

    let status = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}
