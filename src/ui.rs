use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use expense_tracker::{
    AddExpenseForm, AmountTier, ExpenseStore, FormError, FormField, KeyValueStore, Record,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Expenses,
    AddExpense,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Expenses => "iExpense",
            Page::AddExpense => "Add new expense",
        }
    }
}

pub struct App<S: KeyValueStore> {
    pub store: ExpenseStore<S>,
    pub state: TableState,
    pub current_page: Page,
    pub form: AddExpenseForm,
    pub alert: Option<FormError>,
    pub status: Option<String>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(store: ExpenseStore<S>) -> Self {
        let mut state = TableState::default();
        if !store.is_empty() {
            state.select(Some(0));
        }

        Self {
            store,
            state,
            current_page: Page::Expenses,
            form: AddExpenseForm::new(),
            alert: None,
            status: None,
        }
    }

    pub fn selected_expense(&self) -> Option<&Record> {
        self.state.selected().and_then(|i| self.store.get(i))
    }

    pub fn open_form(&mut self) {
        self.form = AddExpenseForm::new();
        self.alert = None;
        self.current_page = Page::AddExpense;
    }

    pub fn close_form(&mut self) {
        self.alert = None;
        self.current_page = Page::Expenses;
    }

    /// Save the form; an invalid amount keeps the form open with an alert
    pub fn submit_form(&mut self) {
        match self.form.submit() {
            Ok(record) => {
                if let Err(err) = self.store.append(record) {
                    self.status = Some(err.to_string());
                }
                self.state.select(Some(self.store.len() - 1));
                self.close_form();
            }
            Err(err) => self.alert = Some(err),
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(i) = self.state.selected() else {
            return;
        };

        if let Err(err) = self.store.remove_at([i]) {
            self.status = Some(err.to_string());
        }

        let len = self.store.len();
        if len == 0 {
            self.state.select(None);
        } else if i >= len {
            self.state.select(Some(len - 1));
        }
    }

    pub fn next(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Returns false when the app should quit
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.alert.is_some() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                self.alert = None;
            }
            return true;
        }

        match self.current_page {
            Page::Expenses => match code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Char('a') | KeyCode::Char('+') => self.open_form(),
                KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
                KeyCode::Down | KeyCode::Char('j') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => self.previous(),
                KeyCode::Home => {
                    if !self.store.is_empty() {
                        self.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !self.store.is_empty() {
                        self.state.select(Some(self.store.len() - 1));
                    }
                }
                _ => {}
            },
            Page::AddExpense => match code {
                KeyCode::Esc => self.close_form(),
                KeyCode::Enter => self.submit_form(),
                KeyCode::BackTab => self.form.focus = self.form.focus.previous(),
                KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
                    self.form.focus = self.form.focus.previous()
                }
                KeyCode::Tab | KeyCode::Down => self.form.focus = self.form.focus.next(),
                KeyCode::Up => self.form.focus = self.form.focus.previous(),
                KeyCode::Left if self.form.focus == FormField::Category => {
                    self.form.previous_category()
                }
                KeyCode::Right | KeyCode::Char(' ') if self.form.focus == FormField::Category => {
                    self.form.next_category()
                }
                KeyCode::Backspace => self.form.pop_char(),
                KeyCode::Char(c) => self.form.push_char(c),
                _ => {}
            },
        }

        true
    }
}

pub fn run_ui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
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
        tracing::error!("terminal UI failed: {err}");
        return Err(err.into());
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code, key.modifiers) {
                return Ok(());
            }
        }
    }
}

fn ui<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Expense list
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_table(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);

    if app.current_page == Page::AddExpense {
        let area = centered_rect(60, 12, f.size());
        render_form(f, area, app);

        if let Some(alert) = &app.alert {
            let alert_area = centered_rect(50, 9, f.size());
            render_alert(f, alert_area, alert);
        }
    }
}

fn render_header<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let spans = vec![
        Span::styled(
            Page::Expenses.title(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Expenses: {}", app.store.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Total: ${}", app.store.total()),
            Style::default().fg(Color::Cyan),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

pub fn amount_style(amount: i64) -> Style {
    match AmountTier::of(amount) {
        AmountTier::Low => Style::default(),
        AmountTier::Medium => Style::default().fg(Color::Green),
        AmountTier::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn render_table<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["Name", "Type", "Amount"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.store.items().iter().map(|record| {
        let cells = vec![
            Cell::from(truncate(&record.name, 38)),
            Cell::from(truncate(&record.category, 18)),
            Cell::from(format!("${}", record.amount)).style(amount_style(record.amount)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(40),
            Constraint::Length(20),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_form<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let form = &app.form;
    let label = |field: FormField, text: &'static str| {
        let style = if form.focus == field {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Span::styled(text, style)
    };

    let mut picker = vec![label(FormField::Category, "  Type:   ")];
    for (i, category) in expense_tracker::CATEGORIES.iter().enumerate() {
        if i > 0 {
            picker.push(Span::raw(" │ "));
        }
        let style = if *category == form.category {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        picker.push(Span::styled(format!(" {} ", category), style));
    }

    let content = vec![
        Line::from(""),
        Line::from(vec![label(FormField::Name, "  Name:   "), Span::raw(&form.name)]),
        Line::from(""),
        Line::from(picker),
        Line::from(""),
        Line::from(vec![
            label(FormField::Amount, "  Amount: "),
            Span::raw(&form.amount),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Enter save | Tab next field | ←/→ type | Esc cancel",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", Page::AddExpense.title())),
    );

    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

fn render_alert(f: &mut Frame, area: Rect, alert: &FormError) {
    let mut content = vec![Line::from("")];
    for line in wrap_text(&alert.to_string(), 44) {
        content.push(Line::from(format!("  {}", line)));
    }
    content.push(Line::from(""));
    content.push(Line::from(vec![Span::styled(
        "  Press Enter to continue",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(format!(" {} ", alert.title())),
    );

    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

fn render_status_bar<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.store.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(record) = app.selected_expense() {
        status_spans.push(Span::styled(
            truncate(&record.name, 20),
            Style::default().fg(Color::White),
        ));
    }

    if let Some(status) = &app.status {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(status.clone(), Style::default().fg(Color::Red)));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("a", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Add | "));
    status_spans.push(Span::styled("d", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Delete | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
        } else if current_line.len() + word.len() + 1 <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}
