use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use strum::IntoEnumIterator;
use tracing::info;

use crate::date::DateInput;
use crate::store::TaskStore;
use crate::task::{Priority, Task};
use crate::task_detail::{EditDraft, EditField, TaskDetailModel};
use crate::task_list::TaskListModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Title,
    DueDate,
}

/// The "new task" dialog. Submitting needs a non-blank title and a valid
/// eight-digit date.
#[derive(Debug, Clone)]
pub struct AddTaskForm {
    pub title: String,
    pub due: DateInput,
    pub field: AddField,
}

impl Default for AddTaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            due: DateInput::new(),
            field: AddField::Title,
        }
    }
}

impl AddTaskForm {
    pub fn can_submit(&self) -> bool {
        !self.title.trim().is_empty() && self.due.due_date().is_some()
    }

    /// Title and formatted due date, if the form can be submitted.
    pub fn submit(&self) -> Option<(String, String)> {
        if !self.title.trim().is_empty() {
            return self.due.due_date().map(|due| (self.title.clone(), due));
        }
        None
    }

    pub fn input(&mut self, c: char) {
        match self.field {
            AddField::Title => self.title.push(c),
            AddField::DueDate => {
                self.due.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.field {
            AddField::Title => {
                self.title.pop();
            }
            AddField::DueDate => {
                self.due.pop();
            }
        }
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            AddField::Title => AddField::DueDate,
            AddField::DueDate => AddField::Title,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Search,
    Status,
    Priority,
    Overdue,
}

impl FilterField {
    const ALL: [FilterField; 4] = [
        FilterField::Search,
        FilterField::Status,
        FilterField::Priority,
        FilterField::Overdue,
    ];

    fn step(self, forward: bool) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ALL.len();
        Self::ALL[if forward { (i + 1) % len } else { (i + len - 1) % len }]
    }
}

/// None -> Pending -> Completed -> None
pub fn cycle_status(status: Option<bool>) -> Option<bool> {
    match status {
        None => Some(false),
        Some(false) => Some(true),
        Some(true) => None,
    }
}

/// None -> LOW -> MEDIUM -> HIGH -> None
pub fn cycle_priority_filter(priority: Option<Priority>) -> Option<Priority> {
    let all: Vec<Priority> = Priority::iter().collect();
    match priority {
        None => all.first().copied(),
        Some(p) => all
            .iter()
            .position(|candidate| *candidate == p)
            .and_then(|i| all.get(i + 1).copied()),
    }
}

pub fn cycle_priority(priority: Priority, forward: bool) -> Priority {
    let all: Vec<Priority> = Priority::iter().collect();
    let i = all.iter().position(|p| *p == priority).unwrap_or(0);
    let len = all.len();
    all[if forward { (i + 1) % len } else { (i + len - 1) % len }]
}

pub enum Screen {
    TaskList,
    TaskDetail {
        id: i64,
        draft: Option<EditDraft>,
        field: EditField,
    },
}

pub enum Dialog {
    AddTask(AddTaskForm),
    Filters(FilterField),
    ConfirmDelete(Task),
}

pub struct App<S: TaskStore> {
    pub list: TaskListModel<S>,
    pub detail: TaskDetailModel<S>,
    pub screen: Screen,
    pub dialog: Option<Dialog>,
    pub should_quit: bool,
}

impl<S: TaskStore> App<S> {
    pub async fn new(store: S) -> Result<Self> {
        let list = TaskListModel::activate(store.clone())
            .await
            .context("loading tasks")?;
        Ok(Self {
            list,
            detail: TaskDetailModel::new(store),
            screen: Screen::TaskList,
            dialog: None,
            should_quit: false,
        })
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(dialog) = self.dialog.take() {
            self.dialog = self.handle_dialog_key(dialog, key);
            return Ok(());
        }
        match self.screen {
            Screen::TaskList => self.handle_list_key(key).await,
            Screen::TaskDetail { .. } => {
                self.handle_detail_key(key);
                Ok(())
            }
        }
    }

    async fn handle_list_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('a') => self.dialog = Some(Dialog::AddTask(AddTaskForm::default())),
            KeyCode::Char('f') => self.dialog = Some(Dialog::Filters(FilterField::Search)),
            KeyCode::Char('c') => self.list.clear_filters(),
            KeyCode::Up | KeyCode::Char('k') => self.list.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_next(),
            KeyCode::Char(' ') => {
                if let Some(task) = self.list.selected_task() {
                    self.list.toggle_completed(&task);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.list.selected_task() {
                    self.dialog = Some(Dialog::ConfirmDelete(task));
                }
            }
            KeyCode::Enter => {
                if let Some(task) = self.list.selected_task() {
                    self.open_detail(task.id).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn open_detail(&mut self, id: i64) -> Result<()> {
        self.screen = Screen::TaskDetail {
            id,
            draft: None,
            field: EditField::Title,
        };
        let loaded = self.detail.load(id).await?;
        if let Screen::TaskDetail { draft, .. } = &mut self.screen {
            *draft = loaded.as_ref().map(EditDraft::from_task);
        }
        Ok(())
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        let Screen::TaskDetail { draft, field, .. } = &mut self.screen else {
            return;
        };
        let Some(edit) = draft.as_mut() else {
            if key.code == KeyCode::Esc {
                self.screen = Screen::TaskList;
            }
            return;
        };

        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::TaskList;
            }
            KeyCode::Enter => {
                if let Some(task) = self.detail.task() {
                    if edit.can_save(&task) {
                        let updated = edit.apply(&task);
                        self.detail.save(updated);
                        self.screen = Screen::TaskList;
                    }
                }
            }
            KeyCode::Tab | KeyCode::Down => *field = field.next(),
            KeyCode::BackTab | KeyCode::Up => *field = field.previous(),
            KeyCode::Left if *field == EditField::Priority => {
                edit.priority = cycle_priority(edit.priority, false);
            }
            KeyCode::Right | KeyCode::Char(' ') if *field == EditField::Priority => {
                edit.priority = cycle_priority(edit.priority, true);
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if *field == EditField::Completed =>
            {
                edit.is_completed = !edit.is_completed;
            }
            KeyCode::Backspace => {
                if let Some(text) = edit.text_mut(*field) {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = edit.text_mut(*field) {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_dialog_key(&mut self, dialog: Dialog, key: KeyEvent) -> Option<Dialog> {
        match dialog {
            Dialog::AddTask(mut form) => match key.code {
                KeyCode::Esc => None,
                KeyCode::Enter => match form.submit() {
                    Some((title, due_date)) => {
                        self.list.add_task(title, due_date);
                        None
                    }
                    None => Some(Dialog::AddTask(form)),
                },
                KeyCode::Tab | KeyCode::BackTab => {
                    form.switch_field();
                    Some(Dialog::AddTask(form))
                }
                KeyCode::Backspace => {
                    form.backspace();
                    Some(Dialog::AddTask(form))
                }
                KeyCode::Char(c) => {
                    form.input(c);
                    Some(Dialog::AddTask(form))
                }
                _ => Some(Dialog::AddTask(form)),
            },
            Dialog::Filters(field) => self.handle_filter_key(field, key),
            Dialog::ConfirmDelete(task) => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.list.delete_task(task);
                    None
                }
                KeyCode::Char('n') | KeyCode::Esc => None,
                _ => Some(Dialog::ConfirmDelete(task)),
            },
        }
    }

    fn handle_filter_key(&mut self, field: FilterField, key: KeyEvent) -> Option<Dialog> {
        let filters = self.list.filters().clone();
        match (field, key.code) {
            (_, KeyCode::Esc | KeyCode::Enter) => return None,
            (_, KeyCode::Tab | KeyCode::Down) => return Some(Dialog::Filters(field.step(true))),
            (_, KeyCode::BackTab | KeyCode::Up) => {
                return Some(Dialog::Filters(field.step(false)))
            }
            (FilterField::Search, KeyCode::Backspace) => {
                let mut search = filters.search;
                search.pop();
                self.list.set_search(search);
            }
            (FilterField::Search, KeyCode::Char(c)) => {
                let mut search = filters.search;
                search.push(c);
                self.list.set_search(search);
            }
            (FilterField::Status, KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left) => {
                self.list.set_completed_filter(cycle_status(filters.completed));
            }
            (FilterField::Priority, KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left) => {
                self.list
                    .set_priority_filter(cycle_priority_filter(filters.priority));
            }
            (FilterField::Overdue, KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left) => {
                self.list.set_overdue(!filters.overdue);
            }
            _ => {}
        }
        Some(Dialog::Filters(field))
    }
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

pub fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")
}

pub async fn run<S: TaskStore>(store: S) -> Result<()> {
    let mut app = App::new(store).await?;
    let mut terminal = setup_terminal()?;

    let result = run_app(&mut terminal, &mut app).await;

    cleanup_terminal(&mut terminal)?;
    app.list.settle().await;
    app.detail.settle().await;
    info!("ui closed");
    result
}

pub async fn run_app<B: Backend, S: TaskStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        app.list.clamp_selection();
        terminal.draw(|f| render(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        let ready = tokio::task::spawn_blocking(|| event::poll(Duration::from_millis(100)))
            .await
            .context("Failed to join event polling task")??;
        if !ready {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key).await?;
            }
        }
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::DarkGray,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::Red,
    }
}

fn centered_rect(width_percent: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn field_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

pub fn render<S: TaskStore>(f: &mut Frame, app: &App<S>) {
    match &app.screen {
        Screen::TaskList => render_list(f, app),
        Screen::TaskDetail { draft, field, .. } => render_detail(f, draft.as_ref(), *field),
    }

    match &app.dialog {
        Some(Dialog::AddTask(form)) => render_add_dialog(f, form),
        Some(Dialog::Filters(field)) => render_filter_dialog(f, app, *field),
        Some(Dialog::ConfirmDelete(task)) => render_confirm_delete(f, task),
        None => {}
    }
}

fn render_list<S: TaskStore>(f: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let filters = app.list.filters();
    let tasks = app.list.tasks();

    let banner = if !tasks.is_empty() && filters.is_active() {
        format!("Active filters: {}", filters.active_labels().join(", "))
    } else {
        String::new()
    };
    f.render_widget(
        Paragraph::new(banner).style(Style::default().fg(Color::Cyan)),
        chunks[0],
    );

    let block = Block::default().title("Tasks").borders(Borders::ALL);
    if tasks.is_empty() {
        f.render_widget(
            Paragraph::new("No tasks yet. Press 'a' to add one.").block(block),
            chunks[1],
        );
    } else {
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|t| {
                let title_style = if t.is_completed {
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default().fg(Color::White)
                };
                let mut spans = vec![
                    Span::styled("▌", Style::default().fg(priority_color(t.priority))),
                    Span::raw(if t.is_completed { "[x] " } else { "[ ] " }),
                    Span::styled(t.title.as_str(), title_style),
                    Span::raw(format!(" (Due: {})", t.due_date)),
                ];
                if filters.overdue && t.is_overdue() {
                    spans.push(Span::styled(" OVERDUE", Style::default().fg(Color::Red)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(app.list.selected));
        f.render_stateful_widget(list, chunks[1], &mut state);
    }

    f.render_widget(
        Paragraph::new(
            "a add  f filters  c clear  space done  d delete  enter edit  q quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn render_detail(f: &mut Frame, draft: Option<&EditDraft>, active: EditField) {
    let block = Block::default().title("Edit task").borders(Borders::ALL);
    let Some(draft) = draft else {
        f.render_widget(
            Paragraph::new("Loading... (esc to go back)").block(block),
            f.area(),
        );
        return;
    };

    let lines: Vec<Line> = EditField::ALL
        .iter()
        .map(|field| {
            let value = match field {
                EditField::Title => draft.title.clone(),
                EditField::DueDate => draft.due_date.clone(),
                EditField::Priority => format!("< {} >", draft.priority),
                EditField::Category => draft.category.clone(),
                EditField::Notes => draft.notes.clone(),
                EditField::Completed => {
                    let mark = if draft.is_completed { "[x]" } else { "[ ]" };
                    mark.to_string()
                }
            };
            Line::from(vec![
                Span::styled(format!("{:>9}: ", field.label()), field_style(*field == active)),
                Span::raw(value),
            ])
        })
        .chain([
            Line::raw(""),
            Line::styled(
                "tab next field  space toggle  enter save  esc back",
                Style::default().fg(Color::DarkGray),
            ),
        ])
        .collect();

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        f.area(),
    );
}

fn render_add_dialog(f: &mut Frame, form: &AddTaskForm) {
    let area = centered_rect(60, 7, f.area());
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Title:    ", field_style(form.field == AddField::Title)),
            Span::raw(form.title.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Due Date: ", field_style(form.field == AddField::DueDate)),
            Span::raw(form.due.display()),
        ]),
    ];
    if form.due.is_invalid() {
        lines.push(Line::styled("Invalid date", Style::default().fg(Color::Red)));
    } else {
        lines.push(Line::raw(""));
    }
    let hint = if form.can_submit() {
        "enter add  tab switch  esc cancel"
    } else {
        "tab switch  esc cancel"
    };
    lines.push(Line::styled(hint, Style::default().fg(Color::DarkGray)));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().title("New task").borders(Borders::ALL)),
        area,
    );
}

fn render_filter_dialog<S: TaskStore>(f: &mut Frame, app: &App<S>, active: FilterField) {
    let filters = app.list.filters();
    let area = centered_rect(60, 8, f.area());
    let status = match filters.completed {
        None => "All",
        Some(false) => "Pending",
        Some(true) => "Completed",
    };
    let priority = filters
        .priority
        .map_or_else(|| "Any".to_string(), |p| p.to_string());
    let row = |field: FilterField, label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, field_style(field == active)),
            Span::raw(value),
        ])
    };
    let lines = vec![
        row(FilterField::Search, "Search:   ", filters.search.clone()),
        row(FilterField::Status, "Status:   ", format!("< {status} >")),
        row(FilterField::Priority, "Priority: ", format!("< {priority} >")),
        row(
            FilterField::Overdue,
            "Overdue:  ",
            if filters.overdue { "[x]" } else { "[ ]" }.to_string(),
        ),
        Line::raw(""),
        Line::styled(
            "tab next  space change  enter close",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().title("Filters").borders(Borders::ALL)),
        area,
    );
}

fn render_confirm_delete(f: &mut Frame, task: &Task) {
    let area = centered_rect(50, 4, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::raw(format!("Delete \"{}\"?", task.title)),
            Line::styled("y yes  n no", Style::default().fg(Color::DarkGray)),
        ])
        .block(Block::default().title("Delete task").borders(Borders::ALL)),
        area,
    );
}
