use std::io;
use std::time::Instant;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::DashboardConfig;
use crate::core::{
    format_count, parse_timestamp, DateRange, FilterCoordinator, FilterKey, Preset,
    RefreshCompletion, ToastBoard, Tone, KPI_TILES,
};
use crate::export::KpiExporter;

const EDITOR_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Which part of the dashboard receives arrow keys and Enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Filters,
    Presets,
    Chips,
    Tiles,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Filters => Focus::Presets,
            Focus::Presets => Focus::Chips,
            Focus::Chips => Focus::Tiles,
            Focus::Tiles => Focus::Filters,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Filters => Focus::Tiles,
            Focus::Presets => Focus::Filters,
            Focus::Chips => Focus::Presets,
            Focus::Tiles => Focus::Chips,
        }
    }
}

/// Inline from/to entry standing in for a calendar popover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEditor {
    pub key: FilterKey,
    pub from: String,
    pub to: String,
    pub editing_to: bool,
    pub error: Option<String>,
}

impl RangeEditor {
    pub fn open(key: FilterKey, current: &DateRange) -> Self {
        let fmt = |ts: Option<crate::core::Timestamp>| {
            ts.map(|ts| ts.format(EDITOR_FORMAT).to_string()).unwrap_or_default()
        };
        Self {
            key,
            from: fmt(current.from),
            to: fmt(current.to),
            editing_to: false,
            error: None,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        if self.editing_to {
            &mut self.to
        } else {
            &mut self.from
        }
    }

    pub fn push(&mut self, ch: char) {
        self.field_mut().push(ch);
        self.error = None;
    }

    pub fn pop(&mut self) {
        self.field_mut().pop();
        self.error = None;
    }

    pub fn toggle_field(&mut self) {
        self.editing_to = !self.editing_to;
    }

    /// Blank fields become open endpoints
    pub fn parse(&self) -> Result<DateRange, String> {
        let endpoint = |text: &str| {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                parse_timestamp(text).map(Some)
            }
        };
        Ok(DateRange::new(endpoint(&self.from)?, endpoint(&self.to)?))
    }
}

pub struct DashboardApp {
    pub coordinator: FilterCoordinator,
    completions: UnboundedReceiver<RefreshCompletion>,
    toasts: ToastBoard,
    exporter: KpiExporter,
    config: DashboardConfig,
    pub focus: Focus,
    pub cursor: usize,
    pub dialog_cursor: usize,
    pub editor: Option<RangeEditor>,
    pub show_help: bool,
    pub should_quit: bool,
    pub status: Option<String>,
    last_auto_refresh: Instant,
}

impl DashboardApp {
    /// `toasts` must be the notifier the coordinator was built with
    pub fn new(
        coordinator: FilterCoordinator,
        completions: UnboundedReceiver<RefreshCompletion>,
        toasts: ToastBoard,
        config: DashboardConfig,
    ) -> Self {
        let exporter = KpiExporter::new(&config.export.directory);
        Self {
            coordinator,
            completions,
            toasts,
            exporter,
            config,
            focus: Focus::Filters,
            cursor: 0,
            dialog_cursor: 0,
            editor: None,
            show_help: false,
            should_quit: false,
            status: None,
            last_auto_refresh: Instant::now(),
        }
    }

    /// Must run inside a tokio runtime context
    pub fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        // Initial load, silent like the periodic one
        self.coordinator.scheduled_refresh();

        loop {
            terminal.draw(|f| self.ui(f))?;

            self.drain_completions();
            self.maybe_auto_refresh();

            // Handle keyboard input
            if event::poll(self.config.ui.tick_rate())? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply every refresh that has finished since the last call
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.coordinator.on_refresh_complete(completion);
            applied += 1;
        }
        applied
    }

    fn maybe_auto_refresh(&mut self) {
        if let Some(interval) = self.config.refresh.auto_refresh_interval() {
            if self.last_auto_refresh.elapsed() >= interval {
                self.coordinator.scheduled_refresh();
                self.last_auto_refresh = Instant::now();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.editor.is_some() {
            self.handle_editor_key(key);
        } else if self.coordinator.pending_preset().is_some() {
            self.handle_dialog_key(key);
        } else if self.show_help {
            if matches!(key.code, KeyCode::Char('h') | KeyCode::Char('q') | KeyCode::Esc | KeyCode::F(1)) {
                self.show_help = false;
            }
        } else {
            self.handle_dashboard_key(key);
        }
    }

    fn section_len(&self) -> usize {
        match self.focus {
            Focus::Filters => FilterKey::ALL.len(),
            Focus::Presets => Preset::ALL.len(),
            Focus::Chips => self.coordinator.active_filters().len(),
            Focus::Tiles => KPI_TILES.len(),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('h') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Tab => {
                self.focus = self.focus.next();
                self.cursor = 0;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                self.cursor = 0;
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                let max = self.section_len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(max);
            }
            // Rows of the tile grid
            KeyCode::Up | KeyCode::Char('k') if self.focus == Focus::Tiles => {
                let per_row = self.config.ui.tiles_per_row.max(1);
                if self.cursor >= per_row {
                    self.cursor -= per_row;
                }
            }
            KeyCode::Down | KeyCode::Char('j') if self.focus == Focus::Tiles => {
                let per_row = self.config.ui.tiles_per_row.max(1);
                if self.cursor + per_row < KPI_TILES.len() {
                    self.cursor += per_row;
                }
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Char('r') => {
                self.coordinator.manual_refresh();
            }
            KeyCode::Char('x') => {
                if let Err(err) = self.coordinator.clear_all() {
                    self.status = Some(err.to_string());
                }
            }
            KeyCode::Char('e') => {
                let view = self.coordinator.metrics_view();
                match self.exporter.export_snapshot(self.coordinator.filters(), view.metrics.as_ref()) {
                    Ok(path) => self.status = Some(format!("Snapshot written to {}", path.display())),
                    Err(err) => self.status = Some(format!("Export failed: {:#}", err)),
                }
            }
            _ => {}
        }
    }

    fn activate(&mut self) {
        match self.focus {
            Focus::Filters => {
                if let Some(key) = FilterKey::ALL.get(self.cursor) {
                    self.editor = Some(RangeEditor::open(*key, self.coordinator.filters().get(*key)));
                }
            }
            Focus::Presets => {
                if let Some(preset) = Preset::ALL.get(self.cursor) {
                    match self.coordinator.on_preset_activated(*preset) {
                        Ok(()) => self.dialog_cursor = 0,
                        Err(err) => self.status = Some(err.to_string()),
                    }
                }
            }
            Focus::Chips => {
                let chips = self.coordinator.active_filters();
                if let Some(chip) = chips.get(self.cursor) {
                    if let Err(err) = self.coordinator.clear_filter(chip.key) {
                        self.status = Some(err.to_string());
                    }
                    self.cursor = 0;
                }
            }
            Focus::Tiles => {
                let Some(tile) = KPI_TILES.get(self.cursor) else {
                    return;
                };
                match self.coordinator.metrics_view().metrics {
                    Some(metrics) => match self.exporter.export_tile(tile, &metrics) {
                        Ok(path) => self.status = Some(format!("Downloaded {}", path.display())),
                        Err(err) => self.status = Some(format!("Download failed: {:#}", err)),
                    },
                    None => self.status = Some("No data loaded yet".to_string()),
                }
            }
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let choice = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.coordinator.on_dismiss();
                return;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.dialog_cursor = self.dialog_cursor.saturating_sub(1);
                return;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.dialog_cursor = (self.dialog_cursor + 1).min(FilterKey::ALL.len() - 1);
                return;
            }
            KeyCode::Enter => FilterKey::ALL.get(self.dialog_cursor).copied(),
            KeyCode::Char('1') | KeyCode::Char('v') => Some(FilterKey::Visit),
            KeyCode::Char('2') | KeyCode::Char('c') => Some(FilterKey::Created),
            KeyCode::Char('3') | KeyCode::Char('m') => Some(FilterKey::Modified),
            _ => None,
        };

        if let Some(target) = choice {
            if let Err(err) = self.coordinator.on_target_chosen(target) {
                self.status = Some(err.to_string());
            }
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.editor = None,
            KeyCode::Tab | KeyCode::BackTab => editor.toggle_field(),
            KeyCode::Backspace => editor.pop(),
            KeyCode::Delete => {
                editor.from.clear();
                editor.to.clear();
            }
            KeyCode::Char(ch) => editor.push(ch),
            KeyCode::Enter => match editor.parse() {
                Ok(range) => {
                    let key = editor.key;
                    match self.coordinator.on_range_picked(key, range) {
                        Ok(_) => self.editor = None,
                        Err(err) => editor.error = Some(err.to_string()),
                    }
                }
                Err(err) => editor.error = Some(err),
            },
            _ => {}
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        if self.show_help {
            self.render_help(f);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(4), // Filter pickers
                Constraint::Length(3), // Presets
                Constraint::Length(3), // Active filters
                Constraint::Min(8),    // KPI tiles
                Constraint::Length(3), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_filters(f, chunks[1]);
        self.render_presets(f, chunks[2]);
        self.render_chips(f, chunks[3]);
        self.render_tiles(f, chunks[4]);
        self.render_status(f, chunks[5]);

        if let Some(preset) = self.coordinator.pending_preset() {
            self.render_target_dialog(f, preset);
        }
        if let Some(editor) = &self.editor {
            self.render_editor(f, editor);
        }
        self.render_toasts(f);
    }

    fn focused_style(&self, focus: Focus, index: usize) -> Style {
        if self.focus == focus && self.cursor == index {
            Style::default().fg(Color::White).bg(Color::Rgb(0, 50, 100)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Rgb(200, 200, 200))
        }
    }

    fn section_block(&self, title: String, focus: Focus) -> Block<'static> {
        let border = if self.focus == focus {
            Color::Cyan
        } else {
            Color::Rgb(80, 80, 80)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title)
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let updated = self
            .coordinator
            .metrics_view()
            .last_updated
            .map(|ts| format!("Updated {}", ts.format("%H:%M:%S")))
            .unwrap_or_else(|| "Waiting for data".to_string());

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "Session Processing Summary",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  Live session status monitoring", Style::default().fg(Color::Rgb(150, 150, 150))),
            Span::styled(format!("  |  Home / Reports  |  {}", updated), Style::default().fg(Color::Rgb(120, 120, 120))),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 80))),
        );

        f.render_widget(header, area);
    }

    fn render_filters(&self, f: &mut Frame, area: Rect) {
        let title = if self.coordinator.filters().has_active_filters() {
            " Filter Data (x: Clear All) ".to_string()
        } else {
            " Filter Data ".to_string()
        };
        let block = self.section_block(title, Focus::Filters);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
            .split(inner);

        for (i, key) in FilterKey::ALL.iter().enumerate() {
            let range = self.coordinator.filters().get(*key);
            let value_style = if range.is_active() {
                self.focused_style(Focus::Filters, i).fg(Color::Cyan)
            } else {
                self.focused_style(Focus::Filters, i)
            };
            let cell = Paragraph::new(vec![
                Line::from(Span::styled(
                    key.label().to_uppercase(),
                    Style::default().fg(Color::Rgb(150, 150, 150)),
                )),
                Line::from(Span::styled(format!(" {} ", range.picker_text()), value_style)),
            ]);
            f.render_widget(cell, columns[i]);
        }
    }

    fn render_presets(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (i, preset) in Preset::ALL.iter().enumerate() {
            spans.push(Span::styled(format!(" {} ", preset.label()), self.focused_style(Focus::Presets, i)));
            spans.push(Span::raw(" "));
        }

        let presets = Paragraph::new(Line::from(spans))
            .block(self.section_block(" Quick Date Presets ".to_string(), Focus::Presets));
        f.render_widget(presets, area);
    }

    fn render_chips(&self, f: &mut Frame, area: Rect) {
        let chips = self.coordinator.active_filters();
        let line = if chips.is_empty() {
            Line::from(Span::styled("No active filters", Style::default().fg(Color::Gray)))
        } else {
            let mut spans = Vec::new();
            for (i, chip) in chips.iter().enumerate() {
                spans.push(Span::styled(
                    format!(" {}: {} ✕ ", chip.label, chip.range_text),
                    self.focused_style(Focus::Chips, i).fg(Color::Cyan),
                ));
            }
            Line::from(spans)
        };

        let chips = Paragraph::new(line)
            .block(self.section_block(" Active Filters ".to_string(), Focus::Chips));
        f.render_widget(chips, area);
    }

    fn render_tiles(&self, f: &mut Frame, area: Rect) {
        let per_row = self.config.ui.tiles_per_row.max(1);
        let rows = (KPI_TILES.len() + per_row - 1) / per_row;
        let view = self.coordinator.metrics_view();

        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints((0..rows).map(|_| Constraint::Ratio(1, rows as u32)).collect::<Vec<_>>())
            .split(area);

        for (row, row_area) in row_areas.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints((0..per_row).map(|_| Constraint::Ratio(1, per_row as u32)).collect::<Vec<_>>())
                .split(*row_area);

            for (col, cell) in cells.iter().enumerate() {
                let index = row * per_row + col;
                let Some(tile) = KPI_TILES.get(index) else {
                    break;
                };

                let (value, color) = match (&view.metrics, view.is_busy()) {
                    (_, true) => ("…".to_string(), Color::Rgb(120, 120, 120)),
                    (Some(metrics), false) => (format_count(tile.value(metrics)), tone_color(tile.tone(metrics))),
                    (None, false) => ("—".to_string(), Color::Rgb(120, 120, 120)),
                };

                let mut lines = vec![Line::from(Span::styled(
                    value,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))];
                if let Some(definition) = tile.definition {
                    lines.push(Line::from(Span::styled(definition, Style::default().fg(Color::Rgb(120, 120, 120)))));
                }

                let border = if self.focus == Focus::Tiles && self.cursor == index {
                    Color::Cyan
                } else {
                    Color::Rgb(80, 80, 80)
                };
                let widget = Paragraph::new(lines)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(border))
                            .title(format!(" {} ", tile.title.to_uppercase()))
                            .title_style(Style::default().fg(Color::Rgb(180, 180, 180))),
                    )
                    .wrap(Wrap { trim: true });
                f.render_widget(widget, *cell);
            }
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let view = self.coordinator.metrics_view();
        let activity = if view.is_refreshing() {
            "Refreshing..."
        } else if view.is_loading() {
            "Loading..."
        } else {
            "Idle"
        };

        let mut spans = vec![
            Span::styled(" Tab ", Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD)),
            Span::styled(" section  ", Style::default().fg(Color::Rgb(150, 150, 150))),
            Span::styled(" Enter ", Style::default().fg(Color::White).bg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled(" select  ", Style::default().fg(Color::Rgb(150, 150, 150))),
            Span::styled(" r ", Style::default().fg(Color::White).bg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::styled(" refresh  ", Style::default().fg(Color::Rgb(150, 150, 150))),
            Span::styled(" q ", Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(" quit  | ", Style::default().fg(Color::Rgb(150, 150, 150))),
            Span::styled(activity, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        ];
        if let Some(status) = &self.status {
            spans.push(Span::styled(format!(" | {}", status), Style::default().fg(Color::Yellow)));
        }

        let status = Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Rgb(80, 80, 80)))
                    .title(" Status ")
                    .title_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            )
            .alignment(Alignment::Center);

        f.render_widget(status, area);
    }

    fn render_target_dialog(&self, f: &mut Frame, preset: Preset) {
        let popup_area = self.centered_rect(50, 40, f.area());

        let mut lines = vec![
            Line::from(Span::styled(
                format!("Choose which filter to apply \"{}\" to:", preset.label()),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
        ];
        for (i, key) in FilterKey::ALL.iter().enumerate() {
            let style = if i == self.dialog_cursor {
                Style::default().fg(Color::White).bg(Color::Rgb(0, 50, 100)).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Rgb(200, 200, 200))
            };
            lines.push(Line::from(Span::styled(format!(" {}. {} ", i + 1, key.label()), style)));
            lines.push(Line::from(Span::styled(
                format!("    Apply to {} filter", key.label().to_lowercase()),
                Style::default().fg(Color::Rgb(120, 120, 120)),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Esc to cancel", Style::default().fg(Color::Gray))));

        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Select Filter Type ")
                    .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, popup_area);
        f.render_widget(dialog, popup_area);
    }

    fn render_editor(&self, f: &mut Frame, editor: &RangeEditor) {
        let popup_area = self.centered_rect(50, 30, f.area());
        let field_style = |active: bool| {
            if active {
                Style::default().fg(Color::White).bg(Color::Rgb(0, 50, 100))
            } else {
                Style::default().fg(Color::Rgb(200, 200, 200))
            }
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("From: ", Style::default().fg(Color::Rgb(150, 150, 150))),
                Span::styled(format!("{:<16}", editor.from), field_style(!editor.editing_to)),
            ]),
            Line::from(vec![
                Span::styled("To:   ", Style::default().fg(Color::Rgb(150, 150, 150))),
                Span::styled(format!("{:<16}", editor.to), field_style(editor.editing_to)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "YYYY-MM-DD [HH:MM]  Tab: switch  Del: clear  Enter: apply  Esc: cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        if let Some(error) = &editor.error {
            lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }

        let widget = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", editor.key.label()))
                    .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(Clear, popup_area);
        f.render_widget(widget, popup_area);
    }

    fn render_toasts(&self, f: &mut Frame) {
        let area = f.area();
        let width = 56.min(area.width);
        let height = 4;

        for (i, toast) in self.toasts.visible().iter().enumerate() {
            let y = area.y + 1 + (i as u16) * height;
            if y + height > area.bottom() {
                break;
            }
            let rect = Rect::new(area.right().saturating_sub(width + 1), y, width, height);
            let title_color = if toast.title == "Refresh Failed" {
                Color::Red
            } else {
                Color::Green
            };
            let widget = Paragraph::new(toast.body.clone())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(title_color))
                        .title(format!(" {} ", toast.title))
                        .title_style(Style::default().fg(title_color).add_modifier(Modifier::BOLD)),
                )
                .wrap(Wrap { trim: true });
            f.render_widget(Clear, rect);
            f.render_widget(widget, rect);
        }
    }

    fn render_help(&self, f: &mut Frame) {
        let popup_area = self.centered_rect(80, 60, f.area());
        let key_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);

        let help_text = vec![
            Line::from(vec![
                Span::styled("Session Processing Dashboard", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            ]),
            Line::from(""),
            Line::from("Keyboard Shortcuts:"),
            Line::from(""),
            Line::from(vec![Span::styled("  Tab        ", key_style), Span::raw("- Move between sections")]),
            Line::from(vec![Span::styled("  ←, →       ", key_style), Span::raw("- Move within a section")]),
            Line::from(vec![Span::styled("  ↑/k, ↓/j   ", key_style), Span::raw("- Move between tile rows")]),
            Line::from(vec![Span::styled("  Enter      ", key_style), Span::raw("- Edit filter / pick preset / clear chip / download tile")]),
            Line::from(vec![Span::styled("  r          ", key_style), Span::raw("- Refresh KPI data")]),
            Line::from(vec![Span::styled("  x          ", key_style), Span::raw("- Clear all filters")]),
            Line::from(vec![Span::styled("  e          ", key_style), Span::raw("- Export dashboard snapshot")]),
            Line::from(vec![Span::styled("  h, F1      ", key_style), Span::raw("- Show/hide this help")]),
            Line::from(vec![Span::styled("  q, Esc     ", key_style), Span::raw("- Quit")]),
            Line::from(""),
            Line::from("Only one date filter is active at a time. Applying a range or"),
            Line::from("preset to one filter clears the other two."),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .title_style(Style::default().fg(Color::Cyan))
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, popup_area);
        f.render_widget(paragraph, popup_area);
    }

    fn centered_rect(&self, percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Default => Color::Rgb(220, 220, 220),
        Tone::Success => Color::Green,
        Tone::Warning => Color::Rgb(255, 165, 0),
        Tone::Error => Color::Red,
        Tone::Info => Color::Blue,
    }
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}
