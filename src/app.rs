use crate::cache::{CacheSource, CacheStore};
use crate::catalog::stats::CatalogStats;
use crate::catalog::types::Product;
use crate::catalog::view::{summary, SortKey, ViewState};
use crate::config::Config;
use crate::controller::{CatalogController, FetcherFn};
use crate::event::{Event, EventHandler};
use crate::refresh::Timer;
use crate::ui;
use crate::ui::components::{
  CommandEvent, CommandInput, KeyResult, Picker, PickerEvent, PickerItem, SearchEvent, SearchInput,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Interval between redraw ticks
pub const TICK_RATE: Duration = Duration::from_millis(250);

/// Which list the picker overlay is choosing from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerKind {
  Category,
  Sort,
}

/// Main application state
pub struct App {
  config: Config,
  controller: CatalogController,

  /// Display list derived from the store for the current view
  visible: Vec<Product>,
  /// Stats over the display list, as in the exported page
  stats: CatalogStats,
  /// Revision and view the display list was derived from
  synced: Option<(u64, ViewState)>,
  list_state: ListState,

  search: SearchInput,
  search_timer: Timer,
  picker: Picker,
  picker_kind: Option<PickerKind>,
  command: CommandInput,

  events: mpsc::UnboundedSender<Event>,
  should_quit: bool,
}

impl App {
  pub fn new(
    config: Config,
    fetcher: FetcherFn,
    cache: CacheStore<Product>,
    events: mpsc::UnboundedSender<Event>,
  ) -> Self {
    let view = ViewState::with_sort(config.default_sort());
    let controller = CatalogController::new(fetcher, cache, &config.refresh, view, events.clone());

    Self {
      config,
      controller,
      visible: Vec::new(),
      stats: CatalogStats::default(),
      synced: None,
      list_state: ListState::default(),
      search: SearchInput::new(),
      search_timer: Timer::new(),
      picker: Picker::new(),
      picker_kind: None,
      command: CommandInput::new(),
      events,
      should_quit: false,
    }
  }

  pub async fn run(&mut self, mut events: EventHandler, force_refresh: bool) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop(&mut events, force_refresh).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, events: &mut EventHandler, force_refresh: bool) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    self.controller.start(force_refresh);
    self.sync_visible();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      } else {
        break;
      }
    }

    Ok(())
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {} // Redraw keeps countdowns and relative times current
      Event::Catalog(event) => self.controller.handle(event),
      Event::SearchSettled => {
        debug!(search = self.search.query(), "Applying search");
        self.controller.set_search(self.search.query());
      }
    }
    self.sync_visible();
  }

  /// Re-derive the display list when the catalog or the view changed.
  fn sync_visible(&mut self) {
    let key = (
      self.controller.revision(),
      self.controller.store().view().clone(),
    );
    if self.synced.as_ref() == Some(&key) {
      return;
    }

    let store = self.controller.store();
    self.visible = store.visible();
    self.stats = CatalogStats::compute(&self.visible);

    // A new view starts at the top; a data refresh keeps the cursor
    let view_changed = self.synced.as_ref().map(|(_, v)| v) != Some(&key.1);
    if view_changed {
      self.list_state.select(if self.visible.is_empty() { None } else { Some(0) });
    }
    self.synced = Some(key);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Overlays get the key first
    match self.picker.handle_key(key) {
      KeyResult::Event(event) => return self.on_picker(event),
      KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => return self.execute_command(&cmd),
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let current = self.controller.store().view().search.clone();
    match self.search.handle_key(key, &current) {
      KeyResult::Event(event) => return self.on_search(event),
      KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      // Also matches Ctrl-R
      KeyCode::Char('r') => self.controller.load(true),
      KeyCode::Char('c') => self.open_category_picker(),
      KeyCode::Char('s') => self.open_sort_picker(),
      KeyCode::Esc => self.clear_filters(),
      _ => {}
    }
  }

  fn on_search(&mut self, event: SearchEvent) {
    match event {
      SearchEvent::Changed(_) => {
        let events = self.events.clone();
        self
          .search_timer
          .schedule(self.config.refresh.search_debounce(), move || {
            let _ = events.send(Event::SearchSettled);
          });
      }
      SearchEvent::Submitted(query) => {
        self.search_timer.cancel();
        self.controller.set_search(query);
      }
      SearchEvent::Cancelled => {
        self.search_timer.cancel();
        self.controller.set_search(String::new());
      }
    }
  }

  fn on_picker(&mut self, event: PickerEvent) {
    let kind = self.picker_kind.take();
    if let PickerEvent::Selected(value) = event {
      match kind {
        Some(PickerKind::Category) => self.controller.set_category(value),
        Some(PickerKind::Sort) => self.controller.set_sort(SortKey::parse(&value)),
        None => {}
      }
    }
  }

  fn open_category_picker(&mut self) {
    let mut items = vec![PickerItem::new("", "All categories")];
    items.extend(
      self
        .controller
        .store()
        .categories()
        .into_iter()
        .map(|c| PickerItem::new(c.clone(), c)),
    );

    let current = self.controller.store().view().category.clone();
    self.picker.show("Category", items, &current);
    self.picker_kind = Some(PickerKind::Category);
  }

  fn open_sort_picker(&mut self) {
    let items = SortKey::ALL
      .iter()
      .map(|k| PickerItem::new(k.as_str(), k.label()))
      .collect();

    let current = self.controller.store().view().sort.as_str();
    self.picker.show("Sort by", items, current);
    self.picker_kind = Some(PickerKind::Sort);
  }

  fn clear_filters(&mut self) {
    self.search_timer.cancel();
    self.controller.clear_filters();
  }

  fn execute_command(&mut self, cmd: &str) {
    match cmd {
      "refresh" => self.controller.load(true),
      "categories" => self.open_category_picker(),
      "sort" => self.open_sort_picker(),
      "clear" => self.clear_filters(),
      "quit" => self.should_quit = true,
      other => debug!(command = other, "Unknown command"),
    }
  }

  // Accessors for UI rendering

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn controller(&self) -> &CatalogController {
    &self.controller
  }

  pub fn visible(&self) -> &[Product] {
    &self.visible
  }

  pub fn stats(&self) -> &CatalogStats {
    &self.stats
  }

  pub fn summary(&self) -> String {
    let store = self.controller.store();
    summary(self.visible.len(), store.products().len(), store.view())
  }

  pub fn from_cache(&self) -> bool {
    self.controller.store().source() == Some(CacheSource::Cache)
  }

  pub fn list_state_mut(&mut self) -> &mut ListState {
    &mut self.list_state
  }

  pub fn search(&self) -> &SearchInput {
    &self.search
  }

  pub fn picker(&self) -> &Picker {
    &self.picker
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  /// Key hints for the footer, depending on what has focus
  pub fn hints(&self) -> Vec<(&'static str, &'static str)> {
    if self.search.is_active() {
      vec![("Enter", "apply"), ("Esc", "clear search")]
    } else if self.command.is_active() {
      vec![("Tab", "next"), ("Enter", "run"), ("Esc", "cancel")]
    } else if self.picker.is_active() {
      vec![("j/k", "move"), ("Enter", "select"), ("Esc", "cancel")]
    } else {
      vec![
        ("j/k", "navigate"),
        ("/", "search"),
        ("c", "category"),
        ("s", "sort"),
        ("r", "refresh"),
        ("Esc", "clear"),
        (":", "command"),
        ("q", "quit"),
      ]
    }
  }
}
