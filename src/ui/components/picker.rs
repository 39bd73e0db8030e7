use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// One selectable entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
  /// Returned to the parent on selection
  pub value: String,
  pub label: String,
}

impl PickerItem {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
    }
  }
}

/// Events emitted by the picker that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  /// Item selected (returns its value)
  Selected(String),
  Cancelled,
}

/// Centered single-choice overlay, used for categories and sort order
#[derive(Debug, Clone, Default)]
pub struct Picker {
  active: bool,
  items: Vec<PickerItem>,
  selected: usize,
  title: String,
}

impl Picker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker, preselecting the item whose value is `current`
  pub fn show(&mut self, title: impl Into<String>, items: Vec<PickerItem>, current: &str) {
    self.selected = items.iter().position(|i| i.value == current).unwrap_or(0);
    self.active = true;
    self.items = items;
    self.title = title.into();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.items.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.items.get(self.selected) {
          Some(item) => PickerEvent::Selected(item.value.clone()),
          None => PickerEvent::Cancelled,
        };
        self.hide();
        KeyResult::Event(event)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.items.is_empty() {
          self.selected = (self.selected + 1) % self.items.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.items.is_empty() {
          self.selected = if self.selected == 0 {
            self.items.len() - 1
          } else {
            self.selected - 1
          };
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active || self.items.is_empty() {
      return;
    }

    let max_label_len = self
      .items
      .iter()
      .map(|i| i.label.chars().count())
      .max()
      .unwrap_or(10)
      .max(self.title.chars().count() + 2);
    let width = (max_label_len as u16 + 6)
      .min(area.width.saturating_sub(4))
      .max(20)
      .min(area.width);
    let height = (self.items.len() as u16 + 2)
      .min(area.height.saturating_sub(4))
      .max(3)
      .min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = self
      .items
      .iter()
      .map(|item| ListItem::new(Span::styled(item.label.as_str(), Style::default().fg(Color::Cyan))))
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
