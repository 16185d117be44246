//! ResultsGrid component — renders the per-date court grid and carries the
//! slot selection for the booking affordance.
//!
//! The grid itself is a pure function of the projected `DisplayModel`; the
//! component only adds a cursor over the bookable slot lines and a scroll
//! offset.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::render::{CellDisplay, DisplayModel};
use crate::theme::{
    style_default, style_focused_border, style_muted, style_secondary, style_selected,
    style_unfocused_border, C_ACCENT, C_OK,
};

pub struct ResultsGrid {
    /// Cursor into `DisplayModel::bookable_slots()` display order.
    selected: usize,
    scroll: usize,
}

impl ResultsGrid {
    pub fn new() -> Self {
        Self {
            selected: 0,
            scroll: 0,
        }
    }
}

impl Component for ResultsGrid {
    fn id(&self) -> ComponentId {
        ComponentId::ResultsGrid
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let slots = state.display.bookable_slots();
        if !slots.is_empty() {
            self.selected = self.selected.min(slots.len() - 1);
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < slots.len() {
                    self.selected += 1;
                }
                vec![]
            }
            KeyCode::Enter => match slots.get(self.selected) {
                Some(s) => vec![Action::Book {
                    date: s.date.clone(),
                    court: s.court.clone(),
                    slot: s.slot.clone(),
                }],
                None => vec![],
            },
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let border_style = if focused {
            style_focused_border()
        } else {
            style_unfocused_border()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled("results", style_secondary()));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let lines = build_lines(&state.display, self.selected, focused);
        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no results yet", style_muted())),
                inner,
            );
            return;
        }

        // Keep the selected slot line in view.
        let height = inner.height as usize;
        let cursor_line = selected_line_index(&state.display, self.selected);
        if let Some(cursor) = cursor_line {
            if cursor < self.scroll {
                self.scroll = cursor;
            } else if cursor >= self.scroll + height {
                self.scroll = cursor + 1 - height;
            }
        }
        self.scroll = self.scroll.min(lines.len().saturating_sub(height));

        let visible: Vec<Line> = lines.into_iter().skip(self.scroll).take(height).collect();
        frame.render_widget(Paragraph::new(visible), inner);
    }
}

/// All grid lines in display order.  Slot lines get a cursor highlight when
/// their flat index matches `selected`.
fn build_lines(display: &DisplayModel, selected: usize, focused: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut slot_idx = 0usize;
    for section in &display.sections {
        lines.push(Line::from(Span::styled(
            format!(" {}", section.date),
            style_default(),
        )));
        for cell in &section.cells {
            match &cell.display {
                CellDisplay::Slots(slots) => {
                    lines.push(Line::from(Span::styled(
                        format!("   Court {}", cell.court),
                        style_secondary(),
                    )));
                    for slot in slots {
                        let is_selected = focused && slot_idx == selected;
                        let style = if is_selected {
                            style_selected()
                        } else {
                            style_default()
                        };
                        let marker = if is_selected { "▶" } else { " " };
                        lines.push(Line::from(vec![
                            Span::styled(format!("    {marker} {slot}  "), style),
                            Span::styled("[book]", ratatui::style::Style::default().fg(C_OK)),
                        ]));
                        slot_idx += 1;
                    }
                }
                other => {
                    let style = match other {
                        CellDisplay::Error => ratatui::style::Style::default().fg(C_ACCENT),
                        _ => style_muted(),
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("   Court {}  ", cell.court), style_secondary()),
                        Span::styled(other.placeholder().unwrap_or("").to_string(), style),
                    ]));
                }
            }
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Line index of the `selected`-th slot line, for scroll tracking.
fn selected_line_index(display: &DisplayModel, selected: usize) -> Option<usize> {
    let mut line = 0usize;
    let mut slot_idx = 0usize;
    for section in &display.sections {
        line += 1; // date header
        for cell in &section.cells {
            match &cell.display {
                CellDisplay::Slots(slots) => {
                    line += 1; // court header
                    for _ in slots {
                        if slot_idx == selected {
                            return Some(line);
                        }
                        slot_idx += 1;
                        line += 1;
                    }
                }
                _ => line += 1,
            }
        }
        line += 1; // blank separator
    }
    None
}
