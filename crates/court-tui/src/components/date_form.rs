//! DateForm component — start/end date entry and the submit control.
//!
//! Validation lives here, at the edge: Enter parses the fields through
//! `DateRange::parse` and emits either `Submit` (validated range) or
//! `ShowError`.  A range that fails validation never produces an action
//! that touches the network.  The whole form is inert while a job is busy,
//! which is what "submission control disabled" means in a TUI.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use court_proto::dates::{DateRange, DATE_FMT};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    style_focused_border, style_muted, style_secondary, style_unfocused_border, C_INPUT_FG,
};

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Start,
    End,
}

pub struct DateForm {
    start: Input,
    end: Input,
    field: Field,
}

impl DateForm {
    /// Both fields default to today, like the booking page.
    pub fn new() -> Self {
        let today = chrono::Local::now().date_naive().format(DATE_FMT).to_string();
        Self {
            start: Input::new(today.clone()),
            end: Input::new(today),
            field: Field::Start,
        }
    }

    pub fn set_dates(&mut self, start: &str, end: &str) {
        self.start = Input::new(start.to_string());
        self.end = Input::new(end.to_string());
    }

    fn active_input(&mut self) -> &mut Input {
        match self.field {
            Field::Start => &mut self.start,
            Field::End => &mut self.end,
        }
    }

    fn submit_action(&self) -> Action {
        match DateRange::parse(self.start.value(), Some(self.end.value())) {
            Ok(range) => Action::Submit(range),
            Err(e) => Action::ShowError(e.to_string()),
        }
    }
}

impl Component for DateForm {
    fn id(&self) -> ComponentId {
        ComponentId::DateForm
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        // Disabled for the whole Submitting ∪ Streaming span.
        if state.is_busy() {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => vec![self.submit_action()],
            KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    Field::Start => Field::End,
                    Field::End => Field::Start,
                };
                vec![]
            }
            _ => {
                self.active_input().handle_event(&Event::Key(key));
                vec![]
            }
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
            .title(Span::styled("check availability", style_secondary()));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let field_style = |f: Field| {
            if focused && self.field == f && !state.is_busy() {
                Style::default().fg(C_INPUT_FG)
            } else {
                style_secondary()
            }
        };
        let hint = if state.is_busy() {
            "checking — please wait"
        } else {
            "enter: check   up/down: field   max window 3 days"
        };
        let line = Line::from(vec![
            Span::styled(" start ", style_muted()),
            Span::styled(self.start.value().to_string(), field_style(Field::Start)),
            Span::styled("   end ", style_muted()),
            Span::styled(self.end.value().to_string(), field_style(Field::End)),
            Span::styled(format!("   {hint}"), style_muted()),
        ]);
        frame.render_widget(Paragraph::new(line), inner);

        // Place the terminal cursor inside the active field.
        if focused && !state.is_busy() {
            let (prefix, input) = match self.field {
                Field::Start => (" start ".len(), &self.start),
                Field::End => {
                    (" start ".len() + self.start.value().len() + "   end ".len(), &self.end)
                }
            };
            let x = inner.x + (prefix + input.visual_cursor()) as u16;
            frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
        }
    }
}
