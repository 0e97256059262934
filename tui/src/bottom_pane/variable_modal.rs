//! Modal that collects one value per `{{name}}` placeholder of a preset.
//!
//! - Tab/Down and Shift+Tab/Up move between fields (wrapping).
//! - Enter advances to the next field; Enter on the last field submits.
//! - Esc cancels without producing values.
use std::cell::RefCell;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::StatefulWidgetRef;
use ratatui::widgets::Widget;

use super::popup_consts::standard_popup_hint_line;
use super::textarea::TextArea;
use super::textarea::TextAreaState;
use crate::render::renderable::Renderable;

/// Rows above the first field: title and a blank line.
const HEADER_ROWS: u16 = 2;
/// Each field is a label row followed by an input row.
const ROWS_PER_FIELD: u16 = 2;
/// Rows below the last field: a blank line and the hint.
const FOOTER_ROWS: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ModalOutcome {
    /// Still collecting values.
    Pending,
    /// One value per placeholder name, in order.
    Submitted(Vec<String>),
    Cancelled,
}

struct Field {
    name: String,
    textarea: TextArea,
    state: RefCell<TextAreaState>,
}

pub(crate) struct VariableSubstitutionModal {
    template: String,
    fields: Vec<Field>,
    focused: usize,
}

impl VariableSubstitutionModal {
    /// `names` must be non-empty and free of duplicates.
    pub(crate) fn new(template: String, names: Vec<String>) -> Self {
        let fields = names
            .into_iter()
            .map(|name| Field {
                name,
                textarea: TextArea::new(),
                state: RefCell::new(TextAreaState::default()),
            })
            .collect();
        Self {
            template,
            fields,
            focused: 0,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn focused(&self) -> usize {
        self.focused
    }

    pub(crate) fn handle_key_event(&mut self, key_event: KeyEvent) -> ModalOutcome {
        if key_event.kind == KeyEventKind::Release {
            return ModalOutcome::Pending;
        }
        match key_event {
            KeyEvent {
                code: KeyCode::Esc, ..
            } => return ModalOutcome::Cancelled,
            KeyEvent {
                code: KeyCode::Enter,
                ..
            } => {
                if self.focused + 1 >= self.fields.len() {
                    return ModalOutcome::Submitted(self.values());
                }
                self.focus_next();
            }
            KeyEvent {
                code: KeyCode::Tab,
                modifiers: KeyModifiers::NONE,
                ..
            }
            | KeyEvent {
                code: KeyCode::Down,
                ..
            } => self.focus_next(),
            KeyEvent {
                code: KeyCode::BackTab,
                ..
            }
            | KeyEvent {
                code: KeyCode::Tab,
                modifiers: KeyModifiers::SHIFT,
                ..
            }
            | KeyEvent {
                code: KeyCode::Up, ..
            } => self.focus_prev(),
            // Values are single-line.
            KeyEvent {
                code: KeyCode::Char('j' | 'm'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => {}
            other => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.textarea.input(other);
                }
            }
        }
        ModalOutcome::Pending
    }

    pub(crate) fn handle_paste(&mut self, pasted: &str) -> bool {
        let pasted = pasted.replace(['\r', '\n'], " ");
        if pasted.is_empty() {
            return false;
        }
        match self.fields.get_mut(self.focused) {
            Some(field) => {
                field.textarea.insert_str(&pasted);
                true
            }
            None => false,
        }
    }

    fn values(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.textarea.text().to_string())
            .collect()
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
        }
    }

    fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focused = self
                .focused
                .checked_sub(1)
                .unwrap_or(self.fields.len() - 1);
        }
    }

    fn input_rect(area: Rect, idx: usize) -> Option<Rect> {
        let offset = u16::try_from(idx)
            .ok()?
            .checked_mul(ROWS_PER_FIELD)?
            .checked_add(HEADER_ROWS + 1)?;
        let y = area.y.checked_add(offset)?;
        if y >= area.bottom() || area.width <= 2 {
            return None;
        }
        Some(Rect {
            x: area.x + 2,
            y,
            width: area.width - 2,
            height: 1,
        })
    }
}

impl Renderable for VariableSubstitutionModal {
    fn desired_height(&self, _width: u16) -> u16 {
        let fields = u16::try_from(self.fields.len()).unwrap_or(u16::MAX);
        HEADER_ROWS
            .saturating_add(fields.saturating_mul(ROWS_PER_FIELD))
            .saturating_add(FOOTER_ROWS)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let field = self.fields.get(self.focused)?;
        let rect = Self::input_rect(area, self.focused)?;
        let state = *field.state.borrow();
        field.textarea.cursor_pos_with_state(rect, state)
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let title: Vec<Span<'static>> = vec![
            gutter(),
            "Fill in template values".bold(),
            "  ".into(),
            self.template.clone().dim(),
        ];
        Paragraph::new(Line::from(title)).render(Rect { height: 1, ..area }, buf);

        for (idx, field) in self.fields.iter().enumerate() {
            let Some(input_rect) = Self::input_rect(area, idx) else {
                break;
            };
            let label_rect = Rect {
                x: area.x,
                y: input_rect.y - 1,
                width: area.width,
                height: 1,
            };
            let label = if idx == self.focused {
                field.name.clone().cyan().bold()
            } else {
                field.name.clone().into()
            };
            Paragraph::new(Line::from(vec![gutter(), label])).render(label_rect, buf);
            Paragraph::new(Line::from(gutter())).render(
                Rect {
                    x: area.x,
                    width: 2,
                    ..input_rect
                },
                buf,
            );
            let mut state = field.state.borrow_mut();
            StatefulWidgetRef::render_ref(&(&field.textarea), input_rect, buf, &mut state);
        }

        let hint_y = area
            .y
            .saturating_add(self.desired_height(area.width).saturating_sub(1));
        if hint_y < area.bottom() {
            Paragraph::new(standard_popup_hint_line()).render(
                Rect {
                    y: hint_y,
                    height: 1,
                    ..area
                },
                buf,
            );
        }
    }
}

fn gutter() -> Span<'static> {
    "▌ ".cyan()
}
