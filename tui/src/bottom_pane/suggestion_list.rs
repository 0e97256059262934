use std::fmt::Display;

use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ratatui::buffer::Buffer;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::widgets::WidgetRef;

use super::popup_consts::MAX_POPUP_ROWS;
use super::scroll_state::ScrollState;
use super::selection_popup_common::GenericDisplayRow;
use super::selection_popup_common::item_index_at_row;
use super::selection_popup_common::match_indices;
use super::selection_popup_common::render_rows_single_line;
use super::template_args::placeholder_names;
use crate::render::Insets;
use crate::render::RectExt;

/// What a pointer did to a row of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuggestionEvent {
    Select(usize),
    Hover(usize),
}

/// Presentation of the filtered candidates. Holds no state of its own: the
/// same candidates and scroll state always render the same rows.
pub(crate) struct SuggestionList<'a, T> {
    candidates: &'a [T],
    state: &'a ScrollState,
    filter: &'a str,
}

impl<'a, T: Display> SuggestionList<'a, T> {
    pub(crate) fn new(candidates: &'a [T], state: &'a ScrollState, filter: &'a str) -> Self {
        Self {
            candidates,
            state,
            filter,
        }
    }

    pub(crate) fn desired_height(&self) -> u16 {
        u16::try_from(MAX_POPUP_ROWS.min(self.candidates.len())).unwrap_or(u16::MAX)
    }

    /// Translate a pointer event inside `area` (where the list was last
    /// rendered) into a row event.
    pub(crate) fn handle_mouse_event(&self, area: Rect, mouse: MouseEvent) -> Option<SuggestionEvent> {
        if !area.contains(Position::new(mouse.column, mouse.row)) {
            return None;
        }
        let idx = item_index_at_row(
            area,
            self.candidates.len(),
            self.state,
            MAX_POPUP_ROWS,
            mouse.row,
        )?;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(SuggestionEvent::Select(idx)),
            MouseEventKind::Moved => Some(SuggestionEvent::Hover(idx)),
            _ => None,
        }
    }

    fn rows(&self) -> Vec<GenericDisplayRow> {
        self.candidates
            .iter()
            .map(|candidate| {
                let name = candidate.to_string();
                let placeholders = placeholder_names(&name);
                let description = (!placeholders.is_empty())
                    .then(|| format!("asks for {}", placeholders.join(", ")));
                GenericDisplayRow {
                    match_indices: match_indices(&name, self.filter),
                    name,
                    description,
                }
            })
            .collect()
    }
}

impl<T: Display> WidgetRef for SuggestionList<'_, T> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let rows = self.rows();
        render_rows_single_line(
            area.inset(Insets::tlbr(0, 2, 0, 0)),
            buf,
            &rows,
            self.state,
            MAX_POPUP_ROWS,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn render_lines(list: &SuggestionList<'_, String>, area: Rect) -> String {
        let mut buf = Buffer::empty(area);
        list.render_ref(area, &mut buf);
        (area.y..area.bottom())
            .map(|y| {
                (area.x..area.right())
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn identical_inputs_render_identically() {
        let candidates = vec!["2048".to_string(), "{{k}}000".to_string()];
        let state = ScrollState {
            selected_idx: Some(1),
            scroll_top: 0,
        };
        let list = SuggestionList::new(&candidates, &state, "");
        let area = Rect::new(0, 0, 30, list.desired_height());
        let first = render_lines(&list, area);
        assert_snapshot!("suggestion_list_template_highlighted", &first);
        assert_eq!(render_lines(&list, area), first);
    }

    #[test]
    fn pointer_events_map_to_rows() {
        let candidates: Vec<String> = (1..=10).map(|i| (i * 1024).to_string()).collect();
        let state = ScrollState {
            selected_idx: Some(9),
            scroll_top: 2,
        };
        let list = SuggestionList::new(&candidates, &state, "");
        assert_eq!(list.desired_height(), MAX_POPUP_ROWS as u16);
        let area = Rect::new(4, 10, 20, list.desired_height());

        // Rows 2..=9 are visible; the first visible row is index 2.
        assert_eq!(
            list.handle_mouse_event(area, mouse(MouseEventKind::Down(MouseButton::Left), 5, 10)),
            Some(SuggestionEvent::Select(2))
        );
        assert_eq!(
            list.handle_mouse_event(area, mouse(MouseEventKind::Moved, 23, 17)),
            Some(SuggestionEvent::Hover(9))
        );
        assert_eq!(
            list.handle_mouse_event(area, mouse(MouseEventKind::Down(MouseButton::Left), 3, 10)),
            None
        );
        assert_eq!(
            list.handle_mouse_event(area, mouse(MouseEventKind::Down(MouseButton::Right), 5, 10)),
            None
        );
    }
}
