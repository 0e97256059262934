use std::cell::Ref;
use std::cell::RefCell;
use std::ops::Range;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::StatefulWidgetRef;
use ratatui::widgets::WidgetRef;
use textwrap::Options;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::wrapping::wrap_ranges;

/// A soft-wrapping, multi-line text editor with emacs-style key bindings.
///
/// Cursor positions are byte offsets into `text` and always sit on a char
/// boundary.
#[derive(Debug, Default)]
pub(crate) struct TextArea {
    text: String,
    cursor_pos: usize,
    wrap_cache: RefCell<Option<WrapCache>>,
    preferred_col: Option<usize>,
}

#[derive(Debug, Clone)]
struct WrapCache {
    width: u16,
    lines: Vec<Range<usize>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextAreaState {
    /// Index into wrapped lines of the first visible line.
    scroll: u16,
}

impl TextArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole text and move the cursor to the end.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor_pos = self.text.len();
        self.wrap_cache.replace(None);
        self.preferred_col = None;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn cursor(&self) -> usize {
        self.cursor_pos
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor_pos = self.clamp_pos_to_char_boundary(pos);
        self.preferred_col = None;
    }

    pub fn insert_str(&mut self, text: &str) {
        self.insert_str_at(self.cursor_pos, text);
    }

    pub fn insert_str_at(&mut self, pos: usize, text: &str) {
        let pos = self.clamp_pos_to_char_boundary(pos);
        self.text.insert_str(pos, text);
        self.wrap_cache.replace(None);
        if pos <= self.cursor_pos {
            self.cursor_pos += text.len();
        }
        self.preferred_col = None;
    }

    pub fn replace_range(&mut self, range: Range<usize>, text: &str) {
        let start = self.clamp_pos_to_char_boundary(range.start);
        let end = self.clamp_pos_to_char_boundary(range.end.max(start));
        let removed_len = end - start;
        let inserted_len = text.len();
        self.text.replace_range(start..end, text);
        self.wrap_cache.replace(None);
        self.preferred_col = None;

        self.cursor_pos = if self.cursor_pos < start {
            self.cursor_pos
        } else if self.cursor_pos <= end {
            start + inserted_len
        } else {
            self.cursor_pos + inserted_len - removed_len
        };
    }

    pub fn desired_height(&self, width: u16) -> u16 {
        u16::try_from(self.wrapped_lines(width).len()).unwrap_or(u16::MAX)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        self.cursor_pos_with_state(area, TextAreaState::default())
    }

    /// Screen position of the cursor when rendered into `area` with `state`.
    pub fn cursor_pos_with_state(&self, area: Rect, state: TextAreaState) -> Option<(u16, u16)> {
        let lines = self.wrapped_lines(area.width);
        let effective_scroll = self.effective_scroll(area.height, &lines, state.scroll);
        let i = Self::wrapped_line_index_by_start(&lines, self.cursor_pos)?;
        let line_start = lines[i].start;
        let col = u16::try_from(self.text[line_start..self.cursor_pos].width()).unwrap_or(u16::MAX);
        let row = u16::try_from(i)
            .unwrap_or(u16::MAX)
            .saturating_sub(effective_scroll);
        Some((area.x.saturating_add(col), area.y.saturating_add(row)))
    }

    pub fn input(&mut self, event: KeyEvent) {
        if event.kind == KeyEventKind::Release {
            return;
        }
        match event {
            KeyEvent {
                code: KeyCode::Char(c),
                modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
                ..
            } => self.insert_str(&c.to_string()),
            KeyEvent {
                code: KeyCode::Char('j' | 'm'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }
            | KeyEvent {
                code: KeyCode::Enter,
                ..
            } => self.insert_str("\n"),
            KeyEvent {
                code: KeyCode::Backspace,
                modifiers: KeyModifiers::ALT,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('w'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.delete_backward_word(),
            KeyEvent {
                code: KeyCode::Backspace,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('h'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.delete_backward(1),
            KeyEvent {
                code: KeyCode::Delete,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('d'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.delete_forward(1),
            KeyEvent {
                code: KeyCode::Char('u'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.kill_to_beginning_of_line(),
            KeyEvent {
                code: KeyCode::Char('k'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.kill_to_end_of_line(),
            KeyEvent {
                code: KeyCode::Left,
                modifiers: KeyModifiers::ALT,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('b'),
                modifiers: KeyModifiers::ALT,
                ..
            } => self.set_cursor(self.beginning_of_previous_word()),
            KeyEvent {
                code: KeyCode::Right,
                modifiers: KeyModifiers::ALT,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('f'),
                modifiers: KeyModifiers::ALT,
                ..
            } => self.set_cursor(self.end_of_next_word()),
            KeyEvent {
                code: KeyCode::Left,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('b'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.move_cursor_left(),
            KeyEvent {
                code: KeyCode::Right,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('f'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.move_cursor_right(),
            KeyEvent {
                code: KeyCode::Up, ..
            } => self.move_cursor_by_visual_line(false),
            KeyEvent {
                code: KeyCode::Down,
                ..
            } => self.move_cursor_by_visual_line(true),
            KeyEvent {
                code: KeyCode::Home,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('a'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.set_cursor(self.beginning_of_line()),
            KeyEvent {
                code: KeyCode::End, ..
            }
            | KeyEvent {
                code: KeyCode::Char('e'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => self.set_cursor(self.end_of_line()),
            _ => {}
        }
    }

    fn delete_backward(&mut self, n: usize) {
        let mut start = self.cursor_pos;
        for _ in 0..n {
            start = self.prev_boundary(start);
        }
        if start < self.cursor_pos {
            self.replace_range(start..self.cursor_pos, "");
        }
    }

    fn delete_forward(&mut self, n: usize) {
        let mut end = self.cursor_pos;
        for _ in 0..n {
            end = self.next_boundary(end);
        }
        if end > self.cursor_pos {
            self.replace_range(self.cursor_pos..end, "");
        }
    }

    fn delete_backward_word(&mut self) {
        let start = self.beginning_of_previous_word();
        if start < self.cursor_pos {
            self.replace_range(start..self.cursor_pos, "");
        }
    }

    fn kill_to_beginning_of_line(&mut self) {
        let start = self.beginning_of_line();
        if start < self.cursor_pos {
            self.replace_range(start..self.cursor_pos, "");
        }
    }

    fn kill_to_end_of_line(&mut self) {
        let end = self.end_of_line();
        if end > self.cursor_pos {
            self.replace_range(self.cursor_pos..end, "");
        } else {
            // At a line break: join with the next line.
            self.delete_forward(1);
        }
    }

    fn move_cursor_left(&mut self) {
        self.set_cursor(self.prev_boundary(self.cursor_pos));
    }

    fn move_cursor_right(&mut self) {
        self.set_cursor(self.next_boundary(self.cursor_pos));
    }

    /// Move to the same column on the previous/next wrapped line, using the
    /// width of the last layout. Past the first or last line the cursor goes
    /// to the start or end of the text.
    fn move_cursor_by_visual_line(&mut self, down: bool) {
        let Some(width) = self.wrap_cache.borrow().as_ref().map(|cache| cache.width) else {
            let target = if down {
                self.end_of_line()
            } else {
                self.beginning_of_line()
            };
            self.set_cursor(target);
            return;
        };
        let lines = self.wrapped_lines(width).to_vec();
        let Some(idx) = Self::wrapped_line_index_by_start(&lines, self.cursor_pos) else {
            return;
        };
        let target = if down {
            Some(idx + 1).filter(|target| *target < lines.len())
        } else {
            idx.checked_sub(1)
        };
        let Some(target) = target else {
            self.set_cursor(if down { self.text.len() } else { 0 });
            return;
        };

        let col = self
            .preferred_col
            .unwrap_or_else(|| self.text[lines[idx].start..self.cursor_pos].width());
        let range = &lines[target];
        let line_end = range.end.saturating_sub(1).min(self.text.len());
        let mut pos = range.start;
        let mut used = 0usize;
        for (offset, ch) in self.text[range.start..line_end].char_indices() {
            let ch_width = ch.width().unwrap_or(0);
            if used + ch_width > col {
                break;
            }
            used += ch_width;
            pos = range.start + offset + ch.len_utf8();
        }
        self.cursor_pos = pos;
        self.preferred_col = Some(col);
    }

    fn beginning_of_line(&self) -> usize {
        self.text[..self.cursor_pos]
            .rfind('\n')
            .map_or(0, |idx| idx + 1)
    }

    fn end_of_line(&self) -> usize {
        self.text[self.cursor_pos..]
            .find('\n')
            .map_or(self.text.len(), |idx| self.cursor_pos + idx)
    }

    fn beginning_of_previous_word(&self) -> usize {
        let trimmed = self.text[..self.cursor_pos].trim_end_matches(char::is_whitespace);
        trimmed
            .char_indices()
            .rev()
            .find(|(_, ch)| ch.is_whitespace())
            .map_or(0, |(idx, ch)| idx + ch.len_utf8())
    }

    fn end_of_next_word(&self) -> usize {
        let suffix = &self.text[self.cursor_pos..];
        let rest = suffix.trim_start_matches(char::is_whitespace);
        let skipped = suffix.len() - rest.len();
        let word_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.cursor_pos + skipped + word_len
    }

    fn prev_boundary(&self, pos: usize) -> usize {
        self.text[..pos]
            .char_indices()
            .next_back()
            .map_or(0, |(idx, _)| idx)
    }

    fn next_boundary(&self, pos: usize) -> usize {
        self.text[pos..]
            .chars()
            .next()
            .map_or(pos, |ch| pos + ch.len_utf8())
    }

    fn clamp_pos_to_char_boundary(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    fn wrapped_lines(&self, width: u16) -> Ref<'_, [Range<usize>]> {
        {
            let mut cache = self.wrap_cache.borrow_mut();
            if cache.as_ref().is_none_or(|cache| cache.width != width) {
                let lines = wrap_ranges(
                    &self.text,
                    Options::new(usize::from(width.max(1)))
                        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit),
                );
                *cache = Some(WrapCache { width, lines });
            }
        }
        Ref::map(self.wrap_cache.borrow(), |cache| {
            cache.as_ref().map_or(&[][..], |cache| cache.lines.as_slice())
        })
    }

    fn wrapped_line_index_by_start(lines: &[Range<usize>], pos: usize) -> Option<usize> {
        lines
            .partition_point(|range| range.start <= pos)
            .checked_sub(1)
    }

    /// Scroll offset that keeps the cursor line inside a viewport of
    /// `area_height` rows, starting from the previous offset.
    fn effective_scroll(&self, area_height: u16, lines: &[Range<usize>], current_scroll: u16) -> u16 {
        let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        if area_height >= total {
            return 0;
        }
        let cursor_line = Self::wrapped_line_index_by_start(lines, self.cursor_pos)
            .and_then(|idx| u16::try_from(idx).ok())
            .unwrap_or(0);
        let max_scroll = total.saturating_sub(area_height);
        let mut scroll = current_scroll.min(max_scroll);
        if cursor_line < scroll {
            scroll = cursor_line;
        } else if cursor_line >= scroll.saturating_add(area_height) {
            scroll = cursor_line + 1 - area_height;
        }
        scroll
    }

    fn render_lines(&self, area: Rect, buf: &mut Buffer, lines: &[Range<usize>], visible: Range<usize>) {
        for (row, idx) in visible.enumerate() {
            let Some(range) = lines.get(idx) else {
                break;
            };
            let Ok(row) = u16::try_from(row) else {
                break;
            };
            if row >= area.height {
                break;
            }
            let end = range.end.saturating_sub(1).min(self.text.len());
            let text = &self.text[range.start..end];
            buf.set_stringn(
                area.x,
                area.y + row,
                text.trim_end_matches('\n'),
                usize::from(area.width),
                Style::default(),
            );
        }
    }
}

impl WidgetRef for &TextArea {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let lines = self.wrapped_lines(area.width);
        self.render_lines(area, buf, &lines, 0..lines.len());
    }
}

impl StatefulWidgetRef for &TextArea {
    type State = TextAreaState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let lines = self.wrapped_lines(area.width);
        let scroll = self.effective_scroll(area.height, &lines, state.scroll);
        state.scroll = scroll;
        let start = usize::from(scroll);
        let end = (start + usize::from(area.height)).min(lines.len());
        self.render_lines(area, buf, &lines, start..end);
    }
}
