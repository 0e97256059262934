//! The two capabilities the context window input is built from: a plain
//! editable value, and a `/`-triggered picker over a list of presets.

use std::fmt::Display;

use crossterm::event::KeyEvent;

use super::popup_consts::MAX_POPUP_ROWS;
use super::scroll_state::ScrollState;
use super::template_args::TriggerMatch;
use super::template_args::filter_candidates;
use super::template_args::replace_trigger;
use super::template_args::trigger_match;
use super::textarea::TextArea;

/// A single editable text value.
pub(crate) trait ValueEditor {
    fn value(&self) -> &str;

    /// Replace the value and put the cursor at its end.
    fn set_value(&mut self, value: &str);

    /// Apply a key press. Returns `true` when the value changed.
    fn apply_key(&mut self, key_event: KeyEvent) -> bool;

    /// Insert text at the cursor. Returns `true` when the value changed.
    fn insert(&mut self, text: &str) -> bool;
}

impl ValueEditor for TextArea {
    fn value(&self) -> &str {
        self.text()
    }

    fn set_value(&mut self, value: &str) {
        self.set_text(value);
    }

    fn apply_key(&mut self, key_event: KeyEvent) -> bool {
        let before = self.text().to_string();
        self.input(key_event);
        before != self.text()
    }

    fn insert(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.insert_str(text);
        true
    }
}

/// Trigger matching, filtering and selection over an ordered candidate list.
///
/// The picker never edits text itself; the owner feeds it the full value after
/// every change and asks it for the replacement when a candidate is chosen.
#[derive(Debug)]
pub(crate) struct TriggeredPicker<T> {
    candidates: Vec<T>,
    filtered: Vec<T>,
    trigger: Option<TriggerMatch>,
    visible: bool,
    state: ScrollState,
}

impl<T: Display + Clone> TriggeredPicker<T> {
    pub(crate) fn new(candidates: Vec<T>) -> Self {
        Self {
            candidates,
            filtered: Vec::new(),
            trigger: None,
            visible: false,
            state: ScrollState::new(),
        }
    }

    /// Recompute the trigger and the filtered candidates for `text`.
    ///
    /// The list shows when the text ends in a trigger and at least one
    /// candidate matches. A freshly shown list highlights its first row; a list
    /// that stays visible keeps its highlight, clamped to the new length.
    pub(crate) fn on_text_change(&mut self, text: &str) {
        let was_visible = self.visible;
        self.trigger = trigger_match(text);
        self.filtered = match &self.trigger {
            Some(trigger) => filter_candidates(&self.candidates, &trigger.filter),
            None => Vec::new(),
        };
        self.visible = self.trigger.is_some() && !self.filtered.is_empty();

        if !self.visible {
            self.state.reset();
            return;
        }
        if !was_visible {
            self.state.reset();
        }
        let len = self.filtered.len();
        self.state.clamp_selection(len);
        self.state.ensure_visible(len, MAX_POPUP_ROWS.min(len));
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hide the list without touching the trigger; the next text change
    /// decides whether it shows again.
    pub(crate) fn hide(&mut self) {
        self.visible = false;
        self.state.reset();
    }

    pub(crate) fn filtered(&self) -> &[T] {
        &self.filtered
    }

    pub(crate) fn filter(&self) -> Option<&str> {
        self.trigger.as_ref().map(|trigger| trigger.filter.as_str())
    }

    pub(crate) fn scroll_state(&self) -> &ScrollState {
        &self.state
    }

    pub(crate) fn selected_idx(&self) -> Option<usize> {
        if self.visible {
            self.state.selected_idx
        } else {
            None
        }
    }

    pub(crate) fn move_up(&mut self) {
        let len = self.filtered.len();
        self.state.move_up_wrap(len);
        self.state.ensure_visible(len, MAX_POPUP_ROWS.min(len));
    }

    pub(crate) fn move_down(&mut self) {
        let len = self.filtered.len();
        self.state.move_down_wrap(len);
        self.state.ensure_visible(len, MAX_POPUP_ROWS.min(len));
    }

    /// Highlight `idx` (an index into the filtered list) without selecting it.
    pub(crate) fn highlight(&mut self, idx: usize) {
        if idx < self.filtered.len() {
            self.state.selected_idx = Some(idx);
        }
    }

    /// The candidate at `idx` and `text` with its trailing trigger replaced by
    /// that candidate's string form.
    pub(crate) fn accept(&self, idx: usize, text: &str) -> Option<(T, String)> {
        let candidate = self.filtered.get(idx)?.clone();
        let replaced = replace_trigger(text, &candidate.to_string());
        Some((candidate, replaced))
    }
}
