//! The context window size field.
//!
//! A single line of text that is normally a number of tokens. Typing `/`
//! followed by word characters opens a list of presets; picking one replaces
//! the `/word` run. Presets containing `{{name}}` placeholders open a modal
//! that asks for each value before the text is committed.
//!
//! Every edit that leaves the field non-empty is reported to the owner as a
//! [`AppEvent::ContextWindowSizeCommitted`] with the raw text. Parsing and
//! validation happen on the receiving side.

use std::cell::Cell;
use std::cell::RefCell;

use chatbot_protocol::CommittedValue;
use chatbot_protocol::ContextWindowPreset;
use chatbot_protocol::ConversationId;
use chatbot_protocol::conversation::Conversation;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::widgets::StatefulWidgetRef;
use ratatui::widgets::Widget;
use ratatui::widgets::WidgetRef;

use super::suggestion_list::SuggestionEvent;
use super::suggestion_list::SuggestionList;
use super::template_args::placeholder_names;
use super::template_args::substitute_placeholders;
use super::textarea::TextArea;
use super::textarea::TextAreaState;
use super::value_editor::TriggeredPicker;
use super::value_editor::ValueEditor;
use super::variable_modal::ModalOutcome;
use super::variable_modal::VariableSubstitutionModal;
use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::pointer::PointerListeners;
use crate::pointer::PointerSubscription;
use crate::render::renderable::Renderable;

/// The editor grows with its wrapped content up to this many rows and scrolls
/// after that.
pub(crate) const MAX_INPUT_ROWS: u16 = 8;

const LABEL: &str = "Context window size";
const PLACEHOLDER: &str =
    "Enter a numerical context window size, or leave blank for default (2048)";
const GUTTER_WIDTH: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputState {
    Idle,
    SuggestionsVisible,
    ModalVisible,
}

/// A preset with placeholders that was selected and is waiting for values.
struct PendingTemplate {
    names: Vec<String>,
    modal: VariableSubstitutionModal,
}

pub(crate) struct ContextWindowInput {
    editor: TextArea,
    editor_state: RefCell<TextAreaState>,
    picker: TriggeredPicker<ContextWindowPreset>,
    pending: Option<PendingTemplate>,
    conversation_id: ConversationId,
    app_event_tx: AppEventSender,
    /// Held only while the field is active.
    pointer: Option<PointerSubscription>,
    /// Where the suggestion list was last drawn, if it was drawn.
    list_area: Cell<Option<Rect>>,
}

impl ContextWindowInput {
    pub(crate) fn new(
        conversation: &Conversation,
        presets: Vec<ContextWindowPreset>,
        app_event_tx: AppEventSender,
    ) -> Self {
        let mut input = Self {
            editor: TextArea::new(),
            editor_state: RefCell::new(TextAreaState::default()),
            picker: TriggeredPicker::new(presets),
            pending: None,
            conversation_id: conversation.id,
            app_event_tx,
            pointer: None,
            list_area: Cell::new(None),
        };
        input.reset_value(conversation);
        input
    }

    /// Reset the displayed value when the owner switched to a different
    /// conversation. Changes to the same conversation are ignored so the
    /// user's in-progress text is not overwritten by its own commits.
    pub(crate) fn sync_conversation(&mut self, conversation: &Conversation) {
        if conversation.id == self.conversation_id {
            return;
        }
        self.conversation_id = conversation.id;
        self.reset_value(conversation);
    }

    fn reset_value(&mut self, conversation: &Conversation) {
        let size = conversation.effective_context_window_size();
        self.editor.set_value(&size.to_string());
        *self.editor_state.borrow_mut() = TextAreaState::default();
        self.pending = None;
        self.picker.hide();
        self.list_area.set(None);
    }

    pub(crate) fn state(&self) -> InputState {
        if self.pending.is_some() {
            InputState::ModalVisible
        } else if self.picker.is_visible() {
            InputState::SuggestionsVisible
        } else {
            InputState::Idle
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn value(&self) -> &str {
        self.editor.value()
    }

    /// Start listening for outside clicks. Called when the field gains focus.
    pub(crate) fn activate(&mut self, listeners: &PointerListeners) {
        if self.pointer.is_none() {
            self.pointer = Some(listeners.subscribe());
        }
    }

    /// Release the click subscription, close the list and drop any pending
    /// template without committing.
    pub(crate) fn deactivate(&mut self) {
        self.pointer = None;
        self.picker.hide();
        self.list_area.set(None);
        if self.pending.take().is_some() {
            tracing::debug!("template input cancelled by focus change");
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.pointer.is_some()
    }

    /// Returns `true` when the key was consumed. `Enter`, `Tab`, `Shift+Tab`
    /// and `Esc` are left to the owner while no list or modal is open.
    pub(crate) fn handle_key_event(&mut self, key_event: KeyEvent) -> bool {
        if key_event.kind == KeyEventKind::Release {
            return false;
        }

        if let Some(pending) = self.pending.as_mut() {
            match pending.modal.handle_key_event(key_event) {
                ModalOutcome::Pending => {}
                ModalOutcome::Submitted(values) => self.submit_template(values),
                ModalOutcome::Cancelled => self.cancel_template(),
            }
            return true;
        }

        if self.picker.is_visible() {
            match key_event {
                KeyEvent {
                    code: KeyCode::Up, ..
                }
                | KeyEvent {
                    code: KeyCode::Char('p'),
                    modifiers: KeyModifiers::CONTROL,
                    ..
                } => {
                    self.picker.move_up();
                    return true;
                }
                KeyEvent {
                    code: KeyCode::Down,
                    ..
                }
                | KeyEvent {
                    code: KeyCode::Char('n'),
                    modifiers: KeyModifiers::CONTROL,
                    ..
                } => {
                    self.picker.move_down();
                    return true;
                }
                KeyEvent {
                    code: KeyCode::Enter | KeyCode::Tab,
                    modifiers: KeyModifiers::NONE,
                    ..
                } => {
                    if let Some(idx) = self.picker.selected_idx() {
                        self.select(idx);
                    }
                    return true;
                }
                KeyEvent {
                    code: KeyCode::Esc, ..
                } => {
                    self.picker.hide();
                    return true;
                }
                _ => {}
            }
        }

        match key_event.code {
            KeyCode::Enter | KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc => false,
            _ => {
                if self.editor.apply_key(key_event) {
                    self.on_edit();
                }
                true
            }
        }
    }

    pub(crate) fn handle_paste(&mut self, pasted: String) -> bool {
        if let Some(pending) = self.pending.as_mut() {
            return pending.modal.handle_paste(&pasted);
        }
        if self.editor.insert(&pasted) {
            self.on_edit();
            true
        } else {
            false
        }
    }

    /// Returns `true` when the event landed on the suggestion list and must
    /// not be treated as an outside click.
    pub(crate) fn handle_mouse_event(&mut self, mouse: MouseEvent) -> bool {
        if !self.picker.is_visible() {
            return false;
        }
        let Some(area) = self.list_area.get() else {
            return false;
        };
        let event = SuggestionList::new(
            self.picker.filtered(),
            self.picker.scroll_state(),
            self.picker.filter().unwrap_or_default(),
        )
        .handle_mouse_event(area, mouse);
        match event {
            Some(SuggestionEvent::Select(idx)) => {
                self.select(idx);
                true
            }
            Some(SuggestionEvent::Hover(idx)) => {
                self.picker.highlight(idx);
                true
            }
            None => area.contains(Position::new(mouse.column, mouse.row)),
        }
    }

    /// Apply clicks published since the last call. Any click outside the list
    /// closes it; the text is left untouched.
    pub(crate) fn poll_pointer_clicks(&mut self) {
        let Some(subscription) = self.pointer.as_mut() else {
            return;
        };
        let clicks = subscription.drain();
        if clicks.is_empty() || !self.picker.is_visible() {
            return;
        }
        let list_area = self.list_area.get();
        let outside = clicks.iter().any(|click| {
            !list_area.is_some_and(|area| area.contains(Position::new(click.column, click.row)))
        });
        if outside {
            tracing::debug!("click outside the suggestion list");
            self.picker.hide();
            self.list_area.set(None);
        }
    }

    fn on_edit(&mut self) {
        self.picker.on_text_change(self.editor.value());
        self.commit_current();
    }

    fn commit_current(&self) {
        let value = self.editor.value();
        if value.is_empty() {
            return;
        }
        self.app_event_tx
            .send(AppEvent::ContextWindowSizeCommitted(CommittedValue::new(value)));
    }

    /// Select the filtered candidate at `idx`.
    fn select(&mut self, idx: usize) {
        let Some((candidate, replaced)) = self.picker.accept(idx, self.editor.value()) else {
            return;
        };
        self.editor.set_value(&replaced);

        let template = candidate.to_string();
        let names = placeholder_names(&template);
        if names.is_empty() {
            self.commit_current();
            self.picker.hide();
            // The substituted text may itself end in a trigger.
            self.picker.on_text_change(self.editor.value());
        } else {
            tracing::debug!(%template, ?names, "opening template input");
            self.picker.hide();
            self.list_area.set(None);
            self.pending = Some(PendingTemplate {
                modal: VariableSubstitutionModal::new(template, names.clone()),
                names,
            });
        }
    }

    fn submit_template(&mut self, values: Vec<String>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let substituted = substitute_placeholders(self.editor.value(), &pending.names, &values);
        self.editor.set_value(&substituted);
        self.app_event_tx
            .send(AppEvent::ContextWindowSizeCommitted(CommittedValue::new(
                substituted,
            )));
    }

    fn cancel_template(&mut self) {
        self.pending = None;
    }

    fn input_height(&self, width: u16) -> u16 {
        self.editor
            .desired_height(width.saturating_sub(GUTTER_WIDTH))
            .clamp(1, MAX_INPUT_ROWS)
    }

    fn suggestion_list(&self) -> Option<SuggestionList<'_, ContextWindowPreset>> {
        self.picker.is_visible().then(|| {
            SuggestionList::new(
                self.picker.filtered(),
                self.picker.scroll_state(),
                self.picker.filter().unwrap_or_default(),
            )
        })
    }

    fn overlay_height(&self, width: u16) -> u16 {
        if let Some(pending) = &self.pending {
            pending.modal.desired_height(width)
        } else if let Some(list) = self.suggestion_list() {
            list.desired_height()
        } else {
            0
        }
    }

    fn editor_rect(&self, area: Rect) -> Rect {
        let height = self
            .input_height(area.width)
            .min(area.height.saturating_sub(1));
        Rect {
            x: area.x.saturating_add(GUTTER_WIDTH),
            y: area.y.saturating_add(1),
            width: area.width.saturating_sub(GUTTER_WIDTH),
            height,
        }
    }

    fn overlay_rect(&self, area: Rect) -> Rect {
        let editor = self.editor_rect(area);
        let y = editor.bottom();
        Rect {
            x: area.x,
            y,
            width: area.width,
            height: self
                .overlay_height(area.width)
                .min(area.bottom().saturating_sub(y)),
        }
    }
}

impl Renderable for ContextWindowInput {
    fn desired_height(&self, width: u16) -> u16 {
        1u16.saturating_add(self.input_height(width))
            .saturating_add(self.overlay_height(width))
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        if let Some(pending) = &self.pending {
            return pending.modal.cursor_pos(self.overlay_rect(area));
        }
        if !self.is_active() {
            return None;
        }
        let state = *self.editor_state.borrow();
        self.editor
            .cursor_pos_with_state(self.editor_rect(area), state)
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let label = if self.is_active() {
            LABEL.bold()
        } else {
            LABEL.into()
        };
        Paragraph::new(Line::from(label)).render(Rect { height: 1, ..area }, buf);

        let editor_rect = self.editor_rect(area);
        if editor_rect.height == 0 {
            return;
        }
        let gutter = if self.is_active() {
            "▌".cyan()
        } else {
            "▌".dim()
        };
        for y in editor_rect.top()..editor_rect.bottom() {
            Paragraph::new(Line::from(gutter.clone())).render(
                Rect {
                    x: area.x,
                    y,
                    width: GUTTER_WIDTH.min(area.width),
                    height: 1,
                },
                buf,
            );
        }
        if self.editor.is_empty() {
            Paragraph::new(Line::from(PLACEHOLDER.dim())).render(editor_rect, buf);
        } else {
            let mut state = self.editor_state.borrow_mut();
            StatefulWidgetRef::render_ref(&(&self.editor), editor_rect, buf, &mut state);
        }

        let overlay = self.overlay_rect(area);
        if let Some(pending) = &self.pending {
            pending.modal.render(overlay, buf);
            self.list_area.set(None);
        } else if let Some(list) = self.suggestion_list() {
            list.render_ref(overlay, buf);
            self.list_area.set(Some(overlay));
        } else {
            self.list_area.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerClick;
    use chatbot_protocol::ContextWindowSize;
    use chatbot_protocol::chat::OllamaModel;
    use crossterm::event::MouseButton;
    use crossterm::event::MouseEventKind;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::mpsc::unbounded_channel;

    fn conversation(size: Option<u64>) -> Conversation {
        let mut conversation = Conversation::new(OllamaModel::named("llama3"), "", 1.0);
        conversation.context_window_size = size.map(|tokens| {
            ContextWindowSize::new(tokens).unwrap_or_else(|err| panic!("bad size: {err}"))
        });
        conversation
    }

    fn sizes(tokens: &[u64]) -> Vec<ContextWindowPreset> {
        tokens
            .iter()
            .map(|t| ContextWindowPreset::Size(ContextWindowSize::new(*t).unwrap()))
            .collect()
    }

    fn input_with(
        presets: Vec<ContextWindowPreset>,
    ) -> (ContextWindowInput, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        let input = ContextWindowInput::new(&conversation(None), presets, AppEventSender::new(tx));
        (input, rx)
    }

    fn commits(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::ContextWindowSizeCommitted(value) = event {
                out.push(value.as_str().to_string());
            }
        }
        out
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut ContextWindowInput, s: &str) {
        for c in s.chars() {
            input.handle_key_event(key(KeyCode::Char(c)));
        }
    }

    fn clear(input: &mut ContextWindowInput) {
        input.handle_key_event(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
    }

    fn render(input: &ContextWindowInput, width: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, input.desired_height(width));
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf);
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn starts_from_conversation_or_default() {
        let (input, _rx) = input_with(sizes(&[2048]));
        assert_eq!(input.value(), "2048");
        assert_eq!(input.state(), InputState::Idle);

        let (tx, _rx) = unbounded_channel();
        let input = ContextWindowInput::new(
            &conversation(Some(8192)),
            Vec::new(),
            AppEventSender::new(tx),
        );
        assert_eq!(input.value(), "8192");
    }

    #[test]
    fn every_non_empty_edit_is_committed_raw() {
        let (mut input, mut rx) = input_with(sizes(&[2048]));
        clear(&mut input);
        assert_eq!(input.value(), "");
        type_str(&mut input, "4x");
        assert_eq!(commits(&mut rx), vec!["4", "4x"]);
    }

    #[test]
    fn slash_word_filters_candidates() {
        let (mut input, _rx) = input_with(sizes(&[2048, 2096, 4096]));
        clear(&mut input);
        type_str(&mut input, "/20");
        assert_eq!(input.state(), InputState::SuggestionsVisible);
        assert_eq!(input.picker.filtered(), &sizes(&[2048, 2096])[..]);
        assert_eq!(input.picker.selected_idx(), Some(0));

        type_str(&mut input, "9");
        assert_eq!(input.picker.filtered(), &sizes(&[2096])[..]);
        type_str(&mut input, "1");
        assert_eq!(input.state(), InputState::Idle);
    }

    #[test]
    fn selecting_a_size_replaces_the_trigger_and_commits() {
        let (mut input, mut rx) = input_with(sizes(&[8192, 16384]));
        clear(&mut input);
        type_str(&mut input, "please use /81");
        commits(&mut rx);

        assert!(input.handle_key_event(key(KeyCode::Enter)));
        assert_eq!(input.value(), "please use 8192");
        assert_eq!(commits(&mut rx), vec!["please use 8192"]);
        assert_eq!(input.state(), InputState::Idle);
    }

    #[test]
    fn keyboard_navigation_wraps_and_esc_closes() {
        let (mut input, _rx) = input_with(sizes(&[1024, 2048, 4096]));
        clear(&mut input);
        type_str(&mut input, "/");
        input.handle_key_event(key(KeyCode::Up));
        assert_eq!(input.picker.selected_idx(), Some(2));
        input.handle_key_event(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(input.picker.selected_idx(), Some(0));
        input.handle_key_event(key(KeyCode::Down));

        assert!(input.handle_key_event(key(KeyCode::Esc)));
        assert_eq!(input.state(), InputState::Idle);
        assert_eq!(input.value(), "/");
        // With the list closed, Esc belongs to the owner.
        assert!(!input.handle_key_event(key(KeyCode::Esc)));
    }

    #[test]
    fn template_preset_opens_modal_and_commits_substitution() {
        let (mut input, mut rx) = input_with(vec![ContextWindowPreset::Template(
            "{{rounds}}096".to_string(),
        )]);
        clear(&mut input);
        type_str(&mut input, "/r");
        commits(&mut rx);

        input.handle_key_event(key(KeyCode::Tab));
        assert_eq!(input.state(), InputState::ModalVisible);
        assert_eq!(input.value(), "{{rounds}}096");
        assert_eq!(
            input.pending.as_ref().map(|p| p.modal.names()),
            Some(vec!["rounds"])
        );
        assert_eq!(commits(&mut rx), Vec::<String>::new());

        type_str(&mut input, "3");
        input.handle_key_event(key(KeyCode::Enter));
        assert_eq!(input.state(), InputState::Idle);
        assert_eq!(input.value(), "3096");
        assert_eq!(commits(&mut rx), vec!["3096"]);
    }

    #[test]
    fn cancelling_the_modal_keeps_text_without_commit() {
        let (mut input, mut rx) = input_with(vec![ContextWindowPreset::Template(
            "{{k}}000".to_string(),
        )]);
        clear(&mut input);
        type_str(&mut input, "/");
        commits(&mut rx);
        input.handle_key_event(key(KeyCode::Enter));
        input.handle_key_event(key(KeyCode::Esc));
        assert_eq!(input.state(), InputState::Idle);
        assert_eq!(input.value(), "{{k}}000");
        assert_eq!(commits(&mut rx), Vec::<String>::new());
    }

    #[test]
    fn direct_selection_reruns_the_trigger_on_the_new_text() {
        let two_thousand = sizes(&[2048]).remove(0);
        let (mut input, mut rx) = input_with(vec![
            ContextWindowPreset::Template("8192/20".to_string()),
            two_thousand.clone(),
        ]);
        clear(&mut input);
        type_str(&mut input, "/8");
        commits(&mut rx);

        input.handle_key_event(key(KeyCode::Enter));
        assert_eq!(input.value(), "8192/20");
        assert_eq!(commits(&mut rx), vec!["8192/20".to_string()]);
        // The inserted text ends in "/20", which opens the list again.
        assert_eq!(input.state(), InputState::SuggestionsVisible);
        assert_eq!(
            input.picker.filtered(),
            &[
                ContextWindowPreset::Template("8192/20".to_string()),
                two_thousand,
            ]
        );
    }

    #[test]
    fn outside_click_closes_the_list_and_keeps_text() {
        let listeners = PointerListeners::new();
        let (mut input, _rx) = input_with(sizes(&[2048, 4096]));
        input.activate(&listeners);
        clear(&mut input);
        type_str(&mut input, "/");
        let lines = render(&input, 40);
        assert_eq!(lines[2], "  2048");
        assert_eq!(lines[3], "  4096");

        // Hovering a row highlights it and is consumed by the list.
        let on_row = MouseEvent {
            kind: MouseEventKind::Moved,
            column: 3,
            row: 3,
            modifiers: KeyModifiers::NONE,
        };
        assert!(input.handle_mouse_event(on_row));
        assert_eq!(input.picker.selected_idx(), Some(1));

        listeners.publish(PointerClick { column: 30, row: 0 });
        input.poll_pointer_clicks();
        assert_eq!(input.state(), InputState::Idle);
        assert_eq!(input.value(), "/");
    }

    #[test]
    fn clicking_a_row_selects_it() {
        let (mut input, mut rx) = input_with(sizes(&[2048, 4096]));
        clear(&mut input);
        type_str(&mut input, "/");
        render(&input, 40);
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 3,
            modifiers: KeyModifiers::NONE,
        };
        commits(&mut rx);
        assert!(input.handle_mouse_event(click));
        assert_eq!(input.value(), "4096");
        assert_eq!(commits(&mut rx), vec!["4096"]);
    }

    #[test]
    fn subscription_is_released_on_deactivate_and_drop() {
        let listeners = PointerListeners::new();
        let (mut input, _rx) = input_with(sizes(&[2048]));
        input.activate(&listeners);
        input.activate(&listeners);
        assert_eq!(listeners.listener_count(), 1);
        input.deactivate();
        assert_eq!(listeners.listener_count(), 0);

        input.activate(&listeners);
        drop(input);
        assert_eq!(listeners.listener_count(), 0);
    }

    #[test]
    fn new_conversation_resets_the_value() {
        let (mut input, _rx) = input_with(sizes(&[2048]));
        clear(&mut input);
        type_str(&mut input, "/2");
        assert_eq!(input.state(), InputState::SuggestionsVisible);

        let same = Conversation {
            id: input.conversation_id,
            ..conversation(Some(4096))
        };
        input.sync_conversation(&same);
        assert_eq!(input.value(), "/2");

        input.sync_conversation(&conversation(Some(4096)));
        assert_eq!(input.value(), "4096");
        assert_eq!(input.state(), InputState::Idle);
    }

    #[test]
    fn empty_field_shows_placeholder() {
        let (mut input, _rx) = input_with(Vec::new());
        clear(&mut input);
        let lines = render(&input, 80);
        assert_eq!(
            lines,
            vec![
                "Context window size".to_string(),
                format!("▌ {PLACEHOLDER}"),
            ]
        );
    }

    #[test]
    fn height_is_capped() {
        let (mut input, _rx) = input_with(Vec::new());
        clear(&mut input);
        input.handle_paste("1".repeat(200));
        assert_eq!(input.desired_height(12), 1 + MAX_INPUT_ROWS);
    }
}
