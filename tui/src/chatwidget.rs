use std::cell::Cell;
use std::cell::RefCell;

use chatbot_core::config::Config;
use chatbot_core::conversation::apply_context_window_commit;
use chatbot_core::conversation::chat_body_for;
use chatbot_core::conversation::new_conversation;
use chatbot_ollama::OllamaClient;
use chatbot_ollama::handle_chat;
use chatbot_protocol::CommittedValue;
use chatbot_protocol::ContextWindowSizeError;
use chatbot_protocol::ConversationId;
use chatbot_protocol::chat::Message;
use chatbot_protocol::chat::Role;
use chatbot_protocol::conversation::Conversation;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;
use ratatui::buffer::Buffer;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Position;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::StatefulWidgetRef;
use ratatui::widgets::Widget;
use tokio_stream::StreamExt;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::bottom_pane::ContextWindowInput;
use crate::bottom_pane::InputState;
use crate::bottom_pane::TextArea;
use crate::bottom_pane::TextAreaState;
use crate::key_hint;
use crate::pointer::PointerListeners;
use crate::render::Insets;
use crate::render::RectExt;
use crate::render::renderable::Renderable;
use crate::tui::FrameRequester;

const MAX_COMPOSER_ROWS: u16 = 6;
const COMPOSER_PLACEHOLDER: &str = "Send a message";

/// Which input receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    Composer,
    ContextWindow,
}

pub(crate) struct ChatWidgetInit {
    pub(crate) config: Config,
    pub(crate) client: OllamaClient,
    pub(crate) app_event_tx: AppEventSender,
    pub(crate) frame_requester: FrameRequester,
    pub(crate) pointer_listeners: PointerListeners,
    /// Shown in the status line until the next message is sent.
    pub(crate) initial_status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Areas {
    settings: Rect,
    composer: Rect,
}

pub(crate) struct ChatWidget {
    config: Config,
    client: OllamaClient,
    app_event_tx: AppEventSender,
    frame_requester: FrameRequester,
    pointer_listeners: PointerListeners,
    conversation: Conversation,
    composer: TextArea,
    composer_state: RefCell<TextAreaState>,
    context_window: ContextWindowInput,
    context_window_error: Option<ContextWindowSizeError>,
    focus: Focus,
    /// Reply text received so far while a request is in flight.
    streaming: Option<String>,
    status: Option<String>,
    /// Where the clickable sections were last drawn.
    areas: Cell<Areas>,
}

impl ChatWidget {
    pub(crate) fn new(init: ChatWidgetInit) -> Self {
        let ChatWidgetInit {
            config,
            client,
            app_event_tx,
            frame_requester,
            pointer_listeners,
            initial_status,
        } = init;
        let conversation = new_conversation(&config);
        let context_window = ContextWindowInput::new(
            &conversation,
            config.context_window_presets.clone(),
            app_event_tx.clone(),
        );
        Self {
            config,
            client,
            app_event_tx,
            frame_requester,
            pointer_listeners,
            conversation,
            composer: TextArea::new(),
            composer_state: RefCell::new(TextAreaState::default()),
            context_window,
            context_window_error: None,
            focus: Focus::Composer,
            streaming: None,
            status: initial_status,
            areas: Cell::new(Areas::default()),
        }
    }

    pub(crate) fn conversation_id(&self) -> ConversationId {
        self.conversation.id
    }

    pub(crate) fn handle_key_event(&mut self, key_event: KeyEvent) {
        if key_event.kind == KeyEventKind::Release {
            return;
        }
        match key_event {
            KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => {
                self.app_event_tx.send(AppEvent::ExitRequest);
                return;
            }
            KeyEvent {
                code: KeyCode::Char('d'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } if self.focus == Focus::Composer && self.composer.is_empty() => {
                self.app_event_tx.send(AppEvent::ExitRequest);
                return;
            }
            KeyEvent {
                code: KeyCode::Char('o'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => {
                self.app_event_tx.send(AppEvent::NewConversation);
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::ContextWindow => {
                if !self.context_window.handle_key_event(key_event) {
                    // Enter, Tab, Shift+Tab and Esc leave the field.
                    self.set_focus(Focus::Composer);
                }
            }
            Focus::Composer => match key_event {
                KeyEvent {
                    code: KeyCode::Tab | KeyCode::BackTab,
                    ..
                } => self.set_focus(Focus::ContextWindow),
                KeyEvent {
                    code: KeyCode::Enter,
                    modifiers: KeyModifiers::NONE,
                    ..
                } => self.submit_message(),
                other => self.composer.input(other),
            },
        }
        self.frame_requester.schedule_frame();
    }

    pub(crate) fn handle_paste(&mut self, pasted: String) {
        match self.focus {
            Focus::ContextWindow => {
                self.context_window.handle_paste(pasted);
            }
            Focus::Composer => self.composer.insert_str(&pasted),
        }
        self.frame_requester.schedule_frame();
    }

    /// Returns `true` when the event was consumed by a widget. Unconsumed
    /// clicks are published to the pointer listeners by the caller.
    pub(crate) fn handle_mouse_event(&mut self, mouse: MouseEvent) -> bool {
        if self.context_window.handle_mouse_event(mouse) {
            self.frame_requester.schedule_frame();
            return true;
        }
        if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
            let position = Position::new(mouse.column, mouse.row);
            let areas = self.areas.get();
            if areas.settings.contains(position) {
                self.set_focus(Focus::ContextWindow);
            } else if areas.composer.contains(position) {
                self.set_focus(Focus::Composer);
            }
        }
        false
    }

    /// Deliver clicks published since the last call to the widgets holding a
    /// pointer subscription.
    pub(crate) fn poll_pointer_clicks(&mut self) {
        self.context_window.poll_pointer_clicks();
        self.frame_requester.schedule_frame();
    }

    fn set_focus(&mut self, focus: Focus) {
        if self.focus == focus {
            return;
        }
        self.focus = focus;
        match focus {
            Focus::ContextWindow => self.context_window.activate(&self.pointer_listeners),
            Focus::Composer => self.context_window.deactivate(),
        }
    }

    /// Parse a value reported by the context window input and store it on
    /// the conversation. Invalid text keeps the previous size.
    pub(crate) fn on_context_window_committed(&mut self, value: CommittedValue) {
        match apply_context_window_commit(&mut self.conversation, &value) {
            Ok(_) => self.context_window_error = None,
            Err(err) => self.context_window_error = Some(err),
        }
        self.frame_requester.schedule_frame();
    }

    pub(crate) fn new_conversation(&mut self) {
        tracing::info!("starting a new conversation");
        self.conversation = new_conversation(&self.config);
        self.context_window.sync_conversation(&self.conversation);
        self.context_window_error = None;
        self.streaming = None;
        self.status = None;
        self.frame_requester.schedule_frame();
    }

    fn submit_message(&mut self) {
        if self.streaming.is_some() {
            self.status = Some("Wait for the current reply to finish".to_string());
            return;
        }
        let text = self.composer.text().trim().to_string();
        if text.is_empty() {
            return;
        }
        self.composer.set_text("");
        self.status = None;
        self.conversation.messages.push(Message::user(text));
        self.streaming = Some(String::new());

        let body = chat_body_for(&self.conversation, self.config.keep_alive.clone());
        let conversation_id = self.conversation.id;
        let client = self.client.clone();
        let tx = self.app_event_tx.clone();
        tokio::spawn(async move {
            let mut stream = match handle_chat(&client, body).await {
                Ok(stream) => stream,
                Err(err) => {
                    tx.send(AppEvent::StreamFailed {
                        conversation_id,
                        message: err.to_string(),
                    });
                    return;
                }
            };
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(text) => tx.send(AppEvent::StreamChunk {
                        conversation_id,
                        text,
                    }),
                    Err(err) => {
                        tx.send(AppEvent::StreamFailed {
                            conversation_id,
                            message: err.to_string(),
                        });
                        return;
                    }
                }
            }
            tx.send(AppEvent::StreamFinished { conversation_id });
        });
    }

    pub(crate) fn on_stream_chunk(&mut self, conversation_id: ConversationId, text: &str) {
        if conversation_id != self.conversation.id {
            return;
        }
        if let Some(reply) = self.streaming.as_mut() {
            reply.push_str(text);
            self.frame_requester.schedule_frame();
        }
    }

    pub(crate) fn on_stream_finished(&mut self, conversation_id: ConversationId) {
        if conversation_id != self.conversation.id {
            return;
        }
        if let Some(reply) = self.streaming.take() {
            self.conversation.messages.push(Message::assistant(reply));
        }
        self.frame_requester.schedule_frame();
    }

    pub(crate) fn on_stream_failed(&mut self, conversation_id: ConversationId, message: String) {
        if conversation_id != self.conversation.id {
            return;
        }
        if let Some(reply) = self.streaming.take().filter(|reply| !reply.is_empty()) {
            self.conversation.messages.push(Message::assistant(reply));
        }
        self.status = Some(message);
        self.frame_requester.schedule_frame();
    }

    fn settings_height(&self, width: u16) -> u16 {
        let error_rows = u16::from(self.context_window_error.is_some());
        1u16.saturating_add(self.context_window.desired_height(width))
            .saturating_add(error_rows)
    }

    fn composer_height(&self, width: u16) -> u16 {
        self.composer
            .desired_height(width.saturating_sub(2))
            .clamp(1, MAX_COMPOSER_ROWS)
    }

    fn layout(&self, area: Rect) -> [Rect; 5] {
        Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(self.settings_height(area.width)),
            Constraint::Length(self.composer_height(area.width)),
            Constraint::Length(1),
        ])
        .areas(area)
    }

    fn transcript_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = usize::from(width.max(1));
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut push_message = |role: Role, content: &str| {
            let speaker = match role {
                Role::User => "you".cyan().bold(),
                Role::Assistant => "assistant".magenta().bold(),
            };
            lines.push(Line::from(speaker));
            for wrapped in content.lines().flat_map(|line| textwrap::wrap(line, width)) {
                lines.push(Line::from(wrapped.into_owned()));
            }
            lines.push(Line::default());
        };
        for message in &self.conversation.messages {
            push_message(message.role, &message.content);
        }
        if let Some(reply) = &self.streaming {
            let shown = if reply.is_empty() { "…" } else { reply.as_str() };
            push_message(Role::Assistant, shown);
        }
        lines
    }

    fn status_line(&self) -> Line<'static> {
        match (&self.status, &self.streaming) {
            (Some(status), _) => Line::from(status.clone().red()),
            (None, Some(_)) => Line::from("Generating…".dim()),
            (None, None) => Line::default(),
        }
    }

    fn footer_line(&self) -> Line<'static> {
        if self.focus == Focus::ContextWindow
            && self.context_window.state() == InputState::SuggestionsVisible
        {
            return Line::from(vec![
                key_hint::plain("↑/↓"),
                " choose  ".dim(),
                key_hint::plain("⏎"),
                " select  ".dim(),
                key_hint::plain("Esc"),
                " close".dim(),
            ]);
        }
        let spans: Vec<Span<'static>> = vec![
            key_hint::plain("⏎"),
            " send  ".dim(),
            key_hint::plain("⇥"),
            "/".dim(),
            key_hint::shift("⇥"),
            " switch field  ".dim(),
            key_hint::ctrl("O"),
            " new conversation  ".dim(),
            key_hint::ctrl("C"),
            " quit".dim(),
        ];
        Line::from(spans)
    }
}

impl Renderable for ChatWidget {
    fn desired_height(&self, width: u16) -> u16 {
        let transcript = u16::try_from(self.transcript_lines(width).len()).unwrap_or(u16::MAX);
        transcript
            .saturating_add(1)
            .saturating_add(self.settings_height(width))
            .saturating_add(self.composer_height(width))
            .saturating_add(1)
    }

    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let [_, _, settings, composer, _] = self.layout(area);
        match self.focus {
            Focus::ContextWindow => self
                .context_window
                .cursor_pos(settings.inset(Insets::tlbr(1, 0, 0, 0))),
            Focus::Composer => {
                let state = *self.composer_state.borrow();
                self.composer
                    .cursor_pos_with_state(composer.inset(Insets::tlbr(0, 2, 0, 0)), state)
            }
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let [transcript, status, settings, composer, footer] = self.layout(area);

        let transcript = transcript.inset(Insets::vh(0, 1));
        let lines = self.transcript_lines(transcript.width);
        let skip = lines.len().saturating_sub(usize::from(transcript.height));
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>()).render(transcript, buf);

        Paragraph::new(self.status_line()).render(status.inset(Insets::vh(0, 1)), buf);

        let header = Line::from(vec![
            "model ".dim(),
            self.conversation.model.name.clone().into(),
            "  temperature ".dim(),
            self.conversation.temperature.to_string().into(),
            "  context ".dim(),
            self.conversation
                .effective_context_window_size()
                .to_string()
                .into(),
        ]);
        Paragraph::new(header).render(Rect { height: 1, ..settings }, buf);
        let input_area = settings.inset(Insets::tlbr(1, 0, 0, 0));
        self.context_window.render(input_area, buf);
        if let Some(err) = &self.context_window_error {
            let y = input_area
                .y
                .saturating_add(self.context_window.desired_height(input_area.width));
            if y < settings.bottom() {
                Paragraph::new(Line::from(format!("  {err}").red())).render(
                    Rect {
                        y,
                        height: 1,
                        ..settings
                    },
                    buf,
                );
            }
        }

        let gutter = if self.focus == Focus::Composer {
            "›".cyan().bold()
        } else {
            "›".dim()
        };
        Paragraph::new(Line::from(gutter)).render(Rect { width: 2, ..composer }, buf);
        let text_area = composer.inset(Insets::tlbr(0, 2, 0, 0));
        if self.composer.is_empty() {
            Paragraph::new(Line::from(COMPOSER_PLACEHOLDER.dim())).render(text_area, buf);
        } else {
            let mut state = self.composer_state.borrow_mut();
            StatefulWidgetRef::render_ref(&(&self.composer), text_area, buf, &mut state);
        }

        Paragraph::new(self.footer_line()).render(footer.inset(Insets::vh(0, 1)), buf);

        self.areas.set(Areas { settings, composer });
    }
}
