use chatbot_core::config::Config;
use chatbot_ollama::OllamaClient;
use chatbot_protocol::ConversationId;
use color_eyre::eyre::Result;
use crossterm::event::MouseButton;
use crossterm::event::MouseEventKind;
use tokio::select;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::StreamExt;

use crate::app_event::AppEvent;
use crate::app_event_sender::AppEventSender;
use crate::chatwidget::ChatWidget;
use crate::chatwidget::ChatWidgetInit;
use crate::pointer::PointerClick;
use crate::pointer::PointerListeners;
use crate::render::renderable::Renderable;
use crate::tui;
use crate::tui::TuiEvent;

#[derive(Debug, Clone)]
pub struct AppExitInfo {
    /// The conversation that was open when the app exited.
    pub conversation_id: Option<ConversationId>,
}

pub(crate) struct App {
    chat_widget: ChatWidget,
    /// Receives clicks that no widget consumed.
    pointer_listeners: PointerListeners,
}

impl App {
    pub async fn run(
        tui: &mut tui::Tui,
        config: Config,
        client: OllamaClient,
        initial_status: Option<String>,
    ) -> Result<AppExitInfo> {
        let (app_event_tx, mut app_event_rx) = unbounded_channel();
        let app_event_tx = AppEventSender::new(app_event_tx);
        let pointer_listeners = PointerListeners::new();

        let chat_widget = ChatWidget::new(ChatWidgetInit {
            config,
            client,
            app_event_tx,
            frame_requester: tui.frame_requester(),
            pointer_listeners: pointer_listeners.clone(),
            initial_status,
        });
        let mut app = Self {
            chat_widget,
            pointer_listeners,
        };

        let tui_events = tui.event_stream();
        tokio::pin!(tui_events);

        tui.frame_requester().schedule_frame();

        while select! {
            Some(event) = app_event_rx.recv() => {
                app.handle_event(event)
            }
            Some(event) = tui_events.next() => {
                app.handle_tui_event(tui, event)?
            }
        } {}
        tui.terminal.clear()?;
        Ok(AppExitInfo {
            conversation_id: Some(app.chat_widget.conversation_id()),
        })
    }

    pub(crate) fn handle_tui_event(&mut self, tui: &mut tui::Tui, event: TuiEvent) -> Result<bool> {
        match event {
            TuiEvent::Key(key_event) => {
                self.chat_widget.handle_key_event(key_event);
            }
            TuiEvent::Paste(pasted) => {
                // Many terminals convert newlines to \r when pasting.
                let pasted = pasted.replace("\r", "\n");
                self.chat_widget.handle_paste(pasted);
            }
            TuiEvent::Mouse(mouse_event) => {
                let consumed = self.chat_widget.handle_mouse_event(mouse_event);
                if !consumed && mouse_event.kind == MouseEventKind::Down(MouseButton::Left) {
                    self.pointer_listeners.publish(PointerClick {
                        column: mouse_event.column,
                        row: mouse_event.row,
                    });
                    self.chat_widget.poll_pointer_clicks();
                }
            }
            TuiEvent::Draw => {
                tui.draw(|frame| {
                    let area = frame.area();
                    self.chat_widget.render(area, frame.buffer_mut());
                    if let Some((x, y)) = self.chat_widget.cursor_pos(area) {
                        frame.set_cursor_position((x, y));
                    }
                })?;
            }
        }
        Ok(true)
    }

    fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::ContextWindowSizeCommitted(value) => {
                self.chat_widget.on_context_window_committed(value);
            }
            AppEvent::StreamChunk {
                conversation_id,
                text,
            } => self.chat_widget.on_stream_chunk(conversation_id, &text),
            AppEvent::StreamFinished { conversation_id } => {
                self.chat_widget.on_stream_finished(conversation_id);
            }
            AppEvent::StreamFailed {
                conversation_id,
                message,
            } => {
                tracing::warn!(%conversation_id, "chat request failed: {message}");
                self.chat_widget.on_stream_failed(conversation_id, message);
            }
            AppEvent::NewConversation => self.chat_widget.new_conversation(),
            AppEvent::ExitRequest => return false,
        }
        true
    }
}
