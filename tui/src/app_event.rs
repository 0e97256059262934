//! Application-level events used to coordinate UI actions.
//!
//! `AppEvent` is the internal message bus between UI components, background
//! tasks and the top-level `App` loop.

use chatbot_protocol::CommittedValue;
use chatbot_protocol::ConversationId;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AppEvent {
    /// Raw text reported by the context window input after an edit, a preset
    /// selection or a template substitution. Parsed by the owner of the
    /// conversation.
    ContextWindowSizeCommitted(CommittedValue),

    /// A piece of the assistant's reply.
    StreamChunk {
        conversation_id: ConversationId,
        text: String,
    },

    /// The reply for `conversation_id` is complete.
    StreamFinished { conversation_id: ConversationId },

    /// The request for `conversation_id` failed; `message` is shown to the
    /// user.
    StreamFailed {
        conversation_id: ConversationId,
        message: String,
    },

    /// Drop the current conversation and start a fresh one.
    NewConversation,

    /// Request to exit the application gracefully.
    ExitRequest,
}
