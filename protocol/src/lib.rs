pub mod chat;
mod context_window;
pub mod conversation;
mod conversation_id;

pub use context_window::CommittedValue;
pub use context_window::ContextWindowPreset;
pub use context_window::ContextWindowSize;
pub use context_window::ContextWindowSizeError;
pub use context_window::DEFAULT_CONTEXT_WINDOW_SIZE;
pub use conversation_id::ConversationId;
