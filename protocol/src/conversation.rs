use serde::Deserialize;
use serde::Serialize;

use crate::ContextWindowSize;
use crate::ConversationId;
use crate::chat::Message;
use crate::chat::OllamaModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    pub messages: Vec<Message>,
    pub model: OllamaModel,
    /// System prompt for this conversation.
    pub prompt: String,
    pub temperature: f32,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub context_window_size: Option<ContextWindowSize>,
}

impl Conversation {
    pub fn new(model: OllamaModel, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            id: ConversationId::new(),
            name: "New Conversation".to_string(),
            messages: Vec::new(),
            model,
            prompt: prompt.into(),
            temperature,
            folder_id: None,
            context_window_size: None,
        }
    }

    /// The size to send with requests: the stored value or the default.
    pub fn effective_context_window_size(&self) -> ContextWindowSize {
        self.context_window_size.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_CONTEXT_WINDOW_SIZE;
    use pretty_assertions::assert_eq;

    #[test]
    fn falls_back_to_default_context_window() {
        let mut conversation = Conversation::new(OllamaModel::named("llama3"), "", 1.0);
        assert_eq!(
            conversation.effective_context_window_size(),
            DEFAULT_CONTEXT_WINDOW_SIZE
        );

        let size = ContextWindowSize::new(8192).unwrap();
        conversation.context_window_size = Some(size);
        assert_eq!(conversation.effective_context_window_size(), size);
    }
}
