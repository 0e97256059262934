//! Conversation bookkeeping on top of the plain protocol types.

use chatbot_protocol::CommittedValue;
use chatbot_protocol::ContextWindowSize;
use chatbot_protocol::ContextWindowSizeError;
use chatbot_protocol::chat::ChatBody;
use chatbot_protocol::chat::ChatOptions;
use chatbot_protocol::chat::Message;
use chatbot_protocol::chat::OllamaModel;
use chatbot_protocol::conversation::Conversation;

use crate::config::Config;

/// Start a fresh conversation using the configured model, prompt and sampling
/// settings.
pub fn new_conversation(config: &Config) -> Conversation {
    let mut conversation = Conversation::new(
        OllamaModel::named(config.model.clone()),
        config.system_prompt.clone(),
        config.temperature,
    );
    conversation.context_window_size = config.context_window_size;
    conversation
}

/// Store a value committed by the context window input.
///
/// The input reports raw text on every edit, so this is where it is parsed.
/// On failure the previously stored size is kept and the error is returned
/// for display.
pub fn apply_context_window_commit(
    conversation: &mut Conversation,
    value: &CommittedValue,
) -> Result<ContextWindowSize, ContextWindowSizeError> {
    match value.parse() {
        Ok(size) => {
            tracing::debug!(
                conversation_id = %conversation.id,
                context_window_size = size.get(),
                "context window size updated"
            );
            conversation.context_window_size = Some(size);
            Ok(size)
        }
        Err(err) => {
            tracing::debug!(
                conversation_id = %conversation.id,
                raw = value.as_str(),
                "ignoring invalid context window size: {err}"
            );
            Err(err)
        }
    }
}

/// Build the request for the next turn. The whole transcript is folded into
/// the prompt since `/api/generate` is stateless.
pub fn chat_body_for(conversation: &Conversation, keep_alive: Option<String>) -> ChatBody {
    ChatBody {
        model: conversation.model.name.clone(),
        keep_alive,
        system: Some(conversation.prompt.clone()).filter(|prompt| !prompt.is_empty()),
        prompt: render_transcript(&conversation.messages),
        options: Some(ChatOptions {
            temperature: Some(conversation.temperature),
            num_ctx: conversation.context_window_size,
        }),
    }
}

fn render_transcript(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }
    messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                chatbot_protocol::chat::Role::User => "User",
                chatbot_protocol::chat::Role::Assistant => "Assistant",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::config::ConfigToml;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config::load_from_base_config_with_overrides(
            ConfigToml {
                model: Some("llama3".to_string()),
                system_prompt: Some("be brief".to_string()),
                temperature: Some(0.5),
                ..Default::default()
            },
            ConfigOverrides::default(),
            PathBuf::from("/tmp/chatbot"),
            None,
        )
    }

    #[test]
    fn valid_commit_updates_the_conversation() {
        let mut conversation = new_conversation(&test_config());
        let size = apply_context_window_commit(&mut conversation, &CommittedValue::new("8192"))
            .unwrap();
        assert_eq!(size.get(), 8192);
        assert_eq!(conversation.context_window_size, Some(size));
    }

    #[test]
    fn invalid_commit_keeps_previous_value() {
        let mut conversation = new_conversation(&test_config());
        apply_context_window_commit(&mut conversation, &CommittedValue::new("4096")).unwrap();

        let err = apply_context_window_commit(&mut conversation, &CommittedValue::new("/40"))
            .unwrap_err();
        assert_eq!(err, ContextWindowSizeError::Invalid("/40".to_string()));
        assert_eq!(
            conversation.context_window_size,
            Some(ContextWindowSize::new(4096).unwrap())
        );
    }

    #[test]
    fn chat_body_carries_conversation_settings() {
        let mut conversation = new_conversation(&test_config());
        conversation.messages.push(Message::user("hello"));

        let body = chat_body_for(&conversation, Some("5m".to_string()));
        assert_eq!(
            body,
            ChatBody {
                model: "llama3".to_string(),
                keep_alive: Some("5m".to_string()),
                system: Some("be brief".to_string()),
                prompt: "hello".to_string(),
                options: Some(ChatOptions {
                    temperature: Some(0.5),
                    num_ctx: None,
                }),
            }
        );
    }

    #[test]
    fn multi_turn_transcripts_are_labelled() {
        let mut conversation = new_conversation(&test_config());
        conversation.messages = vec![
            Message::user("hi"),
            Message::assistant("hello!"),
            Message::user("how big is your context?"),
        ];
        let body = chat_body_for(&conversation, None);
        assert_eq!(
            body.prompt,
            "User: hi\n\nAssistant: hello!\n\nUser: how big is your context?"
        );
    }
}
