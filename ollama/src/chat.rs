use std::error::Error as StdError;
use std::pin::Pin;

use chatbot_protocol::ContextWindowSize;
use chatbot_protocol::DEFAULT_CONTEXT_WINDOW_SIZE;
use chatbot_protocol::chat::ChatBody;
use chatbot_protocol::chat::DEFAULT_SYSTEM_PROMPT;
use chatbot_protocol::chat::DEFAULT_TEMPERATURE;
use futures::Stream;
use serde::Serialize;
use thiserror::Error;

use crate::client::OllamaClient;

/// Stream of response text chunks for one chat turn.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The server answered with an `error` message, e.g. an unknown model.
    #[error("{message}")]
    Ollama { message: String },

    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ChatError {
    pub(crate) fn other(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::other(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_ctx: ContextWindowSize,
}

/// Wire body for `POST /api/generate` with every default resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    pub stream: bool,
}

/// Fill in the system prompt, temperature and context window size the caller
/// left out.
pub fn resolve_chat_body(body: ChatBody) -> GenerateRequest {
    let options = body.options.unwrap_or_default();
    let system = body
        .system
        .filter(|system| !system.is_empty())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    GenerateRequest {
        model: body.model,
        system,
        prompt: body.prompt,
        options: GenerateOptions {
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            num_ctx: options.num_ctx.unwrap_or(DEFAULT_CONTEXT_WINDOW_SIZE),
        },
        keep_alive: body.keep_alive,
        stream: true,
    }
}

/// Run one chat turn and return the streamed response text.
pub async fn handle_chat(client: &OllamaClient, body: ChatBody) -> Result<ChatStream, ChatError> {
    let request = resolve_chat_body(body);
    tracing::debug!(
        model = %request.model,
        num_ctx = request.options.num_ctx.get(),
        temperature = request.options.temperature,
        "starting generate request"
    );
    client.generate_stream(&request).await.inspect_err(|err| {
        tracing::error!("chat request failed: {err}");
    })
}
