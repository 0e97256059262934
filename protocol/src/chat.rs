use serde::Deserialize;
use serde::Serialize;

use crate::ContextWindowSize;

/// System prompt sent when a request does not carry one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant running on a local model. Follow the user's instructions carefully. Respond using markdown.";

/// Sampling temperature used when a request does not specify one.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options forwarded to the model server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<ContextWindowSize>,
}

/// Body of a chat request. Absent fields are filled with defaults by the
/// chat handler before the request reaches the model server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBody {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

/// A model as reported by the server's `/api/tags` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl OllamaModel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified_at: None,
            size: None,
        }
    }
}
