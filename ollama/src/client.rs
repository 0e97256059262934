use std::io;
use std::time::Duration;

use chatbot_core::config::Config;
use chatbot_protocol::chat::OllamaModel;
use futures::StreamExt;
use semver::Version;
use serde_json::Value as JsonValue;

use crate::chat::ChatError;
use crate::chat::ChatStream;
use crate::chat::GenerateRequest;
use crate::parser::GenerateEvent;
use crate::parser::drain_complete_lines;
use crate::parser::generate_events_from_value;
use crate::url::base_url_to_host_root;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama?tab=readme-ov-file#ollama";

/// Client for interacting with a local Ollama instance.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    host_root: String,
}

impl OllamaClient {
    /// Construct a client for the configured server and verify that it is
    /// reachable.
    pub async fn try_from_config(config: &Config) -> io::Result<Self> {
        Self::try_from_base_url(&config.ollama_base_url).await
    }

    pub async fn try_from_base_url(base_url: &str) -> io::Result<Self> {
        let client = Self::from_host_root(base_url_to_host_root(base_url));
        client.probe_server().await?;
        Ok(client)
    }

    /// Build a client for `base_url` without contacting the server.
    pub fn from_base_url(base_url: &str) -> Self {
        Self::from_host_root(base_url_to_host_root(base_url))
    }

    /// Low-level constructor given a raw host root, e.g. "http://localhost:11434".
    /// Does not probe the server.
    pub fn from_host_root(host_root: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            host_root: host_root.into(),
        }
    }

    pub fn host_root(&self) -> &str {
        &self.host_root
    }

    /// Probe whether the server is reachable by hitting the tags endpoint.
    async fn probe_server(&self) -> io::Result<()> {
        let url = format!("{}/api/tags", self.host_root);
        let resp = self.client.get(url).send().await.map_err(|err| {
            tracing::warn!("Failed to connect to Ollama server: {err:?}");
            io::Error::other(OLLAMA_CONNECTION_ERROR)
        })?;
        if resp.status().is_success() {
            Ok(())
        } else {
            tracing::warn!(
                "Failed to probe server at {}: HTTP {}",
                self.host_root,
                resp.status()
            );
            Err(io::Error::other(OLLAMA_CONNECTION_ERROR))
        }
    }

    /// Return the list of models available on the local Ollama instance.
    pub async fn fetch_models(&self) -> io::Result<Vec<OllamaModel>> {
        let tags_url = format!("{}/api/tags", self.host_root);
        let resp = self
            .client
            .get(tags_url)
            .send()
            .await
            .map_err(io::Error::other)?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let val = resp.json::<JsonValue>().await.map_err(io::Error::other)?;
        let models = val
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| serde_json::from_value::<OllamaModel>(v.clone()).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(models)
    }

    /// Query the server version. Returns `Ok(None)` when the endpoint is
    /// missing or the version is unparsable.
    pub async fn fetch_version(&self) -> io::Result<Option<Version>> {
        let version_url = format!("{}/api/version", self.host_root);
        let resp = self
            .client
            .get(version_url)
            .send()
            .await
            .map_err(io::Error::other)?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let val = resp.json::<JsonValue>().await.map_err(io::Error::other)?;
        let Some(version_str) = val.get("version").and_then(JsonValue::as_str) else {
            return Ok(None);
        };
        let normalized = version_str.trim().trim_start_matches('v');
        match Version::parse(normalized) {
            Ok(version) => Ok(Some(version)),
            Err(err) => {
                tracing::warn!("Failed to parse Ollama version `{version_str}`: {err}");
                Ok(None)
            }
        }
    }

    /// Start a streaming `/api/generate` call and return the response text
    /// chunks as they arrive.
    pub async fn generate_stream(&self, request: &GenerateRequest) -> Result<ChatStream, ChatError> {
        let url = format!("{}/api/generate", self.host_root);
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ChatError::other)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_failed_response(status, &body));
        }

        let mut bytes = resp.bytes_stream();
        let stream = async_stream::stream! {
            let mut buf: Vec<u8> = Vec::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(ChatError::other(err));
                        break 'read;
                    }
                };
                buf.extend_from_slice(&chunk);
                for line in drain_complete_lines(&mut buf) {
                    let value = match serde_json::from_str::<JsonValue>(&line) {
                        Ok(value) => value,
                        Err(err) => {
                            tracing::warn!("Skipping malformed generate line: {err}");
                            continue;
                        }
                    };
                    for event in generate_events_from_value(&value) {
                        match event {
                            GenerateEvent::Chunk(text) => yield Ok(text),
                            GenerateEvent::Done => break 'read,
                            GenerateEvent::Error(message) => {
                                yield Err(ChatError::Ollama { message });
                                break 'read;
                            }
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// A failed response carrying an `error` field is a backend error; anything
/// else is opaque.
fn error_from_failed_response(status: reqwest::StatusCode, body: &str) -> ChatError {
    let message = serde_json::from_str::<JsonValue>(body).ok().and_then(|value| {
        value
            .get("error")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => ChatError::Ollama { message },
        None => ChatError::other(io::Error::other(format!(
            "Ollama API returned an error: HTTP {status}: {body}"
        ))),
    }
}
