mod chat;
mod client;
mod parser;
mod url;

pub use chat::ChatError;
pub use chat::ChatStream;
pub use chat::GenerateOptions;
pub use chat::GenerateRequest;
pub use chat::handle_chat;
pub use chat::resolve_chat_body;
pub use client::OllamaClient;
use chatbot_core::config::Config;
use semver::Version;

/// Check that the configured Ollama server is reachable and report whether it
/// has the configured model.
///
/// A missing model is not fatal: the user may pull it while the UI is open, and
/// the server reports the error on the first request anyway.
pub async fn ensure_server_ready(config: &Config) -> std::io::Result<OllamaClient> {
    let client = OllamaClient::try_from_config(config).await?;

    match client.fetch_version().await {
        Ok(Some(version)) => log_version(&version),
        Ok(None) => {}
        Err(err) => tracing::debug!("Failed to query Ollama version: {err}"),
    }

    match client.fetch_models().await {
        Ok(models) => {
            if !models.iter().any(|m| m.name == config.model) {
                tracing::warn!(
                    model = %config.model,
                    "model is not available locally; run `ollama pull {}` first",
                    config.model
                );
            }
        }
        Err(err) => {
            // Not fatal; the chat request will surface a clearer error later.
            tracing::warn!("Failed to query local models from Ollama: {}.", err);
        }
    }

    Ok(client)
}

fn log_version(version: &Version) {
    if *version == Version::new(0, 0, 0) {
        tracing::info!("connected to a development build of Ollama");
    } else {
        tracing::info!("connected to Ollama {version}");
    }
}
