use assert_matches::assert_matches;
use chatbot_ollama::ChatError;
use chatbot_ollama::OllamaClient;
use chatbot_ollama::handle_chat;
use chatbot_protocol::ContextWindowSize;
use chatbot_protocol::chat::ChatBody;
use chatbot_protocol::chat::ChatOptions;
use chatbot_protocol::chat::DEFAULT_SYSTEM_PROMPT;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>()
}

fn body(options: Option<ChatOptions>) -> ChatBody {
    ChatBody {
        model: "mistral:latest".to_string(),
        keep_alive: None,
        system: None,
        prompt: "Why is the sky blue?".to_string(),
        options,
    }
}

async fn collect(client: &OllamaClient, body: ChatBody) -> Result<Vec<String>, ChatError> {
    let mut stream = handle_chat(client, body).await?;
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk?);
    }
    Ok(chunks)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streams_chunks_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson(&[
                json!({ "response": "Rayleigh", "done": false }),
                json!({ "response": " scattering", "done": false }),
                json!({ "response": "", "done": true }),
                json!({ "response": "ignored after done", "done": false }),
            ]),
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::from_host_root(server.uri());
    let chunks = collect(&client, body(None)).await.expect("stream");
    assert_eq!(chunks, vec!["Rayleigh".to_string(), " scattering".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_carries_resolved_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "mistral:latest",
            "system": DEFAULT_SYSTEM_PROMPT,
            "options": { "temperature": 1.0, "num_ctx": 2048 },
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson(&[json!({ "response": "ok", "done": true })]),
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::from_host_root(server.uri());
    let chunks = collect(&client, body(None)).await.expect("stream");
    assert_eq!(chunks, vec!["ok".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn committed_context_window_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "options": { "num_ctx": 8192 } })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson(&[json!({ "response": "", "done": true })]),
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::from_host_root(server.uri());
    let options = ChatOptions {
        temperature: None,
        num_ctx: Some(ContextWindowSize::new(8192).expect("non-zero")),
    };
    let chunks = collect(&client, body(Some(options))).await.expect("stream");
    assert!(chunks.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_error_status_maps_to_ollama_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": "model \"mistral:latest\" not found" })),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::from_host_root(server.uri());
    let err = collect(&client, body(None)).await.err().expect("error");
    assert_matches!(err, ChatError::Ollama { message } if message == "model \"mistral:latest\" not found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mid_stream_error_ends_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            ndjson(&[
                json!({ "response": "partial", "done": false }),
                json!({ "error": "out of memory" }),
            ]),
            "application/x-ndjson",
        ))
        .mount(&server)
        .await;

    let client = OllamaClient::from_host_root(server.uri());
    let mut stream = handle_chat(&client, body(None)).await.expect("stream");
    assert_eq!(stream.next().await.map(Result::ok), Some(Some("partial".to_string())));
    assert_matches!(stream.next().await, Some(Err(ChatError::Ollama { message })) if message == "out of memory");
    assert!(stream.next().await.is_none());
}
