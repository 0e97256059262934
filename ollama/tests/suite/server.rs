use chatbot_core::config::Config;
use chatbot_core::config::ConfigOverrides;
use chatbot_core::config::ConfigToml;
use chatbot_ollama::ensure_server_ready;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn config_for(base_url: String) -> Config {
    Config::load_from_base_config_with_overrides(
        ConfigToml::default(),
        ConfigOverrides {
            ollama_base_url: Some(base_url),
            ..Default::default()
        },
        PathBuf::from("/tmp/chatbot-home"),
        None,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ready_server_yields_a_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "models": [{ "name": "mistral:latest" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.0.0" })))
        .mount(&server)
        .await;

    let config = config_for(format!("{}/api", server.uri()));
    let client = ensure_server_ready(&config).await.expect("server ready");
    assert_eq!(client.host_root(), server.uri());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_model_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let config = config_for(server.uri());
    assert!(ensure_server_ready(&config).await.is_ok());
}

#[tokio::test]
async fn unreachable_server_is_reported() {
    // Nothing listens on the discard port.
    let config = config_for("http://127.0.0.1:9".to_string());
    let err = ensure_server_ready(&config).await.err().expect("probe error");
    assert!(
        err.to_string().starts_with("No running Ollama server detected"),
        "unexpected error: {err}"
    );
}
