use std::path::Path;
use std::path::PathBuf;

use chatbot_protocol::ContextWindowPreset;
use chatbot_protocol::ContextWindowSize;
use chatbot_protocol::chat::DEFAULT_SYSTEM_PROMPT;
use chatbot_protocol::chat::DEFAULT_TEMPERATURE;
use serde::Deserialize;
use toml::Value as TomlValue;

use crate::config_override::apply_single_override;

const CONFIG_TOML_FILE: &str = "config.toml";

/// Model used when neither the config file nor the CLI selects one.
pub const DEFAULT_MODEL: &str = "mistral:latest";

/// Where a stock Ollama install listens.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Application configuration loaded from disk and merged with overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Model requested for new conversations.
    pub model: String,

    /// Root URL of the Ollama server, without the `/api` suffix.
    pub ollama_base_url: String,

    /// System prompt for new conversations.
    pub system_prompt: String,

    pub temperature: f32,

    /// Context window for new conversations. `None` means "use the default".
    pub context_window_size: Option<ContextWindowSize>,

    /// Presets offered by the `/` picker of the context window input.
    pub context_window_presets: Vec<ContextWindowPreset>,

    /// Forwarded as `keep_alive` on every chat request when set.
    pub keep_alive: Option<String>,

    /// Directory containing all chatbot state (defaults to `~/.chatbot-ollama`
    /// but can be overridden by the `CHATBOT_HOME` environment variable).
    pub chatbot_home: PathBuf,
}

/// Base config deserialized from `~/.chatbot-ollama/config.toml`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigToml {
    pub model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub context_window_size: Option<ContextWindowSize>,
    pub context_window_presets: Option<Vec<ContextWindowPreset>>,
    pub keep_alive: Option<String>,
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub context_window_size: Option<ContextWindowSize>,
}

impl Config {
    /// Load configuration from `chatbot_home`, layering `-c key=value`
    /// overrides on the file contents and typed overrides on top of that.
    pub fn load_with_cli_overrides(
        chatbot_home: PathBuf,
        cli_overrides: Vec<(String, TomlValue)>,
        overrides: ConfigOverrides,
    ) -> std::io::Result<Self> {
        let cfg = load_config_as_toml_with_cli_overrides(&chatbot_home, cli_overrides)?;
        let ollama_host = std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|val| !val.is_empty());
        Ok(Self::load_from_base_config_with_overrides(
            cfg,
            overrides,
            chatbot_home,
            ollama_host,
        ))
    }

    /// Merge a parsed [`ConfigToml`] with overrides. `ollama_host` is the
    /// value of `OLLAMA_HOST`, consulted only when no base URL is configured.
    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        chatbot_home: PathBuf,
        ollama_host: Option<String>,
    ) -> Self {
        let ConfigOverrides {
            model,
            ollama_base_url,
            context_window_size,
        } = overrides;

        let ollama_base_url = ollama_base_url
            .or(cfg.ollama_base_url)
            .or(ollama_host.map(|host| normalize_ollama_host(&host)))
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());

        let context_window_presets = match cfg.context_window_presets {
            Some(presets) if !presets.is_empty() => presets,
            _ => ContextWindowPreset::default_presets(),
        };

        Self {
            model: model
                .or(cfg.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ollama_base_url,
            system_prompt: cfg
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            context_window_size: context_window_size.or(cfg.context_window_size),
            context_window_presets,
            keep_alive: cfg.keep_alive,
            chatbot_home,
        }
    }
}

/// Read `config.toml` from `chatbot_home` (a missing file is an empty
/// config), apply the CLI overrides and deserialize the result.
pub fn load_config_as_toml_with_cli_overrides(
    chatbot_home: &Path,
    cli_overrides: Vec<(String, TomlValue)>,
) -> std::io::Result<ConfigToml> {
    let mut root = load_config_as_toml(chatbot_home)?;
    for (path, value) in cli_overrides {
        apply_single_override(&mut root, &path, value);
    }
    root.try_into().map_err(|e| {
        tracing::error!("Failed to deserialize overridden config: {e}");
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })
}

fn load_config_as_toml(chatbot_home: &Path) -> std::io::Result<TomlValue> {
    let config_path = chatbot_home.join(CONFIG_TOML_FILE);
    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<TomlValue>(&contents) {
            Ok(val) => Ok(val),
            Err(e) => {
                tracing::error!("Failed to parse {}: {e}", config_path.display());
                Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("{} not found, using defaults", config_path.display());
            Ok(TomlValue::Table(Default::default()))
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", config_path.display());
            Err(e)
        }
    }
}

/// `OLLAMA_HOST` is often given as `host:port` without a scheme.
fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

pub fn log_dir(cfg: &Config) -> std::io::Result<PathBuf> {
    let mut p = cfg.chatbot_home.clone();
    p.push("log");
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn size(tokens: u64) -> ContextWindowSize {
        ContextWindowSize::new(tokens).unwrap()
    }

    #[test]
    fn defaults_apply_when_config_is_missing() {
        let home = TempDir::new().unwrap();
        let config = Config::load_with_cli_overrides(
            home.path().to_path_buf(),
            Vec::new(),
            ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.context_window_size, None);
        assert_eq!(
            config.context_window_presets,
            ContextWindowPreset::default_presets()
        );
    }

    #[test]
    fn file_values_are_read() {
        let home = TempDir::new().unwrap();
        std::fs::write(
            home.path().join(CONFIG_TOML_FILE),
            r#"
model = "llama3"
ollama_base_url = "http://gpu-box:11434"
temperature = 0.25
context_window_size = 8192
context_window_presets = [4096, "{{k}}024"]
keep_alive = "10m"
"#,
        )
        .unwrap();

        let cfg = load_config_as_toml_with_cli_overrides(home.path(), Vec::new()).unwrap();
        assert_eq!(
            cfg,
            ConfigToml {
                model: Some("llama3".to_string()),
                ollama_base_url: Some("http://gpu-box:11434".to_string()),
                system_prompt: None,
                temperature: Some(0.25),
                context_window_size: Some(size(8192)),
                context_window_presets: Some(vec![
                    ContextWindowPreset::Size(size(4096)),
                    ContextWindowPreset::Template("{{k}}024".to_string()),
                ]),
                keep_alive: Some("10m".to_string()),
            }
        );
    }

    #[test]
    fn cli_overrides_beat_the_file() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(CONFIG_TOML_FILE), "model = \"llama3\"\n").unwrap();

        let cfg = load_config_as_toml_with_cli_overrides(
            home.path(),
            vec![("model".to_string(), TomlValue::String("qwen2".to_string()))],
        )
        .unwrap();
        assert_eq!(cfg.model.as_deref(), Some("qwen2"));
    }

    #[test]
    fn zero_context_window_is_rejected() {
        let home = TempDir::new().unwrap();
        std::fs::write(
            home.path().join(CONFIG_TOML_FILE),
            "context_window_size = 0\n",
        )
        .unwrap();

        let err = load_config_as_toml_with_cli_overrides(home.path(), Vec::new()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn typed_overrides_take_precedence() {
        let cfg = ConfigToml {
            model: Some("llama3".to_string()),
            context_window_size: Some(size(4096)),
            ..Default::default()
        };
        let config = Config::load_from_base_config_with_overrides(
            cfg,
            ConfigOverrides {
                model: Some("phi3".to_string()),
                ollama_base_url: None,
                context_window_size: Some(size(16384)),
            },
            PathBuf::from("/tmp/chatbot"),
            None,
        );
        assert_eq!(config.model, "phi3");
        assert_eq!(config.context_window_size, Some(size(16384)));
        assert_eq!(config.ollama_base_url, DEFAULT_OLLAMA_BASE_URL);
    }

    #[test]
    fn ollama_host_is_used_when_no_base_url_is_configured() {
        let config = Config::load_from_base_config_with_overrides(
            ConfigToml::default(),
            ConfigOverrides::default(),
            PathBuf::from("/tmp/chatbot"),
            Some("127.0.0.1:11500".to_string()),
        );
        assert_eq!(config.ollama_base_url, "http://127.0.0.1:11500");

        let config = Config::load_from_base_config_with_overrides(
            ConfigToml {
                ollama_base_url: Some("http://configured:11434".to_string()),
                ..Default::default()
            },
            ConfigOverrides::default(),
            PathBuf::from("/tmp/chatbot"),
            Some("127.0.0.1:11500".to_string()),
        );
        assert_eq!(config.ollama_base_url, "http://configured:11434");
    }

    #[test]
    fn empty_preset_list_falls_back_to_defaults() {
        let config = Config::load_from_base_config_with_overrides(
            ConfigToml {
                context_window_presets: Some(Vec::new()),
                ..Default::default()
            },
            ConfigOverrides::default(),
            PathBuf::from("/tmp/chatbot"),
            None,
        );
        assert_eq!(
            config.context_window_presets,
            ContextWindowPreset::default_presets()
        );
    }
}
