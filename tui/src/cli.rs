use chatbot_core::CliConfigOverrides;
use chatbot_protocol::ContextWindowSize;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Model to chat with, as named by `ollama list`.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Root URL of the Ollama server, e.g. `http://localhost:11434`.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Context window size (in tokens) for new conversations.
    #[arg(long = "context-window", value_name = "TOKENS")]
    pub context_window: Option<ContextWindowSize>,

    #[clap(skip)]
    pub config_overrides: CliConfigOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "chatbot-tui",
            "-m",
            "llama3",
            "--base-url",
            "http://gpu-box:11434",
            "--context-window",
            "8192",
        ]);
        assert_eq!(cli.model.as_deref(), Some("llama3"));
        assert_eq!(cli.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(cli.context_window.map(ContextWindowSize::get), Some(8192));
    }

    #[test]
    fn rejects_invalid_context_window() {
        assert!(Cli::try_parse_from(["chatbot-tui", "--context-window", "0"]).is_err());
        assert!(Cli::try_parse_from(["chatbot-tui", "--context-window", "lots"]).is_err());
    }
}
