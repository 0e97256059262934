// Forbid accidental stdout/stderr writes in the *library* portion of the TUI.
// Startup errors that happen before the terminal is taken over opt out locally
// via `allow`.
#![deny(clippy::print_stdout, clippy::print_stderr)]
use std::fs::OpenOptions;

use app::App;
pub use app::AppExitInfo;
use chatbot_core::CliConfigOverrides;
use chatbot_core::config::Config;
use chatbot_core::config::ConfigOverrides;
use chatbot_core::find_chatbot_home;
use chatbot_ollama::OllamaClient;
use chatbot_ollama::ensure_server_ready;
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod app_event;
mod app_event_sender;
mod bottom_pane;
mod chatwidget;
mod cli;
mod key_hint;
mod pointer;
mod render;
mod tui;
mod wrapping;

pub use cli::Cli;

pub async fn run_main(cli: Cli) -> std::io::Result<AppExitInfo> {
    let cli_kv_overrides = match cli.config_overrides.parse_overrides() {
        Ok(v) => v,
        #[allow(clippy::print_stderr)]
        Err(e) => {
            eprintln!("Error parsing -c overrides: {e}");
            std::process::exit(1);
        }
    };

    #[allow(clippy::print_stderr)]
    let chatbot_home = match find_chatbot_home() {
        Ok(chatbot_home) => chatbot_home,
        Err(err) => {
            eprintln!("Error finding chatbot home: {err}");
            std::process::exit(1);
        }
    };

    let overrides = ConfigOverrides {
        model: cli.model.clone(),
        ollama_base_url: cli.base_url.clone(),
        context_window_size: cli.context_window,
    };

    #[allow(clippy::print_stderr)]
    let config = match Config::load_with_cli_overrides(chatbot_home, cli_kv_overrides, overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_dir = chatbot_core::config::log_dir(&config)?;
    std::fs::create_dir_all(&log_dir)?;
    // Open (or create) the log file, appending to it.
    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    // Ensure the file is only readable and writable by the current user.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(log_dir.join("chatbot-tui.log"))?;

    // Wrap file in non-blocking writer.
    let (non_blocking, _guard) = non_blocking(log_file);

    // use RUST_LOG env var, default to info for chatbot crates.
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("chatbot_core=info,chatbot_tui=info,chatbot_ollama=info")
        })
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter());

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    tracing::info!(
        model = %config.model,
        base_url = %config.ollama_base_url,
        "starting chatbot-tui"
    );

    // An unreachable server is not fatal: the user can start it and retry.
    let (client, initial_status) = match ensure_server_ready(&config).await {
        Ok(client) => (client, None),
        Err(err) => {
            tracing::warn!("{err}");
            let client = OllamaClient::from_base_url(&config.ollama_base_url);
            let status = server_unreachable_status(&client, &err);
            (client, Some(status))
        }
    };

    run_ratatui_app(config, client, initial_status)
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))
}

fn server_unreachable_status(client: &OllamaClient, err: &std::io::Error) -> String {
    format!("{}: {err}", client.host_root())
}

async fn run_ratatui_app(
    config: Config,
    client: OllamaClient,
    initial_status: Option<String>,
) -> color_eyre::Result<AppExitInfo> {
    color_eyre::install()?;

    // Forward panic reports through tracing so they land in the log file, but
    // keep the previous hook so the user still sees the report after the
    // terminal is restored.
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        prev_hook(info);
    }));
    let mut terminal = tui::init()?;
    terminal.clear()?;

    let mut tui = tui::Tui::new(terminal);
    let app_result = App::run(&mut tui, config, client, initial_status).await;

    restore();
    app_result
}

#[expect(
    clippy::print_stderr,
    reason = "TUI should no longer be displayed, so we can write to stderr."
)]
fn restore() {
    if let Err(err) = tui::restore() {
        eprintln!(
            "failed to restore terminal. Run `reset` or restart your terminal to recover: {err}"
        );
    }
}

/// Parse `-c` overrides from `top_level` into `cli`, keeping the top-level
/// ones first so later flags win.
pub fn merge_config_overrides(cli: &mut Cli, top_level: CliConfigOverrides) {
    cli.config_overrides
        .raw_overrides
        .splice(0..0, top_level.raw_overrides);
}
