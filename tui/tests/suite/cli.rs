use chatbot_core::CliConfigOverrides;
use chatbot_tui::Cli;
use chatbot_tui::merge_config_overrides;
use clap::Parser;
use pretty_assertions::assert_eq;

#[test]
fn top_level_overrides_come_first() {
    let mut cli = Cli::parse_from(["chatbot-tui", "--model", "llama3"]);
    cli.config_overrides.raw_overrides = vec!["temperature=0.5".to_string()];
    let top_level = CliConfigOverrides {
        raw_overrides: vec!["temperature=0.2".to_string(), "keep_alive=\"5m\"".to_string()],
    };

    merge_config_overrides(&mut cli, top_level);

    assert_eq!(
        cli.config_overrides.raw_overrides,
        vec![
            "temperature=0.2".to_string(),
            "keep_alive=\"5m\"".to_string(),
            "temperature=0.5".to_string(),
        ]
    );
    let parsed = cli
        .config_overrides
        .parse_overrides()
        .expect("overrides should parse");
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].0, "temperature");
}

#[test]
fn context_window_flag_is_validated() {
    let cli = Cli::try_parse_from(["chatbot-tui", "--context-window", "4096"])
        .expect("4096 is a valid context window");
    assert_eq!(cli.context_window.map(u64::from), Some(4096));

    let err = Cli::try_parse_from(["chatbot-tui", "--context-window", "lots"])
        .expect_err("non-numeric sizes are rejected");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}
