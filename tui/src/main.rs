use chatbot_core::CliConfigOverrides;
use chatbot_tui::Cli;
use chatbot_tui::merge_config_overrides;
use chatbot_tui::run_main;
use clap::Parser;

#[derive(Parser, Debug)]
struct TopCli {
    #[clap(flatten)]
    config_overrides: CliConfigOverrides,

    #[clap(flatten)]
    inner: Cli,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let top_cli = TopCli::parse();
    let mut inner = top_cli.inner;
    merge_config_overrides(&mut inner, top_cli.config_overrides);
    run_main(inner).await?;
    Ok(())
}
