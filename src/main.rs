use anyhow::Result;
use clap::Parser;

use quill::cli::{Cli, Command};
use quill::config::Config;
use quill::workflow;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Show(args)) => workflow::run_show(args),
        Some(Command::Generate(args)) => {
            let config = Config::load_or_init()?;
            workflow::run_generate(args, config).await
        }
        None => {
            let config = Config::load_or_init()?;
            workflow::run_generate(cli.generate, config).await
        }
    }
}
