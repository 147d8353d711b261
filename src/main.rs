//! Promptcraft CLI entry point.

use anyhow::Result;
use clap::Parser;

use promptcraft::cli::{commands, handle_error, AppContext, Cli, Commands};
use promptcraft::infrastructure::logging::{LogConfig, LoggerImpl};
use promptcraft::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let _logger = LoggerImpl::init(&LogConfig::from_settings(&config.logging)?)?;

    if let Commands::Init { force } = cli.command {
        return commands::init::execute(force, config, cli.json).await;
    }

    let ctx = AppContext::open(config).await?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Challenges(command) => commands::challenge::execute(command, &ctx, cli.json).await,
        Commands::Attempt {
            challenge_id,
            prompt,
        } => commands::attempt::execute(challenge_id, prompt, &ctx, cli.json).await,
        Commands::Progress(command) => commands::progress::execute(command, &ctx, cli.json).await,
        Commands::Session(command) => commands::session::execute(command, &ctx, cli.json).await,
    }
}
