mod args;
mod cmd;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secretfills_core::{load_config, load_config_or_default, Config};

use args::{Cli, Commands, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = read_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Search(args) => cmd::search::run(config, args).await,
        Commands::Review(args) => cmd::review::run(&config, args),
        Commands::KnownIds(args) => cmd::ids::save_known_ids(config, args).await,
        Commands::Exclude(args) => cmd::ids::exclude(&config, args),
        Commands::Config => cmd::show_config(&config),
    }
}

/// An explicitly named config file must exist; the default one is optional.
fn read_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .with_context(|| format!("Failed to load config from {:?}", DEFAULT_CONFIG_PATH)),
    }
}
