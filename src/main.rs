//! Quorum CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quorum::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => cli::handle_error(&err),
    };

    let result = match cli.command {
        Commands::Ask(args) => cli::commands::ask::execute(args, config).await,
        Commands::Converge(args) => cli::commands::converge::execute(args, config).await,
        Commands::Scan(args) => cli::commands::scan::execute(args, config).await,
    };

    if let Err(err) = result {
        cli::handle_error(&err);
    }
}
