// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Ctrl-C cancels in-flight fetches and downloads; files already in
    // place stay for the next run
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    let open = || {
        Session::open(
            &cli.project_dir,
            cli.config.as_deref(),
            cli.quiet,
            cancel.clone(),
        )
    };

    match cli.command {
        Some(Commands::Init) => commands::cmd_init(&cli.project_dir).await,
        Some(Commands::Resolve) => commands::cmd_resolve(open()?).await,
        Some(Commands::Install {
            identifier,
            requirement,
            force,
        }) => commands::cmd_install(open()?, identifier, requirement, force).await,
        Some(Commands::Upgrade) => commands::cmd_upgrade(open()?).await,
        Some(Commands::Update { identifier }) => commands::cmd_update(open()?, identifier).await,
        Some(Commands::Uninstall { identifier }) => {
            commands::cmd_uninstall(open()?, identifier).await
        }
        Some(Commands::Tags { identifier }) => commands::cmd_tags(open()?, identifier).await,
        Some(Commands::Recipe { identifier }) => commands::cmd_recipe(open()?, identifier).await,
        Some(Commands::Recipes) => commands::cmd_recipes(open()?).await,
        None => {
            // No command provided, show help
            println!("Buckaroo v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'buckaroo --help' for usage information");
            Ok(())
        }
    }
}
