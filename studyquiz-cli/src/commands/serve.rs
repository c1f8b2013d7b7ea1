//! HTTP server command

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use studyquiz_server::db::{create_pool_with_options, migrations};
use studyquiz_server::http::{run_server, AppState, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config, default 127.0.0.1:8000)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Skip schema migrations on startup
    #[arg(long)]
    pub no_migrate: bool,
}

/// Run the HTTP server until Ctrl+C / SIGTERM.
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if args.no_migrate {
        config.database.migrate_on_start = false;
    }

    tracing::info!("Starting studyquiz server on {}", config.server.bind);

    let pool = create_pool_with_options(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    if config.database.migrate_on_start {
        migrations::run(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    let state = AppState::from_config(pool, &config).context("Failed to set up services")?;

    run_server(state, ServerConfig::from(&config.server))
        .await
        .context("Server error")?;

    Ok(())
}
