//! Schema migration command

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use studyquiz_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config_path: Option<&Path>) -> Result<()> {
    let url = match args.database_url {
        Some(url) => url,
        None => super::load_config(config_path)?.database.url,
    };

    let pool = create_pool(&url)
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool)
        .await
        .context("Failed to run database migrations")?;

    println!("Migrations applied");
    Ok(())
}
