//! studyquiz CLI - runs and administers the studyquiz HTTP API
//!
//! - `serve`: start the API server
//! - `migrate`: apply the database schema
//! - `config`: inspect the resolved configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "studyquiz",
    author,
    version,
    about = "REST backend for study materials and generated quizzes"
)]
struct Cli {
    /// Config file (default: ~/.studyquiz/config.toml)
    #[arg(long, short = 'c', global = true, env = "STUDYQUIZ_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (unless RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply database migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Inspect configuration (show, path, init)
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // before tracing so RUST_LOG from .env applies
    commands::load_dotenv();
    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, config_path).await,
        Commands::Migrate(args) => commands::run_migrate(args, config_path).await,
        Commands::Config(args) => commands::run_config(args, config_path),
    };

    tracing_setup::shutdown();
    result
}
