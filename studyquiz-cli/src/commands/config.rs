//! Configuration inspection

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use studyquiz_server::StudyquizConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration (secrets masked)
    Show,
    /// Show config file path
    Path,
    /// Write a config file with default values
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(StudyquizConfig::config_path);
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init(init) => run_init(init, config_path),
    }
}

fn run_show(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let toml_str = config
        .redacted()
        .to_toml()
        .context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);
    Ok(())
}

fn run_init(args: InitArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(StudyquizConfig::config_path);

    if path.exists() && !args.force {
        bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = StudyquizConfig::default()
        .to_toml()
        .context("Failed to serialize config to TOML")?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config at: {}", path.display());
    Ok(())
}
