//! Config command for managing CLI configuration

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config};
use crate::Cli;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show config file path
    Path,
    /// Show the effective configuration (file plus flags and environment)
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config.clone().unwrap_or_else(config_file_path);
    match &args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(cli),
        ConfigCommands::Init { force } => run_init(path, *force),
    }
}

fn run_show(cli: &Cli) -> anyhow::Result<()> {
    let mut config = cli.resolve_config()?;
    if config.connection.password.is_some() {
        config.connection.password = Some("********".into());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn run_init(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(&path)?;
    println!("Created config file at {}", path.display());
    Ok(())
}
