//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use sesh_config::{self, ConfigLayer, SeshConfig};

use super::Context;

/// Project-local config file created by `config init --local`.
const LOCAL_CONFIG_FILE: &str = "sesh.toml";

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are checked and which were loaded
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./sesh.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(),
        ConfigCommand::Init { local, force } => cmd_init(local, force),
        ConfigCommand::Path => cmd_path(),
    }
}

/// Config with every section filled in, so `show` prints effective values.
fn resolved(config: &SeshConfig) -> SeshConfig {
    SeshConfig {
        session: Some(config.session()),
        server: Some(config.server()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = sesh_config::load_config(None)?;

    println!("# sesh configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for source in &sources {
            println!("# from {}", source.display());
        }
        println!();
    }

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    print!("{}", resolved(&loaded.config).to_toml()?);

    if ctx.verbose && loaded.config.session.is_none() && loaded.config.server.is_none() {
        println!("\n# every value above is a built-in default");
    }
    Ok(())
}

fn cmd_which() -> Result<()> {
    let loaded = sesh_config::load_config(None)?;
    for source in &loaded.sources {
        let layer = match source.layer {
            ConfigLayer::User => "user",
            ConfigLayer::Project => "project",
            ConfigLayer::Explicit => "explicit",
        };
        let status = if source.loaded { "loaded" } else { "not loaded" };
        println!("{:<8} {:<11} {}", layer, status, source.path.display());
    }
    Ok(())
}

fn cmd_init(local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(LOCAL_CONFIG_FILE)
    } else {
        match sesh_config::user_config_path() {
            Some(path) => path,
            None => bail!("cannot determine user config directory"),
        }
    };

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    sesh_config::save_config(&resolved(&SeshConfig::default()), &path)?;
    println!("Created {}", path.display());
    Ok(())
}

fn cmd_path() -> Result<()> {
    match sesh_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => bail!("cannot determine user config directory"),
    }
    Ok(())
}
