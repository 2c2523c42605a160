//! Plinth CLI - plugin lifecycle manager.
//!
//! Discovers plugins from OCI inventories and local directories, installs
//! verified binaries, and keeps the installed set in step with what the
//! configured sources recommend.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plinth_plugins::Target;

mod commands;
mod config_bridge;
mod theme;

use commands::plugin;

/// Plinth - plugin lifecycle manager
#[derive(Parser)]
#[command(name = "plinth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration home (defaults to PLINTH_HOME or the platform data dir)
    #[arg(long, global = true, env = "PLINTH_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List available plugins and their install status
    List {
        /// List the plugins of a local directory instead of the configured sources
        #[arg(long)]
        local: Option<PathBuf>,
    },

    /// Install a plugin
    Install {
        /// Plugin name, or `all` together with --local
        name: String,

        /// Version to install (defaults to the recommended version)
        #[arg(long)]
        version: Option<String>,

        /// Target the plugin is written for (kubernetes, mission-control, global)
        #[arg(short, long)]
        target: Option<Target>,

        /// Install from a local directory
        #[arg(long)]
        local: Option<PathBuf>,
    },

    /// Show an installed plugin
    Describe {
        /// Plugin name
        name: String,

        /// Target of the plugin
        #[arg(short, long)]
        target: Option<Target>,
    },

    /// Delete an installed plugin
    Delete {
        /// Plugin name
        name: String,

        /// Target of the plugin
        #[arg(short, long)]
        target: Option<Target>,

        /// Remove the catalog record even if the binary cannot be removed
        #[arg(short, long)]
        force: bool,
    },

    /// Install every plugin that is missing or out of date
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = plinth_config::Config::load(cli.home.as_deref());

    // Set up logging from config, with --verbose override.
    let mut log_config = match &resolved {
        Ok(resolved) => config_bridge::to_log_config(resolved).unwrap_or_else(|e| {
            eprintln!("Invalid logging configuration: {e:#}");
            plinth_telemetry::LogConfig::default()
        }),
        Err(_) => plinth_telemetry::LogConfig::default(),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = plinth_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = resolved?;
    tracing::debug!(
        home = %resolved.home.display(),
        files = resolved.loaded_files.len(),
        "Loaded configuration"
    );
    let manager = config_bridge::build_manager(&resolved)?;

    match cli.command {
        Commands::Plugin { command } => match command {
            PluginCommands::List { local } => {
                plugin::list_plugins(&manager, local.as_deref()).await?;
            },
            PluginCommands::Install {
                name,
                version,
                target,
                local,
            } => {
                plugin::install_plugin(
                    &manager,
                    &name,
                    version.as_deref(),
                    target,
                    local.as_deref(),
                )
                .await?;
            },
            PluginCommands::Describe { name, target } => {
                plugin::describe_plugin(&manager, &name, target).await?;
            },
            PluginCommands::Delete {
                name,
                target,
                force,
            } => {
                plugin::delete_plugin(&manager, &name, target, force).await?;
            },
            PluginCommands::Sync => {
                plugin::sync_plugins(&manager).await?;
            },
        },
    }

    Ok(())
}
