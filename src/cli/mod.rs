//! CLI module for Tabmux
//!
//! Provides commands:
//! - `serve`: run the session controller over stdin/stdout JSON lines
//! - `flags`: print the flags a program accepts, read from its help output
//! - `config`: print the effective configuration

use crate::server::config::AppConfig;
use crate::server::{self, ServeOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod flags;

/// Tabmux terminal session multiplexer
#[derive(Parser, Debug)]
#[command(name = "tabmux")]
#[command(about = "Terminal session multiplexer with prompt-wait detection")]
#[command(version)]
pub struct Cli {
    /// Configuration file layered over the defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the session controller over stdin/stdout
    Serve {
        /// Start the first session with this many columns without waiting for `ready`
        #[arg(long, requires = "rows")]
        cols: Option<u16>,
        /// Start the first session with this many rows without waiting for `ready`
        #[arg(long, requires = "cols")]
        rows: Option<u16>,
    },
    /// Show the flags a program accepts
    Flags {
        /// Program name or path
        program: String,
        /// Only show flags starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli, app_config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve { cols, rows }) => {
            let options = ServeOptions {
                config_path: cli.config,
                initial_size: cols.zip(rows),
            };
            server::run(app_config, options).await
        }
        Some(Commands::Flags {
            program,
            prefix,
            json,
        }) => flags::run(&app_config, &program, prefix.as_deref(), json).await,
        Some(Commands::Config) => config::run(&app_config),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
