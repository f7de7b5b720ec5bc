// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! # Tool Execution Hub CLI
//!
//! `toolhub` is the minimal external collaborator surface from spec §6:
//! `scan`, `list [--detail short|normal|full]`, `verify`. Exit code 0 on
//! success, 1 when an explicitly requested config file is missing.
//!
//! Everything else — `initAllTools`/`invokeTool`/hot reload/etc. — is the
//! `ToolHub` facade's programmatic API; this binary only drives it.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use toolhub_cli::commands::{self, Detail};
use toolhub_cli::config::load_hub_config;

/// Minimal external CLI surface for the Tool Execution Hub.
#[derive(Parser)]
#[command(name = "toolhub")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a toolhub.json config file (overrides auto-discovery).
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "TOOLHUB_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the configured discovery roots and report what was found.
    Scan,
    /// List every registered tool.
    List {
        #[arg(long, value_enum, default_value = "normal")]
        detail: Detail,
    },
    /// Scan and exit non-zero if any discovery error was found.
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match load_hub_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Scan => commands::scan(config).await?,
        Commands::List { detail } => commands::list(config, detail).await?,
        Commands::Verify => {
            let clean = commands::verify(config).await?;
            if !clean {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}
