// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nq: operator CLI for the NeuroQueue scheduler.

mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use nq_engine::PassOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nq", version, about = "Rule-based batch scheduler for neuroimaging pipelines")]
struct Cli {
    /// Pipeline configuration document.
    #[arg(short, long, global = true, default_value = "pipeline.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scheduling pass: discover, monitor, reconcile, submit.
    Run {
        /// Render submissions without executing them.
        #[arg(long)]
        dry_run: bool,
        /// Re-queue procedures whose output is already complete.
        #[arg(long)]
        force: bool,
        /// Restrict --force to a single procedure.
        #[arg(long)]
        procedure: Option<String>,
        /// Skip the batch-manager poll for this pass.
        #[arg(long)]
        skip_monitor: bool,
    },
    /// Print the tasks the next pass would submit.
    Manifest,
    /// Summarize the state store.
    Status {
        /// Include historical rows, not just in-flight ones.
        #[arg(long)]
        all: bool,
    },
    /// Poll the batch manager and reconcile against the filesystem.
    Monitor,
    /// Clear failed rows so they re-queue on the next pass.
    Retry {
        #[arg(long)]
        procedure: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run {
            dry_run,
            force,
            procedure,
            skip_monitor,
        } => {
            let options = PassOptions {
                dry_run,
                force,
                procedure,
                skip_monitor,
            };
            commands::run::handle(&cli.config, options).await
        }
        Command::Manifest => commands::manifest::handle(&cli.config),
        Command::Status { all } => commands::status::handle(&cli.config, all),
        Command::Monitor => commands::monitor::handle(&cli.config).await,
        Command::Retry { procedure, subject } => {
            commands::retry::handle(&cli.config, procedure.as_deref(), subject.as_deref())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("NQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli).await {
        match err.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("{exit}");
                std::process::exit(exit.code);
            }
            None => {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}
