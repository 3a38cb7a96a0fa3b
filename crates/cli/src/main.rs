// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! chainvisor - blockchain node supervisor with in-place binary upgrades

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod exit_error;
mod logging;
mod signals;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cv_adapters::DefaultFetcher;
use cv_core::Config;
use cv_engine::{RunOutcome, Runner};
use exit_error::{ExitError, EXIT_CONFIG};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "chainvisor",
    version,
    about = "Run a blockchain node and upgrade its binary in place"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon, passing every argument through to it
    Run(RunArgs),
}

#[derive(Args)]
#[command(disable_help_flag = true)]
struct RunArgs {
    /// Arguments for the daemon
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(e) => {
            let code = e.downcast_ref::<ExitError>().map_or(1, |c| c.code);
            let msg = format_error(&e);
            if !msg.is_empty() {
                eprintln!("Error: {}", msg);
            }
            std::process::exit(code);
        }
    }
}

/// Render an error and its causes, skipping causes the top-level message
/// already repeats.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let Commands::Run(args) = cli.command;

    let config = Config::from_env().map_err(|e| ExitError::new(EXIT_CONFIG, e.to_string()))?;
    if !config.disable_logs {
        logging::init();
    }
    tracing::info!("configuration loaded\n{}", config.detail_string());

    let cancel = CancellationToken::new();
    let (signal_tx, signal_rx) = mpsc::channel(4);
    let forwarder = tokio::spawn(signals::forward(signal_tx, cancel.clone()));

    let runner = Runner::new(config, args.args, DefaultFetcher::new())
        .map_err(|e| ExitError::new(e.exit_code(), e.to_string()))?
        .with_cancel(cancel.clone())
        .with_signals(signal_rx);
    let result = runner.run().await;

    cancel.cancel();
    if let Ok(Err(e)) = forwarder.await {
        tracing::warn!(error = %e, "signal forwarding failed");
    }

    match result {
        Ok(RunOutcome::Stopped) => Ok(()),
        Ok(RunOutcome::UpgradedNoRestart) => {
            tracing::info!("upgrade applied, not restarting");
            Ok(())
        }
        Err(e) => Err(ExitError::new(e.exit_code(), e.to_string()).into()),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
