/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use io_scheduler::config::EngineConfig;
use io_scheduler::engine::Engine;
use io_scheduler::hal::console::{ConsoleOutputs, ConsoleSerial, SystemClock};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Scheduled Dout / RS-485 / CAN automation engine.
///
/// Example:
///   io-scheduler --config config/events.yaml --run-for 60
#[derive(Debug, Parser)]
#[command(
    name = "io-scheduler",
    about = "Scheduled digital-output and serial automation engine",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML engine configuration (options and seed events).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the calendar poll cadence, in milliseconds.
    #[arg(short = 'p', long = "poll-ms")]
    poll_ms: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl+C.
    #[arg(short = 't', long = "run-for")]
    run_for: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        config   = ?cli.config,
        poll_ms  = ?cli.poll_ms,
        run_for  = ?cli.run_for,
        "io-scheduler starting up..."
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, starting with an empty event table");
            EngineConfig::default()
        }
    };
    if let Some(ms) = cli.poll_ms {
        config.options.calendar_poll = Duration::from_millis(ms.max(1));
    }

    // ── Build engine and seed events ──────────────────────────────────────────
    let engine = Engine::with_options(
        SystemClock::new(),
        ConsoleOutputs::new(),
        ConsoleSerial::new(),
        config.options,
    );
    for (i, seed) in config.events.into_iter().enumerate() {
        engine
            .insert(seed.time, seed.repetition, seed.action)
            .await
            .with_context(|| format!("Cannot create seed event #{}", i + 1))?;
    }

    info!(now = %engine.now().await, "Clock");
    let listed = engine.list().await;
    info!("Loaded {} event(s):", listed.len());
    for (_, summary) in &listed {
        info!("  {}", summary);
    }

    // ── Run until Ctrl+C or the requested duration ────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(shutdown_rx).await })
    };

    match cli.run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "Run time elapsed");
                }
                res = tokio::signal::ctrl_c() => {
                    res.context("Cannot listen for Ctrl+C")?;
                    info!("Ctrl+C received");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Cannot listen for Ctrl+C")?;
            info!("Ctrl+C received");
        }
    }

    let _ = shutdown_tx.send(true);
    runner.await.context("Engine task panicked")?;
    info!("io-scheduler shut down");
    Ok(())
}
