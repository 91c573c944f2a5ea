//! Replay a recorded batch through the engine and print the report.
//!
//! The input is a JSON file with the taxonomy, the documents and the raw
//! model output recorded for each of them.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use focus_engine::{Engine, EngineConfig, RecordedBatch};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "focus-report")]
#[command(about = "Build a verified, deduplicated focus report from a recorded batch")]
struct Cli {
    /// Recorded batch (JSON)
    #[arg(long, short)]
    input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Drop facts that fail the groundedness check
    #[arg(long)]
    strict: bool,

    /// Maximum concurrent extractor calls
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Emit a partial report if the run is interrupted or times out
    #[arg(long)]
    best_effort: bool,

    /// Cancel the batch after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout stays a clean report)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,focus_engine=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env().context("Failed to load engine config")?;
    if cli.strict {
        config = config.with_strict_mode(true);
    }
    if cli.best_effort {
        config = config.with_best_effort(true);
    }

    let json = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let recorded = RecordedBatch::from_json(&json)
        .with_context(|| format!("Failed to parse recorded batch {}", cli.input.display()))?;
    let (batch, extractor) = recorded.into_parts();

    tracing::info!(
        documents = batch.len(),
        recorded_calls = extractor.len(),
        focus_points = batch.taxonomy.len(),
        "Replaying batch"
    );

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        let deadline = cli.deadline_ms.map(Duration::from_millis);
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_deadline(deadline) => {
                    tracing::warn!("Deadline reached, cancelling batch");
                }
                _ = wait_for_interrupt() => {
                    tracing::warn!("Interrupted, cancelling batch");
                }
            }
            cancel.cancel();
        })
    };

    let engine = Engine::with_config(extractor, config);
    let report = engine
        .run_with_cancel(&batch, cli.concurrency, cancel)
        .await
        .map_err(|e| anyhow::anyhow!("batch failed ({}): {}", e.code(), e))?;
    watcher.abort();

    match cli.format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!("{}", report.to_json().context("Failed to serialize report")?),
    }

    Ok(())
}

/// Resolves after the deadline; never resolves without one.
async fn wait_for_deadline(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}

/// Resolves on ctrl-c; never resolves if the handler cannot be installed.
async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c; relying on the deadline");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_resolves_only_when_set() {
        tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_deadline(Some(Duration::from_millis(10))),
        )
        .await
        .unwrap();

        let without = tokio::time::timeout(Duration::from_millis(50), wait_for_deadline(None)).await;
        assert!(without.is_err());
    }
}
