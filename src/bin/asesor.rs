//! Command-line entry point: answer one question and print the result.
//!
//! Configuration comes from the TOML file when `--config` is given,
//! otherwise from environment variables. The JSON result goes to stdout;
//! tracing and user-facing notices go to stderr. Ctrl-C cancels the run.

use std::path::PathBuf;

use anyhow::Context;
use asesor::{Pipeline, PipelineConfig};
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// Asesor: answers a legal question with text, and optionally audio and an avatar video.
#[derive(Debug, Parser)]
#[command(name = "asesor", version, about)]
struct Cli {
    /// Path to TOML configuration file. Without it, configuration is read
    /// from the environment.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The question to answer; several words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,
}

impl Cli {
    fn question(&self) -> String {
        self.question.join(" ")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("asesor=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::from_env()?,
    };
    let pipeline = Pipeline::from_config(config).context("invalid configuration")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; cancelling run");
            on_interrupt.cancel();
        }
    });

    let result = pipeline
        .run_with_cancel(&cli.question(), &cancel)
        .await
        .map_err(|e| {
            tracing::error!(code = e.code(), error = %e, "run failed");
            anyhow::anyhow!("asesor failed: {e}")
        })?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    for notice in result.notices() {
        eprintln!("{notice}");
    }

    if !result.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}
