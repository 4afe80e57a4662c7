use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use auto_accept::{InviteAutoAccepter, ModuleApi};
use clap::Parser;
use host::{load_settings, MemoryHost};
use shared::domain::MembershipEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays recorded room events through the invite auto-accepter and prints
/// the resulting server state.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "host.toml")]
    config: PathBuf,
    /// File with one JSON event per line. Blank lines and `#` comments are skipped.
    #[arg(long)]
    events: PathBuf,
    /// Overrides the worker name from the settings file.
    #[arg(long)]
    worker_name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(worker_name) = args.worker_name {
        settings.worker_name = Some(worker_name);
    }

    let host = Arc::new(MemoryHost::new(
        settings.server_name.clone(),
        settings.worker_name.clone(),
    ));
    let accepter = InviteAutoAccepter::new(settings.module, Arc::clone(&host) as Arc<dyn ModuleApi>);
    info!(
        server_name = %settings.server_name,
        worker_name = ?settings.worker_name,
        active = accepter.is_active(),
        "auto-accept module loaded"
    );

    let file = tokio::fs::File::open(&args.events)
        .await
        .with_context(|| format!("failed to open events file '{}'", args.events.display()))?;
    let mut lines = LinesStream::new(BufReader::new(file).lines());
    let mut line_number = 0usize;
    let mut replayed = 0usize;
    while let Some(line) = lines.next().await {
        line_number += 1;
        let line = line.context("failed to read events file")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: MembershipEvent = serde_json::from_str(line)
            .with_context(|| format!("invalid event on line {line_number}"))?;
        host.dispatch(&event).await;
        replayed += 1;
    }

    host.drain_detached().await;
    info!(replayed, "replay finished");

    println!("{}", serde_json::to_string_pretty(&host.report().await)?);
    Ok(())
}
