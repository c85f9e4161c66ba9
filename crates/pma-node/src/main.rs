//! # PMA Node
//!
//! Entry point for the private messaging ledger node.

use anyhow::{Context, Result};
use clap::Parser;
use pma_messaging::prelude::*;
use pma_node::{run, Args, MetricsEventPublisher, NodeConfig, RunStats};
use pma_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tokio::io::{self, AsyncBufRead, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &args.log_level {
        telemetry = telemetry.with_log_level(level);
    }
    let _telemetry = init_telemetry(telemetry).context("Failed to initialize telemetry")?;

    let config = NodeConfig::load(args)?;

    info!("===========================================");
    info!("  PMA Node v{}", pma_messaging::VERSION);
    info!("  {}", pma_messaging::SUBSYSTEM_NAME);
    info!("===========================================");

    let result = match config.ledger_path() {
        Some(path) => {
            let dir = config.data_dir.clone().unwrap_or_default();
            let _lock = DataDirLock::acquire(&dir)
                .with_context(|| format!("Failed to lock data directory {}", dir.display()))?;
            let store = FileBackedKVStore::open(&path)
                .with_context(|| format!("Failed to open ledger {}", path.display()))?;
            info!(path = %path.display(), "Opened durable ledger");
            serve(&config, store).await
        }
        None => {
            info!("Running with an in-memory ledger");
            serve(&config, InMemoryKVStore::new()).await
        }
    };

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Node stopped with an error");
    }

    if config.print_metrics {
        eprintln!("{}", encode_metrics()?);
    }

    result
}

async fn serve<KV>(config: &NodeConfig, store: KV) -> Result<()>
where
    KV: KeyValueStore + 'static,
{
    let service = MessagingService::new(
        MessagingDependencies {
            kv_store: store,
            serializer: BincodeRecordSerializer,
            publisher: MetricsEventPublisher,
        },
        config.messaging.clone(),
    );
    let handle =
        Sequencer::spawn(service, config.channel_capacity).context("Failed to start sequencer")?;

    let input = open_input(config).await?;
    let stats = run(&handle, input, std::io::stdout().lock()).await;

    let summary = handle.shutdown().await.context("Sequencer stopped unexpectedly")?;
    log_health(&summary, stats.as_ref().ok());
    stats.map(|_| ())
}

async fn open_input(config: &NodeConfig) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match &config.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open operations file {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn log_health(summary: &SequencerSummary, stats: Option<&RunStats>) {
    info!(
        version = pma_messaging::VERSION,
        height = summary.height,
        last_message_id = summary.last_message_id,
        writes_committed = summary.stats.writes_committed,
        writes_rejected = summary.stats.writes_rejected,
        reads_served = summary.stats.reads_served,
        reads_rejected = summary.stats.reads_rejected,
        "Ledger health"
    );
    if let Some(stats) = stats {
        info!(
            transactions = stats.transactions,
            queries = stats.queries,
            skipped_lines = stats.skipped_lines,
            "Input processed"
        );
    }
}
