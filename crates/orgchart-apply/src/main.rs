//! CLI entry point for the orgchart-apply batch driver.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use orgchart_engine::TransactionEngine;
use orgchart_graph::{EntityStore, GraphClient, InMemoryStore, TimeoutStore};
use orgchart_journal::FileJournalStore;

use orgchart_apply::config::{load_apply_config, load_graph_config};
use orgchart_apply::{apply_and_save, apply_batch, load_counters, read_records, ApplyConfig};

#[derive(Parser)]
#[command(name = "orgchart-apply")]
#[command(about = "Apply organisational-change transactions to the Orgchart entity graph")]
struct Cli {
    /// Transaction batch: a JSON array of records.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Config file prefix (default: orgchart).
    #[arg(short, long, default_value = "orgchart")]
    config: String,

    /// Apply against an empty in-memory store. Counters are not saved.
    #[arg(long)]
    dry_run: bool,

    /// Create the government root entity if it is missing.
    #[arg(long)]
    bootstrap: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if cli.input.is_none() && !cli.bootstrap {
        anyhow::bail!("Specify --input <batch.json> and/or --bootstrap");
    }

    let apply_config = load_apply_config(&cli.config)?;

    if cli.dry_run {
        tracing::info!("Dry run against in-memory store");
        let store = TimeoutStore::new(InMemoryStore::new(), apply_config.store_timeout());
        return run(store, &cli, &apply_config).await;
    }

    let graph_config = load_graph_config(&cli.config)?;
    let graph = GraphClient::connect(&graph_config).await?;
    graph.ensure_schema().await?;
    tracing::info!(uri = %graph_config.uri, "Connected to Neo4j");

    let store = TimeoutStore::new(graph, apply_config.store_timeout());
    run(store, &cli, &apply_config).await
}

async fn run<S: EntityStore>(store: S, cli: &Cli, config: &ApplyConfig) -> anyhow::Result<()> {
    let counters_path = Path::new(&config.counters_path);
    let counters = load_counters(counters_path)?;
    let mut engine = TransactionEngine::new(store, counters);

    if cli.bootstrap || cli.dry_run {
        let government = engine.bootstrap_government().await?;
        engine.take_steps();
        tracing::info!(id = %government.id, "Government ready");
    }

    let mut failed = 0;
    if let Some(input) = &cli.input {
        let records = read_records(input)?;
        tracing::info!(path = %input.display(), records = records.len(), "Batch loaded");

        let report = if cli.dry_run {
            apply_batch(&mut engine, &records, None::<&FileJournalStore>, config.stop_on_error)
                .await?
        } else {
            let journal = FileJournalStore::new(&config.journal_dir)?;
            apply_and_save(
                &mut engine,
                &records,
                Some(&journal),
                config.stop_on_error,
                counters_path,
            )
            .await?
        };

        for outcome in report.outcomes.iter().filter(|o| !o.is_applied()) {
            if let Err(error) = &outcome.result {
                tracing::error!(
                    index = outcome.index,
                    operation = %outcome.operation,
                    journal_id = ?outcome.journal_id,
                    %error,
                    "Record not applied"
                );
            }
        }
        failed = report.failed();
    }

    if failed > 0 {
        anyhow::bail!("{failed} transaction(s) failed");
    }
    Ok(())
}
