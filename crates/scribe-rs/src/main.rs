//! Command-line client for submitting and analyzing encrypted writing samples.

use anyhow::{Context, bail};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use scribe_rs::config::{LayeredConfigOptions, ScribeConfig};
use scribe_rs::core::projection::{self, CategoryFilter, Dashboard};
use scribe_rs::core::{DeskError, SampleDraft, StoreError, WriteStage};
use scribe_rs::protocol::{Category, OperationStatus, Record, RecordId};
use scribe_rs::{Scribe, init_logging};
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Ciphertext characters shown in listings.
const PREVIEW_CHARS: usize = 24;

/// Command-line options for the Scribe client.
#[derive(Parser)]
#[command(name = "scribe", version, about = "Encrypted writing samples over a key/value ledger")]
struct Cli {
    /// Optional path to a scribe.json5 config file, applied over the layered config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Account that signs ledger writes
    #[arg(long, global = true)]
    account: Option<String>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt and upload a writing sample
    Submit {
        /// Subject the sample concerns
        #[arg(long)]
        owner: String,
        #[arg(long, default_value = "medium")]
        category: Category,
        /// Sample text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the sample text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List samples, newest first
    List {
        /// Case-insensitive match on owner id or record id
        #[arg(long, default_value = "")]
        search: String,
        /// `all`, `low`, `medium` or `high`
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        /// Show at most this many records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Analyze a pending sample owned by the connected account
    Analyze {
        id: String,
        /// Skip the ownership check
        #[arg(long)]
        any_owner: bool,
    },
    /// Show dashboard counts
    Stats,
    /// Index records whose index append failed
    Reconcile {
        /// Record ids reported by an earlier failed submit
        ids: Vec<String>,
    },
}

/// Entry point for the Scribe CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    info!(
        "starting scribe (config_set={}, account_set={})",
        cli.config.is_some(),
        cli.account.is_some()
    );

    let cwd = std::env::current_dir().context("resolve working directory")?;
    let config = load_config(&cwd, cli.config.as_deref())?;
    let scribe = Scribe::open(config, &cwd).context("open scribe client")?;
    if let Some(account) = cli.account {
        scribe.identity().connect(account);
    }

    let printer = spawn_status_printer(&scribe);
    let result = run(&scribe, cli.command, cli.json).await;
    // Dropping the client closes the event bus so the printer drains and exits.
    drop(scribe);
    if let Err(err) = printer.await {
        debug!("status printer ended abnormally (err={})", err);
    }
    result
}

fn load_config(cwd: &Path, runtime: Option<&Path>) -> anyhow::Result<ScribeConfig> {
    let mut options = LayeredConfigOptions::new(cwd);
    if let Some(path) = runtime {
        options = options.with_runtime_path(path);
    }
    let layered = ScribeConfig::load_layered_with_options(options).context("load config")?;
    debug!("config layers loaded (count={})", layered.layers.len());
    Ok(layered.config)
}

/// Echo operation status lines to stderr as they change.
fn spawn_status_printer(scribe: &Scribe) -> JoinHandle<()> {
    let mut events = scribe.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(op) = event.state.operation() {
                        let label = match op.status {
                            OperationStatus::Pending => "..",
                            OperationStatus::Success => "ok",
                            OperationStatus::Error => "!!",
                        };
                        eprintln!("[{label}] {}", op.message);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("status printer lagged (skipped={})", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn run(scribe: &Scribe, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Submit {
            owner,
            category,
            text,
            file,
        } => {
            let content = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("read sample from {}", path.display()))?,
                (None, None) => bail!("provide the sample with --text or --file"),
            };
            let record = scribe
                .desk()
                .submit(SampleDraft::new(owner, category, content))
                .await
                .map_err(explain)?;
            print_record(&record, json)
        }
        Command::List {
            search,
            category,
            limit,
        } => {
            let snapshot = scribe.desk().refresh().await.context("refresh records")?;
            for skipped in &snapshot.skipped {
                eprintln!("skipped {}: {}", skipped.id, skipped.reason);
            }
            if let Some(warning) = &snapshot.index_warning {
                eprintln!("index warning: {warning:?}");
            }
            let matched = projection::filter(&snapshot.records, &search, category);
            let shown = projection::recent(&matched, limit.unwrap_or(matched.len()));
            if json {
                println!("{}", serde_json::to_string_pretty(shown)?);
            } else {
                for record in shown {
                    println!("{}", record_line(record));
                }
            }
            Ok(())
        }
        Command::Analyze { id, any_owner } => {
            let id = RecordId::new(id);
            if !any_owner {
                scribe.desk().ensure_analyzable(&id).await.map_err(explain)?;
            }
            let record = scribe.desk().analyze(&id).await.map_err(explain)?;
            print_record(&record, json)
        }
        Command::Stats => {
            let snapshot = scribe.desk().refresh().await.context("refresh records")?;
            let records = &snapshot.records;
            let dashboard = Dashboard::from_records(records);
            let shares = projection::status_shares(records);
            let by_category = projection::counts_by_category(records);
            if json {
                let value = json!({
                    "dashboard": dashboard,
                    "statusShares": shares,
                    "byCategory": by_category,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "total {}  pending {}  completed {}  failed {}",
                    dashboard.total, dashboard.pending, dashboard.completed, dashboard.failed
                );
                for share in shares {
                    println!("  {:<10} {:>5.1}%", share.status.as_str(), share.percent);
                }
                for (category, count) in by_category {
                    println!("  {:<10} {count}", category.as_str());
                }
            }
            Ok(())
        }
        Command::Reconcile { ids } => {
            let store = scribe.store();
            for id in ids {
                let id = RecordId::new(id);
                if !store.adopt_orphan(&id).await.context("inspect orphan")? {
                    eprintln!("no record stored under {id}; skipping");
                }
            }
            let recovered = store.reconcile().await.map_err(|err| explain(err.into()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recovered)?);
            } else {
                for id in &recovered {
                    println!("indexed {id}");
                }
                let left = store.orphans();
                if !left.is_empty() {
                    eprintln!("{} record(s) still unindexed", left.len());
                }
            }
            Ok(())
        }
    }
}

/// Turn desk errors into actionable CLI errors.
fn explain(err: DeskError) -> anyhow::Error {
    if err.is_identity_required() {
        return anyhow::anyhow!("connect an account first (pass --account <id>)");
    }
    if let DeskError::NotOwner { .. } = &err {
        eprintln!("pass --any-owner to analyze a record you do not own");
    }
    if let DeskError::Store(StoreError::LedgerWriteFailed {
        stage: WriteStage::Index { record },
        ..
    }) = &err
    {
        eprintln!("record {record} was stored but not indexed; run `scribe reconcile {record}`");
    }
    anyhow::Error::new(err)
}

fn print_record(record: &Record, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        println!("{}", record_line(record));
        if let Some(result) = &record.result {
            println!("  result: {result}");
        }
    }
    Ok(())
}

fn record_line(record: &Record) -> String {
    let date = DateTime::from_timestamp(record.created_at, 0)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    format!(
        "#{:<6} {:<20} {:<6} {:<9} {}  {}",
        projection::short_id(record),
        record.owner_id,
        record.category.as_str(),
        record.status.as_str(),
        date,
        projection::payload_preview(&record.payload, PREVIEW_CHARS)
    )
}
