//! Detour - transit disruption response CLI
//!
//! The `detour` command runs detection events through the response pipeline
//! and manages the stored disruptions.
//!
//! ## Commands
//!
//! - `process`: run a JSON file of detection events through the pipeline
//! - `gate`: dry-run admission and severity for one event
//! - `show`: print a stored disruption
//! - `list`: list stored disruptions
//! - `resolve` / `cancel`: close a disruption
//! - `delay`: record a new delay figure

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use detour_core::metrics::METRICS;
use detour_core::telemetry::{init_tracing, LogFormat};
use detour_core::{
    DetectionEvent, DetectionOutcome, DetourConfig, DisruptionId, DisruptionRecord,
    DisruptionRepository, DisruptionStatus, Orchestrator, StaticDirectory,
    SurrealDisruptionRepository, ThresholdGate,
};

#[derive(Parser)]
#[command(name = "detour")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Transit disruption response orchestration", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(long, global = true, env = "DETOUR_CONFIG")]
    config: Option<PathBuf>,

    /// Database: `mem`, a SurrealDB URL, or a local directory
    #[arg(long, global = true, env = "DETOUR_DB", default_value = ".detour/db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection events through the pipeline
    Process {
        /// JSON file holding one event or an array of events
        events: PathBuf,

        /// JSON stop list used to name nearby stops and lines
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Show the admission verdict and severity for one event without storing it
    Gate {
        /// JSON file holding one detection event
        event: PathBuf,
    },

    /// Print a stored disruption as JSON
    Show { id: String },

    /// List stored disruptions
    List {
        /// Only disruptions in this status (e.g. ACTIVE)
        #[arg(long)]
        status: Option<DisruptionStatus>,
    },

    /// Mark a disruption resolved
    Resolve { id: String },

    /// Withdraw a disruption
    Cancel {
        id: String,

        #[arg(short, long, default_value = "withdrawn by operator")]
        reason: String,
    },

    /// Record a new delay figure and recompute severity
    Delay { id: String, minutes: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Plain
    };
    init_tracing(format, level);

    let config = match &cli.config {
        Some(path) => DetourConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DetourConfig::default(),
    };

    if let Commands::Gate { event } = &cli.command {
        return cmd_gate(&config, event);
    }

    let repository = open_repository(&cli.db)
        .await
        .context("Failed to open Detour database")?;

    let result = match cli.command {
        Commands::Process { events, directory } => {
            cmd_process(repository, config, &events, directory.as_deref()).await
        }
        Commands::Gate { .. } => Ok(()),
        Commands::Show { id } => cmd_show(repository.as_ref(), &id).await,
        Commands::List { status } => cmd_list(repository.as_ref(), status).await,
        Commands::Resolve { id } => cmd_resolve(repository, config, &id).await,
        Commands::Cancel { id, reason } => cmd_cancel(repository, config, &id, &reason).await,
        Commands::Delay { id, minutes } => cmd_delay(repository, config, &id, minutes).await,
    };

    METRICS.flush();
    result
}

async fn open_repository(db: &str) -> Result<Arc<dyn DisruptionRepository>> {
    let repository = if db == "mem" {
        SurrealDisruptionRepository::in_memory().await?
    } else if db.contains("://") {
        SurrealDisruptionRepository::connect(db).await?
    } else {
        SurrealDisruptionRepository::open_local(Path::new(db)).await?
    };
    Ok(Arc::new(repository))
}

fn read_events(path: &Path) -> Result<Vec<DetectionEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let events = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(events)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run every event in the file, continuing past per-event failures.
async fn cmd_process(
    repository: Arc<dyn DisruptionRepository>,
    config: DetourConfig,
    events: &Path,
    directory: Option<&Path>,
) -> Result<()> {
    let mut builder = Orchestrator::builder(repository).config(config);
    if let Some(path) = directory {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let directory = StaticDirectory::from_json(&raw)
            .with_context(|| format!("Invalid stop list {}", path.display()))?;
        info!(stops = directory.len(), "Loaded stop directory");
        builder = builder.directory(Arc::new(directory));
    }
    let orchestrator = builder.build();

    let events = read_events(events)?;
    let mut failures = 0usize;
    for (i, event) in events.into_iter().enumerate() {
        match orchestrator.handle_detection(event).await {
            Ok(DetectionOutcome::Dropped) => {
                println!("#{i}: dropped (below admission thresholds)")
            }
            Ok(DetectionOutcome::Duplicate { existing }) => {
                println!("#{i}: duplicate of {existing}")
            }
            Ok(DetectionOutcome::Processed(report)) => {
                println!(
                    "#{i}: {} [{} / {}] {}",
                    report.record.id,
                    report.record.status,
                    report.record.severity,
                    report.record.name
                );
                println!("    {}", report.solution.action_summary);
                for line in &report.solution.instructions {
                    println!("      {line}");
                }
                println!("    {}", report.solution.estimated_impact);
            }
            Err(e) => {
                failures += 1;
                eprintln!("#{i}: failed: {e}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} event(s) failed");
    }
    Ok(())
}

fn cmd_gate(config: &DetourConfig, path: &Path) -> Result<()> {
    let gate = ThresholdGate::new(config.gate.clone());
    let mut events = read_events(path)?;
    if events.len() != 1 {
        bail!("expected exactly one event, found {}", events.len());
    }
    let event = events.remove(0);
    event.validate()?;

    let verdict = gate.admit(&event);
    let record = event.into_record(DisruptionId::from("dry-run"), Utc::now());
    let report = serde_json::json!({
        "admitted": verdict.admitted(),
        "triggers": verdict.triggers,
        "severity_score": gate.severity_score(&record),
        "severity": gate.calculate_severity(&record),
        "immediate_action": gate.requires_immediate_action(&record),
    });
    print_json(&report)
}

async fn cmd_show(repository: &dyn DisruptionRepository, id: &str) -> Result<()> {
    match repository.find_by_id(&DisruptionId::from(id)).await? {
        Some(record) => print_json(&record),
        None => bail!("No disruption with id '{id}'"),
    }
}

async fn cmd_list(
    repository: &dyn DisruptionRepository,
    status: Option<DisruptionStatus>,
) -> Result<()> {
    let records: Vec<DisruptionRecord> = match status {
        Some(status) => repository.find_by_status(status).await?,
        None => repository.list().await?,
    };

    if records.is_empty() {
        println!("No disruptions found.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:<9}  {:<8}  {}  {}",
            record.id,
            record.status,
            record.severity,
            record.detected_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.name
        );
    }
    Ok(())
}

async fn cmd_resolve(
    repository: Arc<dyn DisruptionRepository>,
    config: DetourConfig,
    id: &str,
) -> Result<()> {
    let orchestrator = Orchestrator::builder(repository).config(config).build();
    if !orchestrator.resolve(&DisruptionId::from(id)).await? {
        bail!("No disruption with id '{id}'");
    }
    println!("Resolved {id}");
    Ok(())
}

async fn cmd_cancel(
    repository: Arc<dyn DisruptionRepository>,
    config: DetourConfig,
    id: &str,
    reason: &str,
) -> Result<()> {
    let orchestrator = Orchestrator::builder(repository).config(config).build();
    if !orchestrator.cancel(&DisruptionId::from(id), reason).await? {
        bail!("No disruption with id '{id}'");
    }
    println!("Cancelled {id}: {reason}");
    Ok(())
}

async fn cmd_delay(
    repository: Arc<dyn DisruptionRepository>,
    config: DetourConfig,
    id: &str,
    minutes: u32,
) -> Result<()> {
    let orchestrator = Orchestrator::builder(repository).config(config).build();
    let id = DisruptionId::from(id);
    if !orchestrator.update_delay(&id, minutes).await? {
        bail!("No disruption with id '{id}'");
    }
    if let Some(record) = orchestrator.record(&id).await? {
        println!("{id}: delay {minutes} min, severity {}", record.severity);
    }
    Ok(())
}
