//! `permitlog`: batch ingest and entity resolution for development permits.
//!
//! # Usage
//!
//! ```
//! permitlog run
//! permitlog --config /etc/permitlog.toml --run-date 2020-01-29 ingest
//! permitlog promote mohcd_pipeline_2014-001 ppts_2014-000123PRJ
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use permitlog_cli::{PipelineConfig, RunSummary, StoreConfig, pipeline};
use permitlog_core::{
  fact::{ForeignKey, parse_run_date},
  store::RunStore,
};
use permitlog_store_csv::CsvStore;
use permitlog_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "permitlog", version, about = "Permit fact log and project identity resolver")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "permitlog.toml", global = true)]
  config: PathBuf,

  /// Run date stamped on new facts, YYYY-MM-DD (default: today).
  #[arg(long, value_parser = parse_date, global = true)]
  run_date: Option<NaiveDate>,

  /// Print the run summary as JSON.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Parse the configured sources and append new facts to the fact log.
  Ingest,
  /// Resolve the fact log into the identity map and likely-match report.
  Resolve,
  /// Ingest, then resolve, committing all outputs together.
  Run,
  /// Bind an unassigned foreign key to the project of another.
  Promote {
    /// The unassigned foreign key.
    fk:     String,
    /// A foreign key already bound to the project to join.
    target: String,
  },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
  parse_run_date(value).map_err(|e| e.to_string())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let config = PipelineConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration {}", cli.config.display()))?;
  let run_date = cli
    .run_date
    .unwrap_or_else(|| chrono::Local::now().date_naive());

  match &config.store {
    StoreConfig::Csv { dir } => {
      let store = CsvStore::in_dir(dir);
      execute(&store, &cli, &config, run_date).await
    }
    StoreConfig::Sqlite { path } => {
      let store = SqliteStore::open(path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      execute(&store, &cli, &config, run_date).await
    }
  }
}

async fn execute<S>(
  store: &S,
  cli: &Cli,
  config: &PipelineConfig,
  run_date: NaiveDate,
) -> anyhow::Result<()>
where
  S: RunStore,
{
  let summary = match &cli.command {
    Command::Ingest => pipeline::ingest(store, config, run_date).await?,
    Command::Resolve => pipeline::resolve(store, config, run_date).await?,
    Command::Run => pipeline::run(store, config, run_date).await?,
    Command::Promote { fk, target } => {
      let id = pipeline::promote(
        store,
        ForeignKey::new(fk.as_str()),
        &ForeignKey::new(target.as_str()),
      )
      .await
      .with_context(|| format!("failed to promote {fk}"))?;
      if cli.json {
        println!("{}", serde_json::json!({ "fk": fk, "project_id": id.to_string() }));
      } else {
        println!("{fk} -> {id}");
      }
      return Ok(());
    }
  };
  print_summary(&summary, cli.json)
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
  if json {
    let text = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
    println!("{text}");
  } else {
    print!("{summary}");
  }
  Ok(())
}
