//! The pipeline steps, generic over the storage backend.
//!
//! Every step reads its inputs first, computes everything it needs and then
//! writes its outputs in a single store commit, so a failing step leaves the
//! store as it was.

use chrono::NaiveDate;
use permitlog_core::{
  diff::diff,
  fact::{Fact, FactLog, ForeignKey},
  identity::ProjectId,
  store::{FactLogStore, IdentityStore, RunStore},
};
use permitlog_parcel::ParcelIndex;
use permitlog_resolve::{Resolution, prune_resolved};
use permitlog_sources::read_sources;

use crate::{
  Error, Result,
  config::PipelineConfig,
  summary::{
    IngestSummary, ResolveSummary, RunSummary, SourceFailure, SourceReport,
    identity_digest,
  },
};

// ─── Ingest ──────────────────────────────────────────────────────────────────

/// Parsed and diffed sources, not yet written.
struct Ingested {
  log:      FactLog,
  appended: Vec<Fact>,
  summary:  IngestSummary,
}

async fn collect<S: FactLogStore>(
  store: &S,
  config: &PipelineConfig,
  run_date: NaiveDate,
) -> Result<Ingested> {
  let inputs = config.source_inputs();
  if inputs.is_empty() {
    tracing::error!("no sources configured");
    return Err(Error::NoSourceLoaded);
  }
  let parsed = tokio::task::spawn_blocking(move || read_sources(&inputs)).await?;
  let mut log = store.load_facts().await.map_err(Error::store)?;
  tracing::debug!(facts = log.len(), "previous fact log loaded");

  let mut summary = IngestSummary::default();
  let mut appended = Vec::new();
  for (kind, result) in parsed {
    let source = match result {
      Ok(source) => source,
      Err(err) => {
        summary.failed.push(SourceFailure {
          source: kind.name(),
          error:  err.to_string(),
        });
        continue;
      }
    };
    let result = diff(&log, source.facts, run_date);
    summary.loaded.push(SourceReport {
      source:    kind.name(),
      records:   source.records,
      new_facts: result.appended.len(),
      unchanged: result.unchanged,
      skipped:   source.warnings.len(),
    });
    log.append(result.appended.iter().cloned());
    appended.extend(result.appended);
  }

  if summary.loaded.is_empty() {
    return Err(Error::NoSourceLoaded);
  }
  if !summary.failed.is_empty() && !config.write_on_partial_failure {
    return Err(Error::PartialFailure {
      failed: summary.failed.iter().map(|f| f.source).collect(),
    });
  }
  summary.new_facts = appended.len();
  Ok(Ingested {
    log,
    appended,
    summary,
  })
}

async fn write_facts<S: FactLogStore>(store: &S, ingested: &mut Ingested) -> Result<()> {
  let facts = std::mem::take(&mut ingested.appended);
  store.append_facts(facts).await.map_err(Error::store)?;
  ingested.summary.written = true;
  tracing::info!(
    new_facts = ingested.summary.new_facts,
    loaded = ingested.summary.loaded.len(),
    failed = ingested.summary.failed.len(),
    "fact log updated"
  );
  Ok(())
}

/// Parse every configured source, diff it against the fact log and append
/// the new facts.
pub async fn ingest<S: FactLogStore>(
  store: &S,
  config: &PipelineConfig,
  run_date: NaiveDate,
) -> Result<RunSummary> {
  let mut ingested = collect(store, config, run_date).await?;
  write_facts(store, &mut ingested).await?;
  Ok(RunSummary {
    run_date,
    ingest: Some(ingested.summary),
    resolve: None,
  })
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

async fn load_parcels(config: &PipelineConfig) -> Result<Option<ParcelIndex>> {
  let Some(path) = config.parcels.clone() else {
    tracing::warn!("no parcel table configured; parcel signals disabled");
    return Ok(None);
  };
  let index = tokio::task::spawn_blocking(move || ParcelIndex::from_path(&path)).await??;
  Ok(Some(index))
}

async fn compute<S: IdentityStore>(
  store: &S,
  log: &FactLog,
  config: &PipelineConfig,
) -> Result<Resolution> {
  let parcels = load_parcels(config).await?;
  let prior = store.load_identity_map().await.map_err(Error::store)?;
  Ok(permitlog_resolve::resolve(
    log,
    &prior,
    parcels.as_ref(),
    &config.resolver,
  )?)
}

fn resolve_summary(resolution: Resolution) -> ResolveSummary {
  ResolveSummary {
    identity_rows:   resolution.identity_map.len(),
    identity_digest: identity_digest(&resolution.identity_map),
    stats:           resolution.stats,
  }
}

/// Resolve the stored fact log against the stored identity map.
pub async fn resolve<S: FactLogStore + IdentityStore>(
  store: &S,
  config: &PipelineConfig,
  run_date: NaiveDate,
) -> Result<RunSummary> {
  let log = store.load_facts().await.map_err(Error::store)?;
  let resolution = compute(store, &log, config).await?;
  store
    .save_resolution(&resolution.identity_map, &resolution.likely_matches)
    .await
    .map_err(Error::store)?;
  Ok(RunSummary {
    run_date,
    ingest: None,
    resolve: Some(resolve_summary(resolution)),
  })
}

/// Ingest and resolve in one step. The new facts, identity map and
/// likely-match report are committed together or not at all.
pub async fn run<S: RunStore>(
  store: &S,
  config: &PipelineConfig,
  run_date: NaiveDate,
) -> Result<RunSummary> {
  let mut ingested = collect(store, config, run_date).await?;
  let resolution = compute(store, &ingested.log, config).await?;
  let facts = std::mem::take(&mut ingested.appended);
  store
    .commit_run(facts, &resolution.identity_map, &resolution.likely_matches)
    .await
    .map_err(Error::store)?;
  ingested.summary.written = true;
  tracing::info!(
    new_facts = ingested.summary.new_facts,
    identity_rows = resolution.identity_map.len(),
    likely_matches = resolution.likely_matches.len(),
    "run committed"
  );
  Ok(RunSummary {
    run_date,
    ingest: Some(ingested.summary),
    resolve: Some(resolve_summary(resolution)),
  })
}

// ─── Promote ─────────────────────────────────────────────────────────────────

/// Bind the unassigned `fk` to the project of `target` and drop the report
/// rows that binding settles.
pub async fn promote<S: IdentityStore>(
  store: &S,
  fk: ForeignKey,
  target: &ForeignKey,
) -> Result<ProjectId> {
  let mut map = store.load_identity_map().await.map_err(Error::store)?;
  let mut report = store.load_likely_matches().await.map_err(Error::store)?;
  let id = permitlog_resolve::promote(&mut map, fk.clone(), target)?;
  let before = report.len();
  prune_resolved(&mut report, &map);

  store
    .save_resolution(&map, &report)
    .await
    .map_err(Error::store)?;
  tracing::info!(
    %fk,
    %target,
    project = %id,
    settled = before - report.len(),
    "foreign key promoted"
  );
  Ok(id)
}
