//! End-of-run report.

use std::fmt;

use chrono::NaiveDate;
use permitlog_core::identity::IdentityMap;
use permitlog_resolve::ResolveStats;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One source's contribution to an ingest.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
  pub source:    &'static str,
  pub records:   usize,
  pub new_facts: usize,
  pub unchanged: usize,
  /// Rows skipped by the adapter.
  pub skipped:   usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
  pub source: &'static str,
  pub error:  String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
  pub loaded:    Vec<SourceReport>,
  pub failed:    Vec<SourceFailure>,
  pub new_facts: usize,
  /// Whether the new facts were appended to the store.
  pub written:   bool,
}

impl IngestSummary {
  pub fn rows_skipped(&self) -> usize { self.loaded.iter().map(|s| s.skipped).sum() }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveSummary {
  #[serde(flatten)]
  pub stats:           ResolveStats,
  pub identity_rows:   usize,
  /// SHA-256 of the written identity map, for cross-run comparison.
  pub identity_digest: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub run_date: NaiveDate,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ingest:   Option<IngestSummary>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolve:  Option<ResolveSummary>,
}

/// Hex SHA-256 over the identity map as written: one `uuid,fk` line per row.
pub fn identity_digest(map: &IdentityMap) -> String {
  let mut hasher = Sha256::new();
  for (id, fk) in map.rows() {
    hasher.update(id.to_string().as_bytes());
    hasher.update(b",");
    hasher.update(fk.as_str().as_bytes());
    hasher.update(b"\n");
  }
  hex::encode(hasher.finalize())
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "run date:           {}", self.run_date)?;
    if let Some(ingest) = &self.ingest {
      writeln!(f, "sources loaded:     {}", ingest.loaded.len())?;
      for source in &ingest.loaded {
        writeln!(
          f,
          "  {:<24} {} records, {} new facts, {} skipped rows",
          source.source, source.records, source.new_facts, source.skipped
        )?;
      }
      writeln!(f, "sources failed:     {}", ingest.failed.len())?;
      for failure in &ingest.failed {
        writeln!(f, "  {:<24} {}", failure.source, failure.error)?;
      }
      writeln!(f, "rows skipped:       {}", ingest.rows_skipped())?;
      writeln!(
        f,
        "new facts:          {}{}",
        ingest.new_facts,
        if ingest.written { "" } else { " (not written)" }
      )?;
    }
    if let Some(resolve) = &self.resolve {
      let stats = &resolve.stats;
      writeln!(f, "records:            {}", stats.records)?;
      writeln!(f, "new identities:     {}", stats.new_identities)?;
      writeln!(f, "linked identities:  {}", stats.linked)?;
      writeln!(f, "ambiguous matches:  {}", stats.ambiguous)?;
      writeln!(f, "identity conflicts: {}", stats.conflicts)?;
      writeln!(f, "likely matches:     {}", stats.likely_matches)?;
      writeln!(f, "identity rows:      {}", resolve.identity_rows)?;
      writeln!(f, "identity digest:    {}", resolve.identity_digest)?;
    }
    Ok(())
  }
}
