//! [`CsvStore`]: the file implementation of the store traits.

use std::path::{Path, PathBuf};

use permitlog_core::{
  fact::{Fact, FactLog},
  identity::{IdentityMap, LikelyMatch},
  store::{FactLogStore, IdentityStore, RunStore},
};

use crate::{
  Result,
  encode::{
    FACT_HEADER, FactRow, IDENTITY_HEADER, IdentityRow, LIKELY_HEADER, LikelyRow,
  },
  file::{Staging, read_rows},
};

pub const FACTS_FILE: &str = "facts.csv";
pub const IDENTITY_FILE: &str = "identity_map.csv";
pub const LIKELY_FILE: &str = "likely_matches.csv";

/// Locations of the three files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPaths {
  pub facts:          PathBuf,
  pub identity_map:   PathBuf,
  pub likely_matches: PathBuf,
}

impl CsvPaths {
  /// The default file names inside `dir`.
  pub fn in_dir(dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref();
    Self {
      facts:          dir.join(FACTS_FILE),
      identity_map:   dir.join(IDENTITY_FILE),
      likely_matches: dir.join(LIKELY_FILE),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Fact log, identity map and likely-match report kept as CSV files.
///
/// File work runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct CsvStore {
  paths: CsvPaths,
}

impl CsvStore {
  pub fn new(paths: CsvPaths) -> Self { Self { paths } }

  pub fn in_dir(dir: impl AsRef<Path>) -> Self { Self::new(CsvPaths::in_dir(dir)) }

  pub fn paths(&self) -> &CsvPaths { &self.paths }
}

fn identity_rows(map: &IdentityMap) -> Vec<IdentityRow> {
  map
    .rows()
    .map(|(id, fk)| IdentityRow::encode(id, fk))
    .collect()
}

fn likely_rows(matches: &[LikelyMatch]) -> Vec<LikelyRow> {
  matches.iter().map(LikelyRow::from).collect()
}

async fn blocking<T, F>(f: F) -> Result<T>
where
  T: Send + 'static,
  F: FnOnce() -> Result<T> + Send + 'static,
{
  tokio::task::spawn_blocking(f).await?
}

// ─── FactLogStore impl ───────────────────────────────────────────────────────

impl FactLogStore for CsvStore {
  type Error = crate::Error;

  async fn load_facts(&self) -> Result<FactLog> {
    let path = self.paths.facts.clone();
    let facts = blocking(move || read_rows(&path, FactRow::decode)).await?;
    tracing::debug!(path = %self.paths.facts.display(), facts = facts.len(), "fact log loaded");
    Ok(FactLog::from_facts(facts))
  }

  async fn append_facts(&self, facts: Vec<Fact>) -> Result<()> {
    if facts.is_empty() {
      return Ok(());
    }
    let path = self.paths.facts.clone();
    let written = blocking(move || {
      let mut staging = Staging::new();
      let written = staging.append_rows(&path, &FACT_HEADER, facts.iter().map(FactRow::from))?;
      staging.publish()?;
      Ok(written)
    })
    .await?;
    tracing::info!(path = %self.paths.facts.display(), facts = written, "facts appended");
    Ok(())
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for CsvStore {
  type Error = crate::Error;

  async fn load_identity_map(&self) -> Result<IdentityMap> {
    let path = self.paths.identity_map.clone();
    let rows = blocking(move || read_rows(&path, IdentityRow::decode)).await?;
    Ok(IdentityMap::from_rows(rows)?)
  }

  async fn load_likely_matches(&self) -> Result<Vec<LikelyMatch>> {
    let path = self.paths.likely_matches.clone();
    blocking(move || read_rows(&path, LikelyRow::decode)).await
  }

  async fn save_resolution<'a>(
    &'a self,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> Result<()> {
    let identities = identity_rows(map);
    let likely = likely_rows(matches);
    let paths = self.paths.clone();
    let (rows, reported) = blocking(move || {
      let mut staging = Staging::new();
      let rows = staging.replace_rows(&paths.identity_map, &IDENTITY_HEADER, identities)?;
      let reported = staging.replace_rows(&paths.likely_matches, &LIKELY_HEADER, likely)?;
      staging.publish()?;
      Ok((rows, reported))
    })
    .await?;
    tracing::info!(identity_rows = rows, likely_matches = reported, "resolution written");
    Ok(())
  }
}

// ─── RunStore impl ───────────────────────────────────────────────────────────

impl RunStore for CsvStore {
  async fn commit_run<'a>(
    &'a self,
    facts: Vec<Fact>,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> Result<()> {
    let identities = identity_rows(map);
    let likely = likely_rows(matches);
    let paths = self.paths.clone();
    let (appended, rows, reported) = blocking(move || {
      let mut staging = Staging::new();
      let appended = if facts.is_empty() {
        0
      } else {
        staging.append_rows(&paths.facts, &FACT_HEADER, facts.iter().map(FactRow::from))?
      };
      let rows = staging.replace_rows(&paths.identity_map, &IDENTITY_HEADER, identities)?;
      let reported = staging.replace_rows(&paths.likely_matches, &LIKELY_HEADER, likely)?;
      staging.publish()?;
      Ok((appended, rows, reported))
    })
    .await?;
    tracing::info!(
      facts = appended,
      identity_rows = rows,
      likely_matches = reported,
      "run committed"
    );
    Ok(())
  }
}
