//! Pipeline configuration, deserialised from `permitlog.toml` and
//! `PERMITLOG_*` environment variables.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use permitlog_resolve::ResolverConfig;
use permitlog_sources::SourceKind;
use serde::Deserialize;

/// Where the fact log and identity artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
  /// `facts.csv`, `identity_map.csv` and `likely_matches.csv` in `dir`.
  Csv { dir: PathBuf },
  /// One SQLite database file.
  Sqlite { path: PathBuf },
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self::Csv {
      dir: PathBuf::from("data"),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub store:                    StoreConfig,
  /// Snapshot file per source, by source name.
  pub sources:                  BTreeMap<SourceKind, PathBuf>,
  /// Reference parcel table. Without it the parcel signals never fire.
  pub parcels:                  Option<PathBuf>,
  pub resolver:                 ResolverConfig,
  /// Write outputs when at least one source loaded, even if others failed.
  pub write_on_partial_failure: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      store:                    StoreConfig::default(),
      sources:                  BTreeMap::new(),
      parcels:                  None,
      resolver:                 ResolverConfig::default(),
      write_on_partial_failure: true,
    }
  }
}

impl PipelineConfig {
  /// Layer `path` (optional) under `PERMITLOG_*` variables. Nested keys use a
  /// double underscore, e.g. `PERMITLOG_STORE__DIR`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PERMITLOG").separator("__"))
      .build()?;
    let mut cfg: Self = settings.try_deserialize()?;
    cfg.expand_paths();
    Ok(cfg)
  }

  /// Sources in canonical order.
  pub fn source_inputs(&self) -> Vec<(SourceKind, PathBuf)> {
    self
      .sources
      .iter()
      .map(|(kind, path)| (*kind, path.clone()))
      .collect()
  }

  fn expand_paths(&mut self) {
    match &mut self.store {
      StoreConfig::Csv { dir } => *dir = expand_tilde(dir),
      StoreConfig::Sqlite { path } => *path = expand_tilde(path),
    }
    for path in self.sources.values_mut() {
      *path = expand_tilde(path);
    }
    if let Some(path) = &mut self.parcels {
      *path = expand_tilde(path);
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use permitlog_resolve::AmbiguousPolicy;

  use super::*;

  fn load(toml: &str) -> PipelineConfig {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    PipelineConfig::load(file.path()).unwrap()
  }

  #[test]
  fn missing_file_gives_defaults() {
    let cfg = PipelineConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.store, StoreConfig::default());
    assert!(cfg.sources.is_empty());
    assert!(cfg.write_on_partial_failure);
    assert_eq!(cfg.resolver.ambiguous_policy, AmbiguousPolicy::Mint);
  }

  #[test]
  fn file_values_are_read() {
    let cfg = load(
      r#"
write_on_partial_failure = false
parcels = "ref/parcels.csv"

[store]
backend = "sqlite"
path = "out/permitlog.db"

[sources]
ppts = "raw/ppts.csv"
mohcd_pipeline = "raw/pipeline.csv"

[resolver]
name_similarity_threshold = 0.9
ambiguous_policy = "defer"
"#,
    );
    assert_eq!(cfg.store, StoreConfig::Sqlite {
      path: PathBuf::from("out/permitlog.db"),
    });
    assert_eq!(cfg.source_inputs(), vec![
      (SourceKind::Ppts, PathBuf::from("raw/ppts.csv")),
      (SourceKind::MohcdPipeline, PathBuf::from("raw/pipeline.csv")),
    ]);
    assert_eq!(cfg.parcels, Some(PathBuf::from("ref/parcels.csv")));
    assert!(!cfg.write_on_partial_failure);
    assert_eq!(cfg.resolver.name_similarity_threshold, 0.9);
    assert_eq!(cfg.resolver.corroboration_min_len, 6);
    assert_eq!(cfg.resolver.ambiguous_policy, AmbiguousPolicy::Defer);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/permits")),
      PathBuf::from(home).join("permits")
    );
    assert_eq!(expand_tilde(Path::new("permits")), PathBuf::from("permits"));
  }
}
