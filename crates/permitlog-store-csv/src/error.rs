//! Error type for `permitlog-store-csv`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] permitlog_core::Error),

  #[error("{path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{path}: {source}")]
  Csv {
    path:   PathBuf,
    #[source]
    source: csv::Error,
  },

  /// A row decoded as CSV but one of its values is not valid.
  #[error("{path}, line {line}: {source}")]
  InvalidRow {
    path:   PathBuf,
    line:   u64,
    #[source]
    source: permitlog_core::Error,
  },

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
