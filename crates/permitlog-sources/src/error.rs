//! Error types for the source adapters.
//!
//! A [`RowError`] is local to one input row: the row is skipped, counted and
//! logged, and the adapter carries on. A [`SourceLoadError`] aborts one
//! source's contribution to the run, never the whole run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceLoadError {
  #[error("unknown source: {0:?}")]
  UnknownSource(String),

  #[error("cannot open {path:?}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("{source_name}: csv error: {message}")]
  Csv {
    source_name: &'static str,
    message:     String,
  },

  #[error("{source_name}: file has no data rows")]
  Empty { source_name: &'static str },

  #[error("{source_name}: header is missing required columns {missing:?}")]
  HeaderMismatch {
    source_name: &'static str,
    missing:     Vec<String>,
  },

  #[error("{source_name}: adapter thread panicked")]
  Panicked { source_name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
  #[error("row {row}: key column {column:?} is empty")]
  MissingKey { row: usize, column: String },

  #[error("row {row}: invalid date in {column:?}: {value:?}")]
  InvalidDate {
    row:    usize,
    column: String,
    value:  String,
  },

  #[error("row {row}: {message}")]
  Malformed { row: usize, message: String },
}

impl RowError {
  /// 1-based data row (the header is row 0).
  pub fn row(&self) -> usize {
    match self {
      Self::MissingKey { row, .. }
      | Self::InvalidDate { row, .. }
      | Self::Malformed { row, .. } => *row,
    }
  }
}

pub type Result<T, E = SourceLoadError> = std::result::Result<T, E>;
