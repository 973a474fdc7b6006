use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot open parcel table {path:?}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("parcel table: {0}")]
  Csv(#[from] csv::Error),

  #[error("parcel table is missing columns {0:?}")]
  MissingColumns(Vec<String>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
