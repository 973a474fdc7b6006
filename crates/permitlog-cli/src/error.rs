//! Error type for the pipeline steps.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no source could be loaded")]
  NoSourceLoaded,

  /// Some sources failed and the configuration forbids partial writes.
  #[error("sources failed to load, nothing written: {failed:?}")]
  PartialFailure { failed: Vec<&'static str> },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Resolve(#[from] permitlog_resolve::Error),

  #[error("parcel table: {0}")]
  Parcel(#[from] permitlog_parcel::Error),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
