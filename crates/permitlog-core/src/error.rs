//! Error types for `permitlog-core`.

use thiserror::Error;

use crate::{fact::ForeignKey, identity::ProjectId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("foreign key {fk} is already assigned to {existing}, refusing {requested}")]
  AlreadyAssigned {
    fk:        ForeignKey,
    existing:  ProjectId,
    requested: ProjectId,
  },

  #[error("identity map assigns {fk} to both {first} and {second}")]
  ConflictingRows {
    fk:     ForeignKey,
    first:  ProjectId,
    second: ProjectId,
  },

  #[error("unknown signal kind: {0:?}")]
  UnknownSignalKind(String),

  #[error("unknown match reason: {0:?}")]
  UnknownMatchReason(String),

  #[error("invalid project id: {0}")]
  InvalidProjectId(#[from] uuid::Error),

  #[error("invalid date {value:?}: {source}")]
  InvalidDate {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
