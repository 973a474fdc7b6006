use permitlog_core::{fact::ForeignKey, identity::ProjectId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] permitlog_core::Error),

  #[error("{fk} is already bound to {existing}")]
  AlreadyAssigned { fk: ForeignKey, existing: ProjectId },

  #[error("{0} has no project id to promote into")]
  TargetUnassigned(ForeignKey),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
