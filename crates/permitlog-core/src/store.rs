//! Persistence traits for the fact log and the identity artifacts.
//!
//! The traits are implemented by storage backends (`permitlog-store-csv`,
//! `permitlog-store-sqlite`). The pipeline depends on this abstraction, not on
//! any concrete backend.
//!
//! Every artifact is read once at the start of a run and written once at the
//! end. A write either lands completely or leaves the previous version in
//! place.

use std::future::Future;

use crate::{
  fact::{Fact, FactLog},
  identity::{IdentityMap, LikelyMatch},
};

/// Backend holding the append-only fact log.
pub trait FactLogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load the full log in file order. A store that has never been written
  /// returns an empty log.
  fn load_facts(
    &self,
  ) -> impl Future<Output = Result<FactLog, Self::Error>> + Send + '_;

  /// Append `facts` after the existing log, all or nothing. Previously
  /// written facts are never rewritten or reordered.
  fn append_facts(
    &self,
    facts: Vec<Fact>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Backend holding the identity map and the likely-match report.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load the previous run's identity map; empty on cold start.
  fn load_identity_map(
    &self,
  ) -> impl Future<Output = Result<IdentityMap, Self::Error>> + Send + '_;

  /// Load the previous run's likely-match report; empty on cold start.
  fn load_likely_matches(
    &self,
  ) -> impl Future<Output = Result<Vec<LikelyMatch>, Self::Error>> + Send + '_;

  /// Replace the identity map and the likely-match report together. Either
  /// both land or neither does.
  fn save_resolution<'a>(
    &'a self,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Backend that can commit everything a full run produces at once.
pub trait RunStore: FactLogStore + IdentityStore {
  /// Append `facts` and replace the identity map and likely-match report in
  /// one commit. On failure all three artifacts keep their previous state.
  fn commit_run<'a>(
    &'a self,
    facts: Vec<Fact>,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> impl Future<Output = Result<(), <Self as IdentityStore>::Error>> + Send + 'a;
}
