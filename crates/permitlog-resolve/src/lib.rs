//! Entity resolver: which source records describe the same project.
//!
//! Reads the latest record values from the fact log, scores candidate pairs
//! with an ordered list of [`MatchSignal`]s and extends the previous run's
//! identity map. Bound keys never move; anything the resolver cannot confirm
//! goes to the likely-match report for a human.

pub mod cluster;
pub mod config;
pub mod error;
pub mod record;
pub mod resolve;
pub mod signal;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use config::{AmbiguousPolicy, ResolverConfig};
pub use error::{Error, Result};
pub use record::{Record, RecordSet};
pub use resolve::{
  Resolution, ResolveStats, promote, prune_resolved, resolve, sort_likely_matches,
};
pub use signal::{MatchSignal, Verdict, default_signals};
