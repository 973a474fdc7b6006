//! Pipeline steps behind the `permitlog` binary.
//!
//! Sources are parsed and diffed into the fact log, the fact log is resolved
//! into the identity map, and an operator can promote a likely match. Each
//! step works against any backend implementing the store traits.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod summary;

pub use config::{PipelineConfig, StoreConfig};
pub use error::{Error, Result};
pub use summary::RunSummary;
