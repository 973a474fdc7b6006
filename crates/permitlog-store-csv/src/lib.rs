//! CSV backend for the permitlog stores.
//!
//! Three files, each with a header row: the append-only fact log, the
//! identity map and the likely-match report. Every write goes to a sibling
//! `.tmp` file that is renamed over the target once complete, so a failed run
//! leaves the previous files untouched.

mod encode;
mod file;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{CsvPaths, CsvStore, FACTS_FILE, IDENTITY_FILE, LIKELY_FILE};
