//! Core types and trait definitions for the permitlog pipeline.
//!
//! Holds the fact log model, the snapshot differ, the identity map model and
//! the store traits every backend implements. No file or database access
//! happens here.

pub mod diff;
pub mod error;
pub mod fact;
pub mod identity;
pub mod store;

pub use error::{Error, Result};
