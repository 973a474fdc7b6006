//! Address/parcel normalizer.
//!
//! Departments spell addresses differently and only some carry an assessor
//! parcel number. This crate canonicalizes address text and resolves it
//! against the reference parcel table to a [`ParcelKey`] that can be compared
//! across sources. It keeps no state between runs.

pub mod address;
pub mod error;
pub mod index;

pub use address::{Address, canonicalize};
pub use error::{Error, Result};
pub use index::{ParcelIndex, ParcelKey, ParcelRow};
