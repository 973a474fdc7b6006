//! Source adapters: department CSV snapshots → candidate facts.
//!
//! Each [`SourceKind`] owns its column map, key derivation and computed
//! fields. Adapters never see the fact log; they only turn one snapshot into
//! an ordered list of [`NewFact`]s for the differ.

pub mod error;
pub mod kind;
mod parse;

use std::{fs::File, io::Read, path::PathBuf, thread};

use permitlog_core::fact::NewFact;

pub use crate::{
  error::{Result, RowError, SourceLoadError},
  kind::{
    ADDRESS_FIELD, BLKLOT_FIELD, CrossRef, RefTarget, SourceKind, SourceProfile,
  },
};
use crate::kind::Layout;

/// One source's snapshot, parsed.
#[derive(Debug)]
pub struct ParsedSource {
  pub kind:     SourceKind,
  /// Candidate facts in input row order.
  pub facts:    Vec<NewFact>,
  /// Records that produced a foreign key.
  pub records:  usize,
  /// Rows that were skipped.
  pub warnings: Vec<RowError>,
}

impl ParsedSource {
  fn new(kind: SourceKind) -> Self {
    Self {
      kind,
      facts: Vec::new(),
      records: 0,
      warnings: Vec::new(),
    }
  }
}

/// Parse one snapshot from any reader.
pub fn read_source_from<R: Read>(kind: SourceKind, reader: R) -> Result<ParsedSource> {
  match kind.layout() {
    Layout::Direct(layout) => parse::parse_direct(kind, layout, reader),
    Layout::AddendaSummary => parse::parse_addenda_summary(kind, reader),
  }
}

/// Open and parse one snapshot file.
pub fn read_source(kind: SourceKind, path: impl Into<PathBuf>) -> Result<ParsedSource> {
  let path = path.into();
  let file = File::open(&path).map_err(|source| SourceLoadError::Io {
    path: path.clone(),
    source,
  })?;
  let parsed = read_source_from(kind, file)?;
  tracing::info!(
    source = kind.name(),
    path = %path.display(),
    records = parsed.records,
    facts = parsed.facts.len(),
    skipped = parsed.warnings.len(),
    "source parsed"
  );
  Ok(parsed)
}

/// Parse several snapshot files concurrently, one thread per source.
///
/// Results come back in input order regardless of completion order. A failed
/// source is logged and returned as an error without affecting the others.
pub fn read_sources(
  inputs: &[(SourceKind, PathBuf)],
) -> Vec<(SourceKind, Result<ParsedSource>)> {
  thread::scope(|scope| {
    let handles: Vec<_> = inputs
      .iter()
      .map(|(kind, path)| {
        let kind = *kind;
        (kind, scope.spawn(move || read_source(kind, path.clone())))
      })
      .collect();

    handles
      .into_iter()
      .map(|(kind, handle)| {
        let result = handle.join().unwrap_or(Err(SourceLoadError::Panicked {
          source_name: kind.name(),
        }));
        if let Err(err) = &result {
          tracing::error!(source = kind.name(), "source failed to load: {err}");
        }
        (kind, result)
      })
      .collect()
  })
}
