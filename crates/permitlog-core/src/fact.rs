//! Fact types: the fundamental unit of the permit fact log.
//!
//! A fact is one observed value of one field of one source record on one run
//! date. Facts are never updated; a changed value is a new fact, and readers
//! take the last-occurring fact for a `(foreign_key, field)` pair.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Date format of the `last_updated` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a run date in `YYYY-MM-DD` form.
pub fn parse_run_date(value: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|source| {
    Error::InvalidDate {
      value: value.to_string(),
      source,
    }
  })
}

// ─── Foreign key ─────────────────────────────────────────────────────────────

/// A source-prefixed record identifier, e.g. `ppts_2016-001514PRJ`.
///
/// Unique within one source; the prefix makes it unique across sources.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ForeignKey(String);

impl ForeignKey {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  /// Build a key from a source tag and the record's own identifying parts.
  pub fn from_parts<I, S>(source: &str, parts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut key = source.to_string();
    for part in parts {
      key.push('_');
      key.push_str(part.as_ref());
    }
    Self(key)
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ForeignKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ForeignKey {
  fn from(value: &str) -> Self { Self(value.to_string()) }
}

impl From<String> for ForeignKey {
  fn from(value: String) -> Self { Self(value) }
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// An immutable observation. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
  pub foreign_key: ForeignKey,
  pub source:      String,
  /// Run date on which the value was first observed.
  pub observed_at: NaiveDate,
  pub name:        String,
  pub value:       String,
}

// ─── NewFact ─────────────────────────────────────────────────────────────────

/// A candidate fact produced by a source adapter from one snapshot row.
/// `observed_at` is assigned by the differ when the fact is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFact {
  pub foreign_key: ForeignKey,
  pub source:      String,
  pub name:        String,
  pub value:       String,
}

impl NewFact {
  pub fn new(
    foreign_key: ForeignKey,
    source: impl Into<String>,
    name: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    Self {
      foreign_key,
      source: source.into(),
      name: name.into(),
      value: value.into(),
    }
  }

  /// Stamp the candidate with the run date, producing a persistable fact.
  pub fn stamp(self, observed_at: NaiveDate) -> Fact {
    Fact {
      foreign_key: self.foreign_key,
      source: self.source,
      observed_at,
      name: self.name,
      value: self.value,
    }
  }
}

// ─── Fact log ────────────────────────────────────────────────────────────────

/// The append-only fact log, in file order (which is run-date order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactLog {
  facts: Vec<Fact>,
}

impl FactLog {
  pub fn new() -> Self { Self::default() }

  pub fn from_facts(facts: Vec<Fact>) -> Self { Self { facts } }

  pub fn facts(&self) -> &[Fact] { &self.facts }

  pub fn len(&self) -> usize { self.facts.len() }

  pub fn is_empty(&self) -> bool { self.facts.is_empty() }

  /// Append the output of a diff. Existing facts are never touched.
  pub fn append(&mut self, facts: impl IntoIterator<Item = Fact>) {
    self.facts.extend(facts);
  }

  /// Collapse the log into the latest value of every field of every record.
  pub fn latest(&self) -> LatestValues {
    let mut records: BTreeMap<ForeignKey, RecordView> = BTreeMap::new();
    for fact in &self.facts {
      let view = records
        .entry(fact.foreign_key.clone())
        .or_insert_with(|| RecordView {
          foreign_key:  fact.foreign_key.clone(),
          source:       fact.source.clone(),
          first_seen:   fact.observed_at,
          last_updated: fact.observed_at,
          fields:       BTreeMap::new(),
        });
      view.last_updated = view.last_updated.max(fact.observed_at);
      view.fields.insert(fact.name.clone(), fact.value.clone());
    }
    LatestValues { records }
  }
}

// ─── Materialised view ───────────────────────────────────────────────────────

/// The computed current state of one source record. Never stored, always
/// derived from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
  pub foreign_key:  ForeignKey,
  pub source:       String,
  pub first_seen:   NaiveDate,
  pub last_updated: NaiveDate,
  pub fields:       BTreeMap<String, String>,
}

impl RecordView {
  /// The latest non-empty value of `name`, if any.
  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .fields
      .get(name)
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }
}

/// Latest values for every record in a log, ordered by foreign key.
#[derive(Debug, Clone, Default)]
pub struct LatestValues {
  records: BTreeMap<ForeignKey, RecordView>,
}

impl LatestValues {
  pub fn get(&self, fk: &ForeignKey) -> Option<&RecordView> {
    self.records.get(fk)
  }

  pub fn contains(&self, fk: &ForeignKey) -> bool {
    self.records.contains_key(fk)
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  /// Records in ascending foreign-key order.
  pub fn records(&self) -> impl Iterator<Item = &RecordView> {
    self.records.values()
  }
}
