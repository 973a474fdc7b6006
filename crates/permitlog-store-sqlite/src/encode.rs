//! Raw column values read from SQLite and their conversion to domain types.
//!
//! Dates are stored as `YYYY-MM-DD` text, project ids as hyphenated lowercase
//! UUIDs, signal kinds and reasons as their snake_case names.

use permitlog_core::{
  fact::{DATE_FORMAT, Fact, ForeignKey, parse_run_date},
  identity::{LikelyMatch, ProjectId},
};

use crate::Result;

// ─── Facts ───────────────────────────────────────────────────────────────────

pub struct RawFact {
  pub fk:           String,
  pub source:       String,
  pub last_updated: String,
  pub name:         String,
  pub value:        String,
}

impl RawFact {
  pub fn encode(fact: &Fact) -> Self {
    Self {
      fk:           fact.foreign_key.to_string(),
      source:       fact.source.clone(),
      last_updated: fact.observed_at.format(DATE_FORMAT).to_string(),
      name:         fact.name.clone(),
      value:        fact.value.clone(),
    }
  }

  pub fn into_fact(self) -> Result<Fact> {
    Ok(Fact {
      foreign_key: ForeignKey::new(self.fk),
      source:      self.source,
      observed_at: parse_run_date(&self.last_updated)?,
      name:        self.name,
      value:       self.value,
    })
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

pub struct RawIdentity {
  pub uuid: String,
  pub fk:   String,
}

impl RawIdentity {
  pub fn into_row(self) -> Result<(ProjectId, ForeignKey)> {
    let id: ProjectId = self.uuid.parse()?;
    Ok((id, ForeignKey::new(self.fk)))
  }
}

// ─── Likely matches ──────────────────────────────────────────────────────────

pub struct RawLikely {
  pub fk_a:        String,
  pub fk_b:        String,
  pub signal_kind: String,
  pub confidence:  f64,
  pub reason:      String,
}

impl RawLikely {
  pub fn encode(m: &LikelyMatch) -> Self {
    Self {
      fk_a:        m.fk_a.to_string(),
      fk_b:        m.fk_b.to_string(),
      signal_kind: m.signal.as_str().to_owned(),
      confidence:  m.confidence,
      reason:      m.reason.as_str().to_owned(),
    }
  }

  pub fn into_match(self) -> Result<LikelyMatch> {
    Ok(LikelyMatch::new(
      ForeignKey::new(self.fk_a),
      ForeignKey::new(self.fk_b),
      self.signal_kind.parse()?,
      self.confidence,
      self.reason.parse()?,
    ))
  }
}
