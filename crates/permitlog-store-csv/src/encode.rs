//! Row shapes of the three CSV files and their conversion to domain types.

use permitlog_core::{
  fact::{DATE_FORMAT, Fact, ForeignKey, parse_run_date},
  identity::{LikelyMatch, MatchReason, ProjectId},
};
use serde::{Deserialize, Serialize};

pub const FACT_HEADER: [&str; 5] = ["fk", "source", "last_updated", "name", "value"];
pub const IDENTITY_HEADER: [&str; 2] = ["uuid", "fk"];
pub const LIKELY_HEADER: [&str; 5] =
  ["fk_a", "fk_b", "signal_kind", "confidence", "reason"];

// ─── Fact log ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct FactRow {
  pub fk:           String,
  pub source:       String,
  pub last_updated: String,
  pub name:         String,
  pub value:        String,
}

impl From<&Fact> for FactRow {
  fn from(fact: &Fact) -> Self {
    Self {
      fk:           fact.foreign_key.to_string(),
      source:       fact.source.clone(),
      last_updated: fact.observed_at.format(DATE_FORMAT).to_string(),
      name:         fact.name.clone(),
      value:        fact.value.clone(),
    }
  }
}

impl FactRow {
  pub fn decode(self) -> permitlog_core::Result<Fact> {
    Ok(Fact {
      foreign_key: ForeignKey::new(self.fk),
      source:      self.source,
      observed_at: parse_run_date(&self.last_updated)?,
      name:        self.name,
      value:       self.value,
    })
  }
}

// ─── Identity map ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityRow {
  pub uuid: String,
  pub fk:   String,
}

impl IdentityRow {
  pub fn encode(id: &ProjectId, fk: &ForeignKey) -> Self {
    Self {
      uuid: id.to_string(),
      fk:   fk.to_string(),
    }
  }

  pub fn decode(self) -> permitlog_core::Result<(ProjectId, ForeignKey)> {
    Ok((self.uuid.parse()?, ForeignKey::new(self.fk)))
  }
}

// ─── Likely matches ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LikelyRow {
  pub fk_a:        String,
  pub fk_b:        String,
  pub signal_kind: String,
  pub confidence:  f64,
  /// Reports written before the column existed carry no reason.
  #[serde(default)]
  pub reason:      Option<String>,
}

impl From<&LikelyMatch> for LikelyRow {
  fn from(m: &LikelyMatch) -> Self {
    Self {
      fk_a:        m.fk_a.to_string(),
      fk_b:        m.fk_b.to_string(),
      signal_kind: m.signal.to_string(),
      confidence:  m.confidence,
      reason:      Some(m.reason.to_string()),
    }
  }
}

impl LikelyRow {
  pub fn decode(self) -> permitlog_core::Result<LikelyMatch> {
    let reason = match self.reason.as_deref().map(str::trim) {
      None | Some("") => MatchReason::BelowThreshold,
      Some(reason) => reason.parse()?,
    };
    Ok(LikelyMatch::new(
      ForeignKey::new(self.fk_a),
      ForeignKey::new(self.fk_b),
      self.signal_kind.parse()?,
      self.confidence,
      reason,
    ))
  }
}
