//! Match signals, highest confidence first.
//!
//! Each signal is an independent evaluator over a (subject, candidate) pair.
//! The resolver runs them in order for every subject and stops at the first
//! tier that confirms a match.

use std::collections::BTreeMap;

use permitlog_core::identity::SignalKind;

use crate::{
  config::ResolverConfig,
  record::{Record, RecordSet},
  similarity::NameScorer,
};

pub const CROSS_REFERENCE_CONFIDENCE: f64 = 1.0;
pub const PARCEL_CORROBORATED_CONFIDENCE: f64 = 0.95;
pub const SHARED_PARCEL_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
  /// Strong enough to bind identities.
  Confirmed(f64),
  /// Reported for review only.
  Likely(f64),
}

impl Verdict {
  pub fn confidence(&self) -> f64 {
    match self {
      Self::Confirmed(c) | Self::Likely(c) => *c,
    }
  }

  pub fn is_confirmed(&self) -> bool { matches!(self, Self::Confirmed(_)) }
}

pub trait MatchSignal {
  fn kind(&self) -> SignalKind;

  /// Records worth evaluating against `subject`.
  fn candidates(&self, records: &RecordSet, subject: usize) -> Vec<usize>;

  fn evaluate(&self, subject: &Record, candidate: &Record) -> Option<Verdict>;
}

/// The standard signal list in precedence order.
pub fn default_signals(config: &ResolverConfig) -> Vec<Box<dyn MatchSignal>> {
  vec![
    Box::new(CrossReference),
    Box::new(ParcelCorroborated {
      min_len: config.corroboration_min_len,
    }),
    Box::new(SharedParcel),
    Box::new(NameSimilarity {
      threshold:   config.name_similarity_threshold,
      block_limit: config.name_block_limit,
      scorer:      NameScorer::default(),
    }),
  ]
}

fn different_sources(a: &Record, b: &Record) -> bool {
  a.kind.is_some() && b.kind.is_some() && a.kind != b.kind
}

fn shared_parcel(a: &Record, b: &Record) -> bool {
  a.parcel.is_some() && a.parcel == b.parcel
}

// ─── Tier 1 ──────────────────────────────────────────────────────────────────

/// One record names the other directly.
pub struct CrossReference;

impl MatchSignal for CrossReference {
  fn kind(&self) -> SignalKind { SignalKind::CrossReference }

  fn candidates(&self, records: &RecordSet, subject: usize) -> Vec<usize> {
    records.cross_links(subject).iter().copied().collect()
  }

  fn evaluate(&self, _subject: &Record, _candidate: &Record) -> Option<Verdict> {
    // Candidates are exactly the linked records.
    Some(Verdict::Confirmed(CROSS_REFERENCE_CONFIDENCE))
  }
}

// ─── Tier 2 ──────────────────────────────────────────────────────────────────

/// Same parcel plus a corroborating field.
pub struct ParcelCorroborated {
  pub min_len: usize,
}

impl ParcelCorroborated {
  fn references_overlap(&self, a: &Record, b: &Record) -> bool {
    a.references.iter().any(|ra| {
      b.references.iter().any(|rb| {
        let (short, long) = if ra.len() <= rb.len() { (ra, rb) } else { (rb, ra) };
        short.chars().count() >= self.min_len && long.contains(short.as_str())
      })
    })
  }

  fn same_permit_group(a: &Record, b: &Record) -> bool {
    a.kind == b.kind && a.group.is_some() && a.group == b.group
  }
}

impl MatchSignal for ParcelCorroborated {
  fn kind(&self) -> SignalKind { SignalKind::ParcelCorroborated }

  fn candidates(&self, records: &RecordSet, subject: usize) -> Vec<usize> {
    records
      .same_parcel(subject)
      .iter()
      .copied()
      .filter(|&i| i != subject)
      .collect()
  }

  fn evaluate(&self, subject: &Record, candidate: &Record) -> Option<Verdict> {
    if !shared_parcel(subject, candidate) {
      return None;
    }
    (self.references_overlap(subject, candidate)
      || Self::same_permit_group(subject, candidate))
    .then_some(Verdict::Confirmed(PARCEL_CORROBORATED_CONFIDENCE))
  }
}

// ─── Tier 3 ──────────────────────────────────────────────────────────────────

/// Same parcel, nothing else. Unrelated projects share parcels over time.
pub struct SharedParcel;

impl MatchSignal for SharedParcel {
  fn kind(&self) -> SignalKind { SignalKind::SharedParcel }

  fn candidates(&self, records: &RecordSet, subject: usize) -> Vec<usize> {
    records
      .same_parcel(subject)
      .iter()
      .copied()
      .filter(|&i| i != subject)
      .collect()
  }

  fn evaluate(&self, subject: &Record, candidate: &Record) -> Option<Verdict> {
    (shared_parcel(subject, candidate) && different_sources(subject, candidate))
      .then_some(Verdict::Likely(SHARED_PARCEL_CONFIDENCE))
  }
}

// ─── Tier 4 ──────────────────────────────────────────────────────────────────

/// Similar names (or addresses) with no parcel in common.
pub struct NameSimilarity {
  pub threshold:   f64,
  pub block_limit: usize,
  pub scorer:      NameScorer,
}

impl MatchSignal for NameSimilarity {
  fn kind(&self) -> SignalKind { SignalKind::NameSimilarity }

  fn candidates(&self, records: &RecordSet, subject: usize) -> Vec<usize> {
    records
      .token_neighbours(subject, self.block_limit)
      .into_iter()
      .collect()
  }

  fn evaluate(&self, subject: &Record, candidate: &Record) -> Option<Verdict> {
    if !different_sources(subject, candidate) || shared_parcel(subject, candidate) {
      return None;
    }
    let (a, b) = subject.comparable_text(candidate)?;
    let score = self.scorer.score(&a, &b);
    (score >= self.threshold).then_some(Verdict::Likely(score))
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// A scored pairing between two record positions, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
  pub a:       usize,
  pub b:       usize,
  pub signal:  SignalKind,
  pub verdict: Verdict,
}

/// Run `signals` over every record. Per subject, tiers after the first one
/// that confirms are skipped. Pairs found from both sides are kept once.
pub fn evaluate_all(records: &RecordSet, signals: &[Box<dyn MatchSignal>]) -> Vec<Edge> {
  let mut edges: BTreeMap<(usize, usize, SignalKind), Verdict> = BTreeMap::new();
  for subject in 0..records.len() {
    for signal in signals {
      let mut confirmed = false;
      let mut candidates = signal.candidates(records, subject);
      candidates.sort_unstable();
      candidates.dedup();
      for candidate in candidates.into_iter().filter(|&c| c != subject) {
        let Some(verdict) =
          signal.evaluate(records.get(subject), records.get(candidate))
        else {
          continue;
        };
        confirmed |= verdict.is_confirmed();
        let key = (subject.min(candidate), subject.max(candidate), signal.kind());
        edges.entry(key).or_insert(verdict);
      }
      if confirmed {
        break;
      }
    }
  }
  edges
    .into_iter()
    .map(|((a, b, signal), verdict)| Edge {
      a,
      b,
      signal,
      verdict,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use permitlog_parcel::{Address, ParcelKey};
  use permitlog_sources::SourceKind;

  use super::*;

  fn record(fk: &str, kind: SourceKind) -> Record {
    Record {
      fk:         fk.into(),
      kind:       Some(kind),
      name:       None,
      address:    None,
      parcel:     None,
      references: Vec::new(),
      group:      None,
    }
  }

  fn on_parcel(mut r: Record, parcel: &str) -> Record {
    r.parcel = Some(ParcelKey::new(parcel));
    r
  }

  #[test]
  fn corroboration_needs_long_enough_reference() {
    let signal = ParcelCorroborated { min_len: 6 };
    let mut a = on_parcel(record("ppts_1", SourceKind::Ppts), "P1");
    let mut b = on_parcel(record("pts_1", SourceKind::Pts), "P1");
    a.references = vec!["201705237369".into()];
    b.references = vec!["201705237369".into()];
    assert_eq!(
      signal.evaluate(&a, &b),
      Some(Verdict::Confirmed(PARCEL_CORROBORATED_CONFIDENCE))
    );

    a.references = vec!["12345".into()];
    b.references = vec!["9912345".into()];
    assert_eq!(signal.evaluate(&a, &b), None);

    a.references = vec!["2014000123PRJ".into()];
    b.references = vec!["2014000123".into()];
    assert!(signal.evaluate(&a, &b).is_some());
  }

  #[test]
  fn corroboration_requires_the_parcel() {
    let signal = ParcelCorroborated { min_len: 6 };
    let mut a = on_parcel(record("ppts_1", SourceKind::Ppts), "P1");
    let mut b = on_parcel(record("pts_1", SourceKind::Pts), "P2");
    a.references = vec!["201705237369".into()];
    b.references = vec!["201705237369".into()];
    assert_eq!(signal.evaluate(&a, &b), None);
  }

  #[test]
  fn permit_group_corroborates_within_pts() {
    let signal = ParcelCorroborated { min_len: 6 };
    let mut a = on_parcel(record("pts_1", SourceKind::Pts), "P1");
    let mut b = on_parcel(record("pts_2", SourceKind::Pts), "P1");
    a.group = Some(vec!["2017/05/23".into(), "apartments".into()]);
    b.group = a.group.clone();
    assert!(signal.evaluate(&a, &b).is_some_and(|v| v.is_confirmed()));

    b.group = Some(vec!["2017/05/23".into(), "office".into()]);
    assert_eq!(signal.evaluate(&a, &b), None);
  }

  #[test]
  fn shared_parcel_is_cross_source_only() {
    let a = on_parcel(record("pts_1", SourceKind::Pts), "P1");
    let b = on_parcel(record("pts_2", SourceKind::Pts), "P1");
    let c = on_parcel(record("tco_1", SourceKind::Tco), "P1");
    assert_eq!(SharedParcel.evaluate(&a, &b), None);
    assert_eq!(
      SharedParcel.evaluate(&a, &c),
      Some(Verdict::Likely(SHARED_PARCEL_CONFIDENCE))
    );
  }

  #[test]
  fn name_similarity_falls_back_to_address() {
    let signal = NameSimilarity {
      threshold:   0.85,
      block_limit: 64,
      scorer:      NameScorer::default(),
    };
    let mut a = record("bmr_1", SourceKind::Bmr);
    let mut b = record("tco_1", SourceKind::Tco);
    a.address = Some(Address::parse("1950 Mission St"));
    b.address = Some(Address::parse("1950 MISSION STREET, SF"));
    assert!(matches!(signal.evaluate(&a, &b), Some(Verdict::Likely(s)) if s >= 0.85));

    // A shared parcel is the tier above; this tier stays silent.
    a.parcel = Some(ParcelKey::new("P1"));
    b.parcel = Some(ParcelKey::new("P1"));
    assert_eq!(signal.evaluate(&a, &b), None);
  }
}
