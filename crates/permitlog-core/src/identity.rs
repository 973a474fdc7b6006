//! Project identities and likely-match records.
//!
//! A project identity is an opaque UUID standing for one real-world
//! construction project. The identity map binds foreign keys to identities;
//! once bound, a foreign key never moves to another identity.

use std::{
  collections::HashMap,
  fmt,
  str::FromStr,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::{Builder, Uuid};

use crate::{Error, Result, fact::ForeignKey};

/// Namespace mixed into derived project ids.
const DERIVE_NAMESPACE: &[u8] = b"permitlog:";

// ─── ProjectId ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
  /// Derive a project id from a seed string.
  ///
  /// The id is the first 16 bytes of `SHA-256("permitlog:" + seed)` shaped
  /// as an RFC 4122 version-4 UUID, so the same seed always mints the same
  /// id and distinct seeds mint distinct ids.
  pub fn derive(seed: &str) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(DERIVE_NAMESPACE);
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Self(Builder::from_random_bytes(bytes).into_uuid())
  }
}

impl fmt::Display for ProjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for ProjectId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Ok(Self(Uuid::parse_str(s.trim())?)) }
}

// ─── IdentityMap ─────────────────────────────────────────────────────────────

/// The foreign key → project id assignment, one row per foreign key ever
/// assigned. Row order is preserved across runs; new rows are appended.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
  rows:  Vec<(ProjectId, ForeignKey)>,
  by_fk: HashMap<ForeignKey, ProjectId>,
}

impl IdentityMap {
  pub fn new() -> Self { Self::default() }

  /// Build a map from persisted `(uuid, fk)` rows.
  ///
  /// Repeated identical rows collapse into one. A foreign key bound to two
  /// different ids is rejected.
  pub fn from_rows(
    rows: impl IntoIterator<Item = (ProjectId, ForeignKey)>,
  ) -> Result<Self> {
    let mut map = Self::new();
    for (id, fk) in rows {
      match map.by_fk.get(&fk) {
        Some(existing) if *existing == id => {}
        Some(existing) => {
          return Err(Error::ConflictingRows {
            fk,
            first: *existing,
            second: id,
          });
        }
        None => {
          map.by_fk.insert(fk.clone(), id);
          map.rows.push((id, fk));
        }
      }
    }
    Ok(map)
  }

  pub fn get(&self, fk: &ForeignKey) -> Option<ProjectId> {
    self.by_fk.get(fk).copied()
  }

  pub fn contains(&self, fk: &ForeignKey) -> bool { self.by_fk.contains_key(fk) }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  /// Bind `fk` to `id`.
  ///
  /// Binding an already-bound key to the same id is a no-op; binding it to a
  /// different id is refused.
  pub fn assign(&mut self, fk: ForeignKey, id: ProjectId) -> Result<()> {
    if let Some(existing) = self.get(&fk) {
      if existing == id {
        return Ok(());
      }
      return Err(Error::AlreadyAssigned {
        fk,
        existing,
        requested: id,
      });
    }
    self.by_fk.insert(fk.clone(), id);
    self.rows.push((id, fk));
    Ok(())
  }

  /// Rows in persisted order.
  pub fn rows(&self) -> impl Iterator<Item = (&ProjectId, &ForeignKey)> {
    self.rows.iter().map(|(id, fk)| (id, fk))
  }
}

// ─── Likely matches ──────────────────────────────────────────────────────────

/// Which matching signal produced a pairing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
  CrossReference,
  ParcelCorroborated,
  SharedParcel,
  NameSimilarity,
}

impl SignalKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::CrossReference => "cross_reference",
      Self::ParcelCorroborated => "parcel_corroborated",
      Self::SharedParcel => "shared_parcel",
      Self::NameSimilarity => "name_similarity",
    }
  }
}

impl fmt::Display for SignalKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SignalKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "cross_reference" => Ok(Self::CrossReference),
      "parcel_corroborated" => Ok(Self::ParcelCorroborated),
      "shared_parcel" => Ok(Self::SharedParcel),
      "name_similarity" => Ok(Self::NameSimilarity),
      other => Err(Error::UnknownSignalKind(other.to_string())),
    }
  }
}

/// Why a pairing was reported instead of applied.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
  /// The signal alone is not strong enough to confirm identity.
  BelowThreshold,
  /// Confirmed signals point at more than one existing identity.
  MultipleIdentities,
  /// Two already-assigned keys with different identities were confirmed as
  /// the same project by a later run.
  IdentityConflict,
}

impl MatchReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::BelowThreshold => "below_threshold",
      Self::MultipleIdentities => "multiple_identities",
      Self::IdentityConflict => "identity_conflict",
    }
  }
}

impl fmt::Display for MatchReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MatchReason {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "below_threshold" => Ok(Self::BelowThreshold),
      "multiple_identities" => Ok(Self::MultipleIdentities),
      "identity_conflict" => Ok(Self::IdentityConflict),
      other => Err(Error::UnknownMatchReason(other.to_string())),
    }
  }
}

/// An advisory pairing for human review. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelyMatch {
  /// Always the lesser of the two keys.
  pub fk_a:       ForeignKey,
  pub fk_b:       ForeignKey,
  pub signal:     SignalKind,
  pub confidence: f64,
  pub reason:     MatchReason,
}

impl LikelyMatch {
  /// Build a pairing with the keys in canonical (ascending) order.
  pub fn new(
    a: ForeignKey,
    b: ForeignKey,
    signal: SignalKind,
    confidence: f64,
    reason: MatchReason,
  ) -> Self {
    let (fk_a, fk_b) = if a <= b { (a, b) } else { (b, a) };
    Self {
      fk_a,
      fk_b,
      signal,
      confidence,
      reason,
    }
  }

  /// Sort key used for report ordering and deduplication.
  pub fn sort_key(&self) -> (&ForeignKey, &ForeignKey, SignalKind, MatchReason) {
    (&self.fk_a, &self.fk_b, self.signal, self.reason)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_ids_are_stable_and_distinct() {
    let a = ProjectId::derive("ppts_2016-001514PRJ");
    let b = ProjectId::derive("ppts_2016-001514PRJ");
    let c = ProjectId::derive("ppts_2016-001514PPA");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.0.get_version_num(), 4);
  }

  #[test]
  fn project_id_round_trips_through_text() {
    let id = ProjectId::derive("x");
    let parsed: ProjectId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
  }

  #[test]
  fn assign_refuses_to_move_a_key() {
    let mut map = IdentityMap::new();
    let first = ProjectId::derive("a");
    let second = ProjectId::derive("b");
    map.assign("pts_1".into(), first).unwrap();
    map.assign("pts_1".into(), first).unwrap();
    let err = map.assign("pts_1".into(), second).unwrap_err();
    assert!(matches!(err, Error::AlreadyAssigned { .. }));
    assert_eq!(map.get(&"pts_1".into()), Some(first));
    assert_eq!(map.len(), 1);
  }

  #[test]
  fn from_rows_rejects_conflicting_rows() {
    let rows = vec![
      (ProjectId::derive("a"), ForeignKey::from("pts_1")),
      (ProjectId::derive("b"), ForeignKey::from("pts_1")),
    ];
    assert!(matches!(
      IdentityMap::from_rows(rows),
      Err(Error::ConflictingRows { .. })
    ));
  }

  #[test]
  fn from_rows_collapses_duplicates_and_keeps_order() {
    let a = ProjectId::derive("a");
    let rows = vec![
      (a, ForeignKey::from("pts_2")),
      (a, ForeignKey::from("pts_1")),
      (a, ForeignKey::from("pts_2")),
    ];
    let map = IdentityMap::from_rows(rows).unwrap();
    let fks: Vec<_> = map.rows().map(|(_, fk)| fk.as_str()).collect();
    assert_eq!(fks, ["pts_2", "pts_1"]);
    assert_eq!(map.len(), 2);
  }

  #[test]
  fn likely_match_orders_keys() {
    let m = LikelyMatch::new(
      "tco_1".into(),
      "pts_1".into(),
      SignalKind::SharedParcel,
      0.6,
      MatchReason::BelowThreshold,
    );
    assert_eq!(m.fk_a.as_str(), "pts_1");
    assert_eq!(m.fk_b.as_str(), "tco_1");
  }

  #[test]
  fn signal_kind_text_round_trip() {
    for kind in [
      SignalKind::CrossReference,
      SignalKind::ParcelCorroborated,
      SignalKind::SharedParcel,
      SignalKind::NameSimilarity,
    ] {
      assert_eq!(kind.as_str().parse::<SignalKind>().unwrap(), kind);
    }
    assert!("nope".parse::<SignalKind>().is_err());
  }
}
