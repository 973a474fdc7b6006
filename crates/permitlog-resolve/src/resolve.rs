//! Cluster assignment: match edges + prior identity map → new identity map.

use std::collections::{BTreeMap, HashMap, HashSet};

use permitlog_core::{
  fact::{FactLog, ForeignKey},
  identity::{IdentityMap, LikelyMatch, MatchReason, ProjectId},
};
use permitlog_parcel::ParcelIndex;
use serde::Serialize;

use crate::{
  Error, Result,
  cluster::UnionFind,
  config::{AmbiguousPolicy, ResolverConfig},
  record::RecordSet,
  signal::{Edge, default_signals, evaluate_all},
};

/// Counts describing one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
  pub records:         usize,
  /// Prior rows whose foreign key no longer appears in the fact log.
  pub carried_forward: usize,
  /// Project ids minted this run.
  pub new_identities:  usize,
  /// Foreign keys that joined an existing project id.
  pub linked:          usize,
  /// Unseen components whose confirmed matches reached several projects.
  pub ambiguous:       usize,
  /// Foreign keys left unassigned by the ambiguity policy.
  pub deferred:        usize,
  /// Confirmed matches between keys already bound to different projects.
  pub conflicts:       usize,
  pub likely_matches:  usize,
}

#[derive(Debug, Clone)]
pub struct Resolution {
  pub identity_map:   IdentityMap,
  pub likely_matches: Vec<LikelyMatch>,
  pub stats:          ResolveStats,
}

/// Resolve every record of `log` to a project id.
///
/// Keys bound in `prior` never move. Unseen keys joined by confirmed matches
/// form components; a component reaching exactly one existing project joins
/// it, one reaching none gets a fresh id, one reaching several is ambiguous.
/// Without `parcels` the parcel signals never fire.
pub fn resolve(
  log: &FactLog,
  prior: &IdentityMap,
  parcels: Option<&ParcelIndex>,
  config: &ResolverConfig,
) -> Result<Resolution> {
  let latest = log.latest();
  let records = RecordSet::build(&latest, parcels);
  let signals = default_signals(config);
  let edges = evaluate_all(&records, &signals);
  tracing::debug!(records = records.len(), edges = edges.len(), "match signals evaluated");
  assign(&records, &edges, prior, config)
}

/// Mint a project id seeded by `seed`, skipping ids already in use.
fn mint(seed: &ForeignKey, taken: &mut HashSet<ProjectId>) -> ProjectId {
  let mut id = ProjectId::derive(seed.as_str());
  let mut attempt = 1u32;
  while !taken.insert(id) {
    id = ProjectId::derive(&format!("{seed}#{attempt}"));
    attempt += 1;
  }
  id
}

fn likely(records: &RecordSet, edge: &Edge, reason: MatchReason) -> LikelyMatch {
  LikelyMatch::new(
    records.get(edge.a).fk.clone(),
    records.get(edge.b).fk.clone(),
    edge.signal,
    edge.verdict.confidence(),
    reason,
  )
}

fn assign(
  records: &RecordSet,
  edges: &[Edge],
  prior: &IdentityMap,
  config: &ResolverConfig,
) -> Result<Resolution> {
  let prior_id = |i: usize| prior.get(&records.get(i).fk);

  let mut stats = ResolveStats {
    records: records.len(),
    carried_forward: prior
      .rows()
      .filter(|(_, fk)| records.index_of(fk).is_none())
      .count(),
    ..ResolveStats::default()
  };
  let mut likely_matches = Vec::new();
  let mut uf = UnionFind::new(records.len());
  // (unseen position, project id it reaches, edge)
  let mut anchored: Vec<(usize, ProjectId, &Edge)> = Vec::new();

  for edge in edges.iter().filter(|e| e.verdict.is_confirmed()) {
    match (prior_id(edge.a), prior_id(edge.b)) {
      (None, None) => uf.union(edge.a, edge.b),
      (Some(id), None) => anchored.push((edge.b, id, edge)),
      (None, Some(id)) => anchored.push((edge.a, id, edge)),
      (Some(x), Some(y)) if x != y => {
        tracing::warn!(
          a = %records.get(edge.a).fk,
          b = %records.get(edge.b).fk,
          signal = %edge.signal,
          "confirmed match between different project ids; not applied"
        );
        stats.conflicts += 1;
        likely_matches.push(likely(records, edge, MatchReason::IdentityConflict));
      }
      (Some(_), Some(_)) => {}
    }
  }

  let mut reached: HashMap<usize, BTreeMap<ProjectId, Vec<&Edge>>> = HashMap::new();
  for (position, id, edge) in anchored {
    let root = uf.find(position);
    reached
      .entry(root)
      .or_default()
      .entry(id)
      .or_default()
      .push(edge);
  }

  let mut taken: HashSet<ProjectId> = prior.rows().map(|(id, _)| *id).collect();
  let mut new_rows: Vec<(ForeignKey, ProjectId)> = Vec::new();
  let unseen = (0..records.len()).filter(|&i| prior_id(i).is_none());

  for component in uf.components(unseen) {
    let seed = &records.get(component[0]).fk;
    let root = uf.find(component[0]);

    let targets = reached.get(&root);
    let ids: Vec<ProjectId> = targets
      .map(|t| t.keys().copied().collect())
      .unwrap_or_default();

    let id = match ids.as_slice() {
      [] => {
        stats.new_identities += 1;
        mint(seed, &mut taken)
      }
      [id] => {
        stats.linked += component.len();
        *id
      }
      _ => {
        stats.ambiguous += 1;
        tracing::warn!(
          fk = %seed,
          projects = ids.len(),
          policy = ?config.ambiguous_policy,
          "confirmed matches reach several project ids"
        );
        for edge in targets.into_iter().flat_map(BTreeMap::values).flatten() {
          likely_matches.push(likely(records, edge, MatchReason::MultipleIdentities));
        }
        match config.ambiguous_policy {
          AmbiguousPolicy::Mint => {
            stats.new_identities += 1;
            mint(seed, &mut taken)
          }
          AmbiguousPolicy::Defer => {
            stats.deferred += component.len();
            continue;
          }
        }
      }
    };

    for &position in &component {
      new_rows.push((records.get(position).fk.clone(), id));
    }
  }

  new_rows.sort();
  let mut identity_map = prior.clone();
  for (fk, id) in new_rows {
    identity_map.assign(fk, id)?;
  }

  for edge in edges.iter().filter(|e| !e.verdict.is_confirmed()) {
    let a = identity_map.get(&records.get(edge.a).fk);
    let b = identity_map.get(&records.get(edge.b).fk);
    if a.is_some() && a == b {
      continue;
    }
    likely_matches.push(likely(records, edge, MatchReason::BelowThreshold));
  }
  sort_likely_matches(&mut likely_matches);
  stats.likely_matches = likely_matches.len();

  tracing::info!(
    records = stats.records,
    new_identities = stats.new_identities,
    linked = stats.linked,
    ambiguous = stats.ambiguous,
    conflicts = stats.conflicts,
    likely_matches = stats.likely_matches,
    "identities resolved"
  );

  Ok(Resolution {
    identity_map,
    likely_matches,
    stats,
  })
}

/// Canonical report order; one row per pair, signal and reason.
pub fn sort_likely_matches(matches: &mut Vec<LikelyMatch>) {
  matches.sort_by(|x, y| {
    x.sort_key()
      .cmp(&y.sort_key())
      .then(y.confidence.total_cmp(&x.confidence))
  });
  matches.dedup_by(|next, kept| next.sort_key() == kept.sort_key());
}

/// Bind the unassigned `fk` to the project of `target`.
pub fn promote(
  map: &mut IdentityMap,
  fk: ForeignKey,
  target: &ForeignKey,
) -> Result<ProjectId> {
  let id = map
    .get(target)
    .ok_or_else(|| Error::TargetUnassigned(target.clone()))?;
  if let Some(existing) = map.get(&fk) {
    return Err(Error::AlreadyAssigned { fk, existing });
  }
  map.assign(fk, id)?;
  Ok(id)
}

/// Drop report rows whose two keys now share a project.
pub fn prune_resolved(matches: &mut Vec<LikelyMatch>, map: &IdentityMap) {
  matches.retain(|m| {
    let a = map.get(&m.fk_a);
    a.is_none() || a != map.get(&m.fk_b)
  });
}
