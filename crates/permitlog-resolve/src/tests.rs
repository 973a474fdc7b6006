//! Resolution scenarios over small in-memory fact logs.

use chrono::NaiveDate;
use permitlog_core::{
  fact::{FactLog, ForeignKey, NewFact},
  identity::{IdentityMap, LikelyMatch, MatchReason, ProjectId, SignalKind},
};
use permitlog_parcel::ParcelIndex;
use permitlog_sources::SourceKind;
use proptest::prelude::*;

use crate::{
  AmbiguousPolicy, Error, ResolverConfig, promote, prune_resolved, resolve,
};

fn fk(kind: SourceKind, id: &str) -> ForeignKey {
  ForeignKey::from_parts(kind.name(), [id])
}

fn rec(kind: SourceKind, id: &str, fields: &[(&str, &str)]) -> Vec<NewFact> {
  fields
    .iter()
    .map(|(name, value)| NewFact::new(fk(kind, id), kind.name(), *name, *value))
    .collect()
}

fn log_of(records: Vec<Vec<NewFact>>) -> FactLog {
  let day = NaiveDate::from_ymd_opt(2020, 1, 29).unwrap();
  FactLog::from_facts(
    records
      .into_iter()
      .flatten()
      .map(|f| f.stamp(day))
      .collect(),
  )
}

fn parcels() -> ParcelIndex {
  ParcelIndex::from_reader(
    "blklot,mapblklot,address\n3705035,3705035,1 MARKET ST\n".as_bytes(),
  )
  .unwrap()
}

fn cfg() -> ResolverConfig { ResolverConfig::default() }

fn rows(map: &IdentityMap) -> Vec<(ProjectId, ForeignKey)> {
  map.rows().map(|(id, fk)| (*id, fk.clone())).collect()
}

// ─── Minting ─────────────────────────────────────────────────────────────────

#[test]
fn cold_start_mints_distinct_ids() {
  let log = log_of(vec![
    rec(SourceKind::Ppts, "2016-001514PRJ", &[("name", "Alpha")]),
    rec(SourceKind::Pts, "1444417185316", &[("permit_number", "201609218371")]),
  ]);
  let out = resolve(&log, &IdentityMap::new(), None, &cfg()).unwrap();

  let a = fk(SourceKind::Ppts, "2016-001514PRJ");
  let b = fk(SourceKind::Pts, "1444417185316");
  assert_eq!(out.identity_map.len(), 2);
  assert_eq!(out.identity_map.get(&a), Some(ProjectId::derive(a.as_str())));
  assert_ne!(out.identity_map.get(&a), out.identity_map.get(&b));
  assert_eq!(out.stats.new_identities, 2);
  assert!(out.likely_matches.is_empty());
}

#[test]
fn new_rows_follow_prior_rows_in_key_order() {
  let old = fk(SourceKind::Ppts, "OLD");
  let old_id = ProjectId::derive("old");
  let prior = IdentityMap::from_rows([(old_id, old.clone())]).unwrap();
  let log = log_of(vec![
    rec(SourceKind::Ppts, "b", &[("name", "B")]),
    rec(SourceKind::Ppts, "a", &[("name", "A")]),
  ]);

  let out = resolve(&log, &prior, None, &cfg()).unwrap();
  let fks: Vec<String> = rows(&out.identity_map)
    .into_iter()
    .map(|(_, fk)| fk.to_string())
    .collect();
  assert_eq!(fks, ["ppts_OLD", "ppts_a", "ppts_b"]);
  assert_eq!(out.identity_map.get(&old), Some(old_id));
  assert_eq!(out.stats.carried_forward, 1);
}

// ─── Cross references ────────────────────────────────────────────────────────

#[test]
fn cross_reference_links_to_existing_identity() {
  let planning = rec(SourceKind::Ppts, "2015-001", &[("record_id", "2015-001")]);
  let first = resolve(&log_of(vec![planning.clone()]), &IdentityMap::new(), None, &cfg())
    .unwrap();

  let housing = rec(SourceKind::MohcdPipeline, "M1", &[
    ("project_id", "M1"),
    ("planning_case_number", "2015-001"),
  ]);
  let second = resolve(
    &log_of(vec![planning, housing]),
    &first.identity_map,
    None,
    &cfg(),
  )
  .unwrap();

  let ppts_id = second.identity_map.get(&fk(SourceKind::Ppts, "2015-001"));
  assert!(ppts_id.is_some());
  assert_eq!(second.identity_map.get(&fk(SourceKind::MohcdPipeline, "M1")), ppts_id);
  assert_eq!(second.stats.linked, 1);
  assert_eq!(second.stats.new_identities, 0);
}

#[test]
fn cross_reference_by_field_value() {
  let log = log_of(vec![
    rec(SourceKind::Pts, "R1", &[("permit_number", "201705237369")]),
    rec(SourceKind::Tco, "201705237369_2018-05-01", &[(
      "building_permit_number",
      "201705237369",
    )]),
  ]);
  let out = resolve(&log, &IdentityMap::new(), None, &cfg()).unwrap();
  let pts = out.identity_map.get(&fk(SourceKind::Pts, "R1"));
  assert!(pts.is_some());
  assert_eq!(
    out.identity_map.get(&fk(SourceKind::Tco, "201705237369_2018-05-01")),
    pts
  );
  assert_eq!(out.stats.new_identities, 1);
}

#[test]
fn unseen_component_takes_smallest_key() {
  let log = log_of(vec![
    rec(SourceKind::Ppts, "B", &[("parent", "A")]),
    rec(SourceKind::Ppts, "A", &[("children", "B, C")]),
    rec(SourceKind::Ppts, "C", &[("name", "child")]),
  ]);
  let out = resolve(&log, &IdentityMap::new(), None, &cfg()).unwrap();
  let expected = ProjectId::derive("ppts_A");
  for id in ["A", "B", "C"] {
    assert_eq!(out.identity_map.get(&fk(SourceKind::Ppts, id)), Some(expected));
  }
  assert_eq!(out.stats.new_identities, 1);
}

// ─── Parcels ─────────────────────────────────────────────────────────────────

#[test]
fn shared_parcel_alone_is_only_likely() {
  let log = log_of(vec![
    rec(SourceKind::Bmr, "B1", &[
      ("project_name", "Casa"),
      ("address_full", "1 Market St"),
    ]),
    rec(SourceKind::Tco, "201705237369_2018-05-01", &[
      ("building_permit_number", "201705237369"),
      ("address_full", "1 Market Street 94105"),
    ]),
  ]);
  let index = parcels();
  let out = resolve(&log, &IdentityMap::new(), Some(&index), &cfg()).unwrap();

  let bmr = fk(SourceKind::Bmr, "B1");
  let tco = fk(SourceKind::Tco, "201705237369_2018-05-01");
  assert_ne!(out.identity_map.get(&bmr), out.identity_map.get(&tco));
  assert_eq!(out.likely_matches, vec![LikelyMatch::new(
    bmr,
    tco,
    SignalKind::SharedParcel,
    0.6,
    MatchReason::BelowThreshold,
  )]);
}

#[test]
fn shared_permit_number_on_a_parcel_is_confirmed() {
  let log = log_of(vec![
    rec(SourceKind::Tco, "201705237369_2018-05-01", &[
      ("building_permit_number", "201705237369"),
      ("address_full", "1 Market Street"),
    ]),
    rec(SourceKind::Ppts, "2015-001PRJ", &[
      ("building_permit_number", "BP 201705237369"),
      ("address_full", "1 Market St"),
    ]),
    rec(SourceKind::Ppts, "2015-002PRJ", &[
      ("building_permit_number", "201801010001"),
      ("address_full", "1 Market St"),
    ]),
  ]);
  let index = parcels();
  let out = resolve(&log, &IdentityMap::new(), Some(&index), &cfg()).unwrap();

  let project = ProjectId::derive("ppts_2015-001PRJ");
  let tco = fk(SourceKind::Tco, "201705237369_2018-05-01");
  let other = fk(SourceKind::Ppts, "2015-002PRJ");
  assert_eq!(out.identity_map.get(&fk(SourceKind::Ppts, "2015-001PRJ")), Some(project));
  assert_eq!(out.identity_map.get(&tco), Some(project));
  assert_ne!(out.identity_map.get(&other), Some(project));
  assert_eq!(out.stats.new_identities, 2);

  // The unrelated permit on the same parcel is only reported.
  assert_eq!(out.likely_matches, vec![LikelyMatch::new(
    other,
    tco,
    SignalKind::SharedParcel,
    0.6,
    MatchReason::BelowThreshold,
  )]);
}

#[test]
fn permit_group_on_a_parcel_is_confirmed() {
  let permit = |id: &str, number: &str| {
    rec(SourceKind::Pts, id, &[
      ("permit_number", number),
      ("blklot", "3705035"),
      ("filed_date", "2017/05/23"),
      ("proposed_use", "apartments"),
    ])
  };
  let log = log_of(vec![permit("R1", "201705230001"), permit("R2", "201705230002")]);
  let index = parcels();
  let out = resolve(&log, &IdentityMap::new(), Some(&index), &cfg()).unwrap();
  assert_eq!(
    out.identity_map.get(&fk(SourceKind::Pts, "R1")),
    out.identity_map.get(&fk(SourceKind::Pts, "R2"))
  );
  assert!(out.likely_matches.is_empty());
}

#[test]
fn without_parcel_table_parcel_signals_are_silent() {
  let log = log_of(vec![
    rec(SourceKind::Bmr, "B1", &[("address_full", "1 Market St")]),
    rec(SourceKind::Pts, "R1", &[("blklot", "3705035")]),
  ]);
  let out = resolve(&log, &IdentityMap::new(), None, &cfg()).unwrap();
  assert!(out.likely_matches.is_empty());
}

// ─── Names ───────────────────────────────────────────────────────────────────

#[test]
fn similar_names_across_sources_are_likely() {
  let log = log_of(vec![
    rec(SourceKind::MohcdPipeline, "M1", &[("project_name", "Casa Adelante")]),
    rec(SourceKind::Bmr, "B1", &[("project_name", "CASA ADELANTE")]),
    rec(SourceKind::Bmr, "B2", &[("project_name", "Market Tower")]),
  ]);
  let out = resolve(&log, &IdentityMap::new(), None, &cfg()).unwrap();
  assert_eq!(out.identity_map.len(), 3);
  assert_eq!(out.likely_matches.len(), 1);
  let m = &out.likely_matches[0];
  assert_eq!(m.signal, SignalKind::NameSimilarity);
  assert_eq!(m.fk_a, fk(SourceKind::Bmr, "B1"));
  assert_eq!(m.fk_b, fk(SourceKind::MohcdPipeline, "M1"));
}

// ─── Stability ───────────────────────────────────────────────────────────────

fn two_assigned() -> (IdentityMap, ProjectId, ProjectId) {
  let x = ProjectId::derive("x");
  let y = ProjectId::derive("y");
  let map = IdentityMap::from_rows([
    (x, fk(SourceKind::Ppts, "A")),
    (y, fk(SourceKind::Ppts, "B")),
  ])
  .unwrap();
  (map, x, y)
}

#[test]
fn conflicting_confirmation_is_reported_not_applied() {
  let (prior, x, y) = two_assigned();
  let log = log_of(vec![
    rec(SourceKind::Ppts, "A", &[("name", "A")]),
    rec(SourceKind::Ppts, "B", &[("parent", "A")]),
  ]);
  let out = resolve(&log, &prior, None, &cfg()).unwrap();

  assert_eq!(out.identity_map.get(&fk(SourceKind::Ppts, "A")), Some(x));
  assert_eq!(out.identity_map.get(&fk(SourceKind::Ppts, "B")), Some(y));
  assert_eq!(out.stats.conflicts, 1);
  assert_eq!(out.likely_matches[0].reason, MatchReason::IdentityConflict);
  assert_eq!(out.likely_matches[0].signal, SignalKind::CrossReference);
}

#[test]
fn ambiguous_component_follows_policy() {
  let (prior, x, y) = two_assigned();
  let log = log_of(vec![
    rec(SourceKind::Ppts, "A", &[("name", "A")]),
    rec(SourceKind::Ppts, "B", &[("name", "B")]),
    rec(SourceKind::Ppts, "C", &[("parent", "A"), ("children", "B")]),
  ]);
  let c = fk(SourceKind::Ppts, "C");

  let minted = resolve(&log, &prior, None, &cfg()).unwrap();
  let id = minted.identity_map.get(&c).unwrap();
  assert!(id != x && id != y);
  assert_eq!(minted.stats.ambiguous, 1);
  let reasons: Vec<_> = minted.likely_matches.iter().map(|m| m.reason).collect();
  assert_eq!(reasons, [
    MatchReason::MultipleIdentities,
    MatchReason::MultipleIdentities
  ]);

  let defer = ResolverConfig {
    ambiguous_policy: AmbiguousPolicy::Defer,
    ..cfg()
  };
  let deferred = resolve(&log, &prior, None, &defer).unwrap();
  assert_eq!(deferred.identity_map.get(&c), None);
  assert_eq!(deferred.stats.deferred, 1);
  assert_eq!(deferred.likely_matches.len(), 2);
}

#[test]
fn resolution_is_deterministic() {
  let log = log_of(vec![
    rec(SourceKind::Ppts, "A", &[("children", "B"), ("address_full", "1 Market St")]),
    rec(SourceKind::Ppts, "B", &[("name", "Tower")]),
    rec(SourceKind::Bmr, "B1", &[("address_full", "1 Market St")]),
    rec(SourceKind::MohcdInclusionary, "I1", &[("project_name", "Tower")]),
  ]);
  let index = parcels();
  let first = resolve(&log, &IdentityMap::new(), Some(&index), &cfg()).unwrap();
  let second = resolve(&log, &IdentityMap::new(), Some(&index), &cfg()).unwrap();
  assert_eq!(rows(&first.identity_map), rows(&second.identity_map));
  assert_eq!(first.likely_matches, second.likely_matches);

  // Feeding the output back in changes nothing.
  let again = resolve(&log, &first.identity_map, Some(&index), &cfg()).unwrap();
  assert_eq!(rows(&again.identity_map), rows(&first.identity_map));
  assert_eq!(again.likely_matches, first.likely_matches);
}

// ─── Promotion ───────────────────────────────────────────────────────────────

#[test]
fn promote_binds_only_unassigned_keys() {
  let (mut map, x, _) = two_assigned();
  let c = fk(SourceKind::Ppts, "C");
  let a = fk(SourceKind::Ppts, "A");
  let mut report = vec![LikelyMatch::new(
    a.clone(),
    c.clone(),
    SignalKind::CrossReference,
    1.0,
    MatchReason::MultipleIdentities,
  )];

  assert_eq!(promote(&mut map, c.clone(), &a).unwrap(), x);
  assert_eq!(map.get(&c), Some(x));
  prune_resolved(&mut report, &map);
  assert!(report.is_empty());

  assert!(matches!(
    promote(&mut map, c.clone(), &fk(SourceKind::Ppts, "B")),
    Err(Error::AlreadyAssigned { .. })
  ));
  assert!(matches!(
    promote(&mut map, fk(SourceKind::Ppts, "D"), &fk(SourceKind::Ppts, "nope")),
    Err(Error::TargetUnassigned(_))
  ));
}

// ─── Properties ──────────────────────────────────────────────────────────────

proptest! {
  #[test]
  fn bound_keys_never_move(
    parents in prop::collection::vec(prop::option::of(0usize..8), 8),
    bound in prop::collection::vec(prop::option::of(0u8..3), 8),
  ) {
    let id = |i: usize| i.to_string();
    let log = log_of(
      parents
        .iter()
        .enumerate()
        .map(|(i, parent)| match parent {
          Some(p) => rec(SourceKind::Ppts, &id(i), &[("parent", id(*p).as_str())]),
          None => rec(SourceKind::Ppts, &id(i), &[("name", "x")]),
        })
        .collect(),
    );
    let prior = IdentityMap::from_rows(bound.iter().enumerate().filter_map(|(i, b)| {
      b.map(|b| (ProjectId::derive(&format!("seed{b}")), fk(SourceKind::Ppts, &id(i))))
    }))
    .unwrap();

    let out = resolve(&log, &prior, None, &cfg()).unwrap();
    for (prior_id, key) in prior.rows() {
      prop_assert_eq!(out.identity_map.get(key), Some(*prior_id));
    }
    prop_assert_eq!(out.identity_map.len(), 8);

    let again = resolve(&log, &out.identity_map, None, &cfg()).unwrap();
    prop_assert_eq!(rows(&again.identity_map), rows(&out.identity_map));
  }
}
