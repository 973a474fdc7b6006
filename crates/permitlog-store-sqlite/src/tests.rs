//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use permitlog_core::{
  fact::{Fact, ForeignKey},
  identity::{IdentityMap, LikelyMatch, MatchReason, ProjectId, SignalKind},
  store::{FactLogStore, IdentityStore, RunStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fact(fk: &str, day: u32, name: &str, value: &str) -> Fact {
  Fact {
    foreign_key: fk.into(),
    source:      "pts".into(),
    observed_at: NaiveDate::from_ymd_opt(2021, 3, day).unwrap(),
    name:        name.into(),
    value:       value.into(),
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_loads_empty() {
  let s = store().await;
  assert!(s.load_facts().await.unwrap().is_empty());
  assert!(s.load_identity_map().await.unwrap().is_empty());
  assert!(s.load_likely_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn facts_load_in_append_order() {
  let s = store().await;
  let batches = [
    vec![fact("pts_2", 1, "status", "filed"), fact("pts_1", 1, "status", "filed")],
    vec![fact("pts_2", 4, "status", "issued")],
  ];
  for batch in &batches {
    s.append_facts(batch.clone()).await.unwrap();
  }

  let log = s.load_facts().await.unwrap();
  let expected: Vec<Fact> = batches.concat();
  assert_eq!(log.facts(), expected.as_slice());
  let latest = log.latest();
  assert_eq!(
    latest.get(&"pts_2".into()).and_then(|r| r.get("status")),
    Some("issued")
  );
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn identity_map_replaces_previous_rows() {
  let s = store().await;
  let x = ProjectId::derive("x");
  let y = ProjectId::derive("y");

  let first = IdentityMap::from_rows([(x, ForeignKey::new("ppts_b"))]).unwrap();
  s.save_resolution(&first, &[]).await.unwrap();

  let mut second = first.clone();
  second.assign("ppts_a".into(), y).unwrap();
  second.assign("tco_c".into(), x).unwrap();
  s.save_resolution(&second, &[]).await.unwrap();

  let loaded = s.load_identity_map().await.unwrap();
  let rows: Vec<_> = loaded.rows().map(|(id, fk)| (*id, fk.to_string())).collect();
  assert_eq!(rows, [
    (x, "ppts_b".to_string()),
    (y, "ppts_a".to_string()),
    (x, "tco_c".to_string())
  ]);
}

// ─── Likely matches ──────────────────────────────────────────────────────────

#[tokio::test]
async fn likely_matches_round_trip_and_replace() {
  let s = store().await;
  let report = vec![
    LikelyMatch::new(
      "mohcd_pipeline_1".into(),
      "bmr_7".into(),
      SignalKind::NameSimilarity,
      0.91,
      MatchReason::BelowThreshold,
    ),
    LikelyMatch::new(
      "ppts_1".into(),
      "ppts_2".into(),
      SignalKind::CrossReference,
      1.0,
      MatchReason::MultipleIdentities,
    ),
  ];
  s.save_resolution(&IdentityMap::new(), &report).await.unwrap();
  assert_eq!(s.load_likely_matches().await.unwrap(), report);

  s.save_resolution(&IdentityMap::new(), &report[1..]).await.unwrap();
  assert_eq!(s.load_likely_matches().await.unwrap(), report[1..].to_vec());
}

#[tokio::test]
async fn file_store_persists_across_opens() {
  let dir = tempfile::tempdir().expect("temp dir");
  let path = dir.path().join("permitlog.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.append_facts(vec![fact("pts_1", 1, "status", "filed")])
      .await
      .unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.load_facts().await.unwrap().len(), 1);
}

// ─── Whole runs ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_run_writes_everything() {
  let s = store().await;
  let map = IdentityMap::from_rows([(ProjectId::derive("x"), "pts_1".into())]).unwrap();
  let report = vec![LikelyMatch::new(
    "pts_1".into(),
    "tco_1".into(),
    SignalKind::SharedParcel,
    0.6,
    MatchReason::BelowThreshold,
  )];
  s.commit_run(vec![fact("pts_1", 1, "status", "filed")], &map, &report)
    .await
    .unwrap();

  assert_eq!(s.load_facts().await.unwrap().len(), 1);
  assert_eq!(s.load_identity_map().await.unwrap().len(), 1);
  assert_eq!(s.load_likely_matches().await.unwrap(), report);
}

#[tokio::test]
async fn failed_commit_run_changes_nothing() {
  let dir = tempfile::tempdir().expect("temp dir");
  let path = dir.path().join("permitlog.db");
  let s = SqliteStore::open(&path).await.unwrap();
  let map = IdentityMap::from_rows([(ProjectId::derive("x"), "pts_1".into())]).unwrap();
  s.commit_run(vec![fact("pts_1", 1, "status", "filed")], &map, &[])
    .await
    .unwrap();

  // Reject any report row so the last statement of the run fails.
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute_batch(
      "CREATE TRIGGER reject_report BEFORE INSERT ON likely_matches
       BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();

  let mut next = map.clone();
  next.assign("pts_2".into(), ProjectId::derive("y")).unwrap();
  let report = [LikelyMatch::new(
    "pts_1".into(),
    "pts_2".into(),
    SignalKind::NameSimilarity,
    0.9,
    MatchReason::BelowThreshold,
  )];
  let result = s
    .commit_run(vec![fact("pts_2", 2, "status", "filed")], &next, &report)
    .await;
  assert!(result.is_err());

  assert_eq!(s.load_facts().await.unwrap().len(), 1);
  assert_eq!(s.load_identity_map().await.unwrap().len(), 1);
  assert!(s.load_likely_matches().await.unwrap().is_empty());
}
