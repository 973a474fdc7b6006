//! Snapshot diff pipeline: full-table snapshot → minimal appended facts.
//!
//! Computes the facts that must be appended to a fact log so that its latest
//! values reflect an incoming snapshot. Records missing from the snapshot are
//! left alone; a source file that drops a row is not evidence of deletion.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::fact::{Fact, FactLog, ForeignKey, NewFact};

/// The result of diffing a snapshot against the previous fact log.
#[derive(Debug, Default)]
pub struct DiffResult {
  /// New or changed facts, stamped with the run date, in snapshot order.
  pub appended:   Vec<Fact>,
  /// Candidates whose value matched the latest logged value.
  pub unchanged:  usize,
  /// Candidates dropped because their value was empty.
  pub empty:      usize,
  /// Candidates overridden by a later row for the same field in the same
  /// snapshot.
  pub superseded: usize,
}

type FieldKey = (ForeignKey, String, String);

fn field_key(fact: &NewFact) -> FieldKey {
  (fact.foreign_key.clone(), fact.source.clone(), fact.name.clone())
}

/// Reduce a snapshot to its last non-empty value per
/// `(foreign_key, source, field_name)`, in first-seen order.
fn collapse(
  snapshot: impl IntoIterator<Item = NewFact>,
  result: &mut DiffResult,
) -> Vec<(FieldKey, NewFact)> {
  let mut rows: Vec<(FieldKey, NewFact)> = Vec::new();
  let mut positions: HashMap<FieldKey, usize> = HashMap::new();

  for mut candidate in snapshot {
    let trimmed = candidate.value.trim();
    if trimmed.is_empty() {
      result.empty += 1;
      continue;
    }
    if trimmed.len() != candidate.value.len() {
      candidate.value = trimmed.to_string();
    }

    let key = field_key(&candidate);
    match positions.get(&key) {
      Some(&at) => {
        rows[at].1 = candidate;
        result.superseded += 1;
      }
      None => {
        positions.insert(key.clone(), rows.len());
        rows.push((key, candidate));
      }
    }
  }
  rows
}

/// Compute the facts to append to `previous` for `snapshot`.
///
/// Values are trimmed and empty values never become facts. When a snapshot
/// holds the same `(foreign_key, source, field_name)` more than once, the
/// last row wins. A field is emitted only if no prior fact exists for it or
/// its value differs from the most recent one. Running the same snapshot
/// against `previous` plus the returned facts yields nothing.
pub fn diff(
  previous: &FactLog,
  snapshot: impl IntoIterator<Item = NewFact>,
  run_date: NaiveDate,
) -> DiffResult {
  let mut result = DiffResult::default();
  let rows = collapse(snapshot, &mut result);

  let mut latest: HashMap<FieldKey, &str> = HashMap::with_capacity(previous.len());
  for fact in previous.facts() {
    latest.insert(
      (
        fact.foreign_key.clone(),
        fact.source.clone(),
        fact.name.clone(),
      ),
      fact.value.as_str(),
    );
  }

  for (key, candidate) in rows {
    if latest.get(&key).is_some_and(|current| *current == candidate.value) {
      result.unchanged += 1;
    } else {
      result.appended.push(candidate.stamp(run_date));
    }
  }

  tracing::debug!(
    appended = result.appended.len(),
    unchanged = result.unchanged,
    superseded = result.superseded,
    "snapshot diffed"
  );
  result
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
  }

  fn row(fk: &str, name: &str, value: &str) -> NewFact {
    NewFact::new(fk.into(), "pts", name, value)
  }

  fn snapshot_one() -> Vec<NewFact> {
    vec![
      row("pts_1", "permit_number", "201705237369"),
      row("pts_1", "current_status", "filed"),
      row("pts_1", "proposed_units", "12"),
      row("pts_2", "permit_number", "201705237370"),
      row("pts_2", "current_status", "issued"),
    ]
  }

  #[test]
  fn empty_log_all_new() {
    let result = diff(&FactLog::new(), snapshot_one(), day(1));
    assert_eq!(result.appended.len(), 5);
    assert!(result.appended.iter().all(|f| f.observed_at == day(1)));
    assert_eq!(result.unchanged, 0);
  }

  #[test]
  fn second_application_is_empty() {
    let mut log = FactLog::new();
    let first = diff(&log, snapshot_one(), day(1));
    log.append(first.appended);

    let second = diff(&log, snapshot_one(), day(2));
    assert!(
      second.appended.is_empty(),
      "unexpected facts: {:?}",
      second.appended
    );
    assert_eq!(second.unchanged, 5);
  }

  #[test]
  fn one_changed_field_is_one_fact() {
    let mut log = FactLog::new();
    log.append(diff(&log, snapshot_one(), day(1)).appended);

    let mut next = snapshot_one();
    next[1] = row("pts_1", "current_status", "issued");
    let result = diff(&log, next, day(2));

    assert_eq!(result.appended.len(), 1);
    let fact = &result.appended[0];
    assert_eq!(fact.foreign_key.as_str(), "pts_1");
    assert_eq!(fact.name, "current_status");
    assert_eq!(fact.value, "issued");
    assert_eq!(fact.observed_at, day(2));
  }

  #[test]
  fn absent_records_are_not_tombstoned() {
    let mut log = FactLog::new();
    log.append(diff(&log, snapshot_one(), day(1)).appended);

    let only_two: Vec<_> = snapshot_one()
      .into_iter()
      .filter(|f| f.foreign_key.as_str() == "pts_2")
      .collect();
    let result = diff(&log, only_two, day(2));
    assert!(result.appended.is_empty());
    assert_eq!(log.latest().len(), 2);
  }

  #[test]
  fn flip_back_emits_again() {
    let mut log = FactLog::new();
    for (d, status) in [(1, "filed"), (2, "issued"), (3, "filed")] {
      let result = diff(&log, vec![row("pts_1", "current_status", status)], day(d));
      assert_eq!(result.appended.len(), 1, "day {d}");
      log.append(result.appended);
    }
    let latest = log.latest();
    assert_eq!(
      latest.get(&"pts_1".into()).unwrap().get("current_status"),
      Some("filed")
    );
    assert_eq!(log.len(), 3);
  }

  #[test]
  fn duplicate_rows_in_snapshot_keep_the_last_value() {
    let snapshot = vec![
      row("pts_1", "current_status", "filed"),
      row("pts_2", "current_status", "filed"),
      row("pts_1", "current_status", "filed"),
      row("pts_1", "current_status", "issued"),
    ];
    let result = diff(&FactLog::new(), snapshot, day(1));
    let values: Vec<_> = result
      .appended
      .iter()
      .map(|f| (f.foreign_key.as_str(), f.value.as_str()))
      .collect();
    assert_eq!(values, [("pts_1", "issued"), ("pts_2", "filed")]);
    assert_eq!(result.superseded, 2);
  }

  #[test]
  fn conflicting_duplicates_settle_after_one_run() {
    let snapshot = || {
      vec![
        NewFact::new("tco_1_2018-05-01".into(), "tco", "num_units", "10"),
        NewFact::new("tco_1_2018-05-01".into(), "tco", "num_units", "12"),
      ]
    };
    let mut log = FactLog::new();
    for d in 1..=3 {
      log.append(diff(&log, snapshot(), day(d)).appended);
    }
    assert_eq!(log.len(), 1);
    assert_eq!(log.facts()[0].value, "12");
  }

  #[test]
  fn values_are_trimmed_and_empties_dropped() {
    let snapshot = vec![
      row("pts_1", "street_name", "  MISSION "),
      row("pts_1", "unit", "   "),
    ];
    let result = diff(&FactLog::new(), snapshot, day(1));
    assert_eq!(result.appended.len(), 1);
    assert_eq!(result.appended[0].value, "MISSION");
    assert_eq!(result.empty, 1);
  }

  #[test]
  fn same_field_name_in_other_source_is_independent() {
    let mut log = FactLog::new();
    log.append(diff(&log, vec![row("x_1", "status", "a")], day(1)).appended);
    let other = NewFact::new("x_1".into(), "tco", "status", "a");
    let result = diff(&log, vec![other], day(2));
    assert_eq!(result.appended.len(), 1);
  }

  fn arb_snapshot() -> impl Strategy<Value = Vec<NewFact>> {
    prop::collection::vec(
      (0u8..6, 0u8..4, "[a-c ]{0,3}").prop_map(|(fk, field, value)| {
        NewFact::new(
          ForeignKey::from_parts("pts", [fk.to_string()]),
          "pts",
          format!("field_{field}"),
          value,
        )
      }),
      0..40,
    )
  }

  proptest! {
    #[test]
    fn diff_is_idempotent(first in arb_snapshot(), second in arb_snapshot()) {
      let mut log = FactLog::new();
      log.append(diff(&log, first, day(1)).appended);
      let appended = diff(&log, second.clone(), day(2)).appended;
      let before = log.facts().to_vec();
      log.append(appended);

      // Append-only: the earlier prefix is untouched.
      prop_assert_eq!(&log.facts()[..before.len()], &before[..]);

      let again = diff(&log, second, day(3));
      prop_assert!(again.appended.is_empty(), "re-emitted: {:?}", again.appended);
    }
  }
}
