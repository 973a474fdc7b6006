//! [`SqliteStore`]: the SQLite implementation of the store traits.

use std::path::Path;

use permitlog_core::{
  fact::{Fact, FactLog},
  identity::{IdentityMap, LikelyMatch},
  store::{FactLogStore, IdentityStore, RunStore},
};

use crate::{
  Error, Result,
  encode::{RawFact, RawIdentity, RawLikely},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Fact log, identity map and likely-match report in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

fn insert_facts(tx: &rusqlite::Transaction<'_>, raws: &[RawFact]) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT INTO facts (fk, source, last_updated, name, value)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for raw in raws {
    stmt.execute(rusqlite::params![
      raw.fk,
      raw.source,
      raw.last_updated,
      raw.name,
      raw.value,
    ])?;
  }
  Ok(())
}

fn replace_identities(
  tx: &rusqlite::Transaction<'_>,
  rows: &[(String, String)],
) -> rusqlite::Result<()> {
  tx.execute("DELETE FROM identities", [])?;
  let mut stmt =
    tx.prepare("INSERT INTO identities (position, uuid, fk) VALUES (?1, ?2, ?3)")?;
  for (position, (uuid, fk)) in rows.iter().enumerate() {
    stmt.execute(rusqlite::params![position as i64, uuid, fk])?;
  }
  Ok(())
}

fn replace_likely(tx: &rusqlite::Transaction<'_>, raws: &[RawLikely]) -> rusqlite::Result<()> {
  tx.execute("DELETE FROM likely_matches", [])?;
  let mut stmt = tx.prepare(
    "INSERT INTO likely_matches
       (position, fk_a, fk_b, signal_kind, confidence, reason)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  for (position, raw) in raws.iter().enumerate() {
    stmt.execute(rusqlite::params![
      position as i64,
      raw.fk_a,
      raw.fk_b,
      raw.signal_kind,
      raw.confidence,
      raw.reason,
    ])?;
  }
  Ok(())
}

fn identity_rows(map: &IdentityMap) -> Vec<(String, String)> {
  map
    .rows()
    .map(|(id, fk)| (id.to_string(), fk.to_string()))
    .collect()
}

// ─── FactLogStore impl ───────────────────────────────────────────────────────

impl FactLogStore for SqliteStore {
  type Error = Error;

  async fn load_facts(&self) -> Result<FactLog> {
    let raws: Vec<RawFact> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT fk, source, last_updated, name, value FROM facts ORDER BY seq",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawFact {
              fk:           row.get(0)?,
              source:       row.get(1)?,
              last_updated: row.get(2)?,
              name:         row.get(3)?,
              value:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let facts = raws
      .into_iter()
      .map(RawFact::into_fact)
      .collect::<Result<Vec<_>>>()?;
    tracing::debug!(facts = facts.len(), "fact log loaded");
    Ok(FactLog::from_facts(facts))
  }

  async fn append_facts(&self, facts: Vec<Fact>) -> Result<()> {
    if facts.is_empty() {
      return Ok(());
    }
    let raws: Vec<RawFact> = facts.iter().map(RawFact::encode).collect();
    let count = raws.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_facts(&tx, &raws)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!(facts = count, "facts appended");
    Ok(())
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  async fn load_identity_map(&self) -> Result<IdentityMap> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT uuid, fk FROM identities ORDER BY position")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawIdentity {
              uuid: row.get(0)?,
              fk:   row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(RawIdentity::into_row)
      .collect::<Result<Vec<_>>>()?;
    Ok(IdentityMap::from_rows(rows)?)
  }

  async fn load_likely_matches(&self) -> Result<Vec<LikelyMatch>> {
    let raws: Vec<RawLikely> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT fk_a, fk_b, signal_kind, confidence, reason
           FROM likely_matches ORDER BY position",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawLikely {
              fk_a:        row.get(0)?,
              fk_b:        row.get(1)?,
              signal_kind: row.get(2)?,
              confidence:  row.get(3)?,
              reason:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLikely::into_match).collect()
  }

  async fn save_resolution<'a>(
    &'a self,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> Result<()> {
    let rows = identity_rows(map);
    let raws: Vec<RawLikely> = matches.iter().map(RawLikely::encode).collect();
    let (identity_count, likely_count) = (rows.len(), raws.len());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        replace_identities(&tx, &rows)?;
        replace_likely(&tx, &raws)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!(
      identity_rows = identity_count,
      likely_matches = likely_count,
      "resolution written"
    );
    Ok(())
  }
}

// ─── RunStore impl ───────────────────────────────────────────────────────────

impl RunStore for SqliteStore {
  async fn commit_run<'a>(
    &'a self,
    facts: Vec<Fact>,
    map: &'a IdentityMap,
    matches: &'a [LikelyMatch],
  ) -> Result<()> {
    let facts: Vec<RawFact> = facts.iter().map(RawFact::encode).collect();
    let rows = identity_rows(map);
    let raws: Vec<RawLikely> = matches.iter().map(RawLikely::encode).collect();
    let fact_count = facts.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_facts(&tx, &facts)?;
        replace_identities(&tx, &rows)?;
        replace_likely(&tx, &raws)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!(facts = fact_count, identity_rows = map.len(), "run committed");
    Ok(())
  }
}
