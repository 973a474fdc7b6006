//! SQL schema for the permitlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Facts are strictly append-only; rowid order is log order.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS facts (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    fk           TEXT NOT NULL,
    source       TEXT NOT NULL,
    last_updated TEXT NOT NULL,   -- YYYY-MM-DD run date
    name         TEXT NOT NULL,
    value        TEXT NOT NULL
);

-- Rewritten as a whole on every save; `position` keeps row order.
CREATE TABLE IF NOT EXISTS identities (
    position INTEGER PRIMARY KEY,
    uuid     TEXT NOT NULL,
    fk       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS likely_matches (
    position    INTEGER PRIMARY KEY,
    fk_a        TEXT NOT NULL,
    fk_b        TEXT NOT NULL,
    signal_kind TEXT NOT NULL,
    confidence  REAL NOT NULL,
    reason      TEXT NOT NULL,
    CHECK (fk_a <= fk_b)
);

CREATE INDEX IF NOT EXISTS facts_fk_idx   ON facts(fk);
CREATE INDEX IF NOT EXISTS identities_uuid_idx ON identities(uuid);

PRAGMA user_version = 1;
";
