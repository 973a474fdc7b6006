//! Reference parcel table and the per-run lookup index.

use std::{
  collections::{BTreeSet, HashMap},
  fmt,
  fs::File,
  io::Read,
  path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  address::Address,
};

const REQUIRED_COLUMNS: [&str; 3] = ["blklot", "mapblklot", "address"];

/// A normalized parcel identifier: the assessor's map block+lot. Condominium
/// lots sharing a footprint share one key.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParcelKey(String);

impl ParcelKey {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ParcelKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// One row of the reference parcel table.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelRow {
  pub blklot:    String,
  pub mapblklot: String,
  #[serde(default)]
  pub address:   String,
}

type KeySet = BTreeSet<ParcelKey>;

fn single(keys: Option<&KeySet>) -> Option<ParcelKey> {
  match keys {
    Some(keys) if keys.len() == 1 => keys.first().cloned(),
    _ => None,
  }
}

/// Lookup structure built once per run from the reference table.
#[derive(Debug, Default)]
pub struct ParcelIndex {
  by_blklot:  HashMap<String, KeySet>,
  by_address: HashMap<String, KeySet>,
  by_relaxed: HashMap<String, KeySet>,
}

impl ParcelIndex {
  pub fn from_rows(rows: impl IntoIterator<Item = ParcelRow>) -> Self {
    let mut index = Self::default();
    for row in rows {
      let mapblklot = row.mapblklot.trim();
      if mapblklot.is_empty() {
        continue;
      }
      let key = ParcelKey::new(mapblklot);

      let blklot = row.blklot.trim();
      if !blklot.is_empty() {
        index
          .by_blklot
          .entry(blklot.to_string())
          .or_default()
          .insert(key.clone());
      }

      let address = Address::parse(&row.address);
      if address.is_empty() {
        continue;
      }
      if let Some(relaxed) = address.relaxed_key() {
        index.by_relaxed.entry(relaxed).or_default().insert(key.clone());
      }
      index
        .by_address
        .entry(address.to_string())
        .or_default()
        .insert(key);
    }
    tracing::debug!(
      blklots = index.by_blklot.len(),
      addresses = index.by_address.len(),
      "parcel index built"
    );
    index
  }

  /// Read a reference table with `blklot`, `mapblklot` and `address` columns.
  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
      .iter()
      .filter(|c| !headers.iter().any(|h| h.trim() == **c))
      .map(|c| c.to_string())
      .collect();
    if !missing.is_empty() {
      return Err(Error::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for row in reader.deserialize::<ParcelRow>() {
      rows.push(row?);
    }
    Ok(Self::from_rows(rows))
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let file = File::open(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let index = Self::from_reader(file)?;
    tracing::info!(
      path = %path.display(),
      parcels = index.len(),
      "parcel table loaded"
    );
    Ok(index)
  }

  /// Distinct parcel keys reachable by blklot.
  pub fn len(&self) -> usize {
    self.by_blklot.values().flatten().collect::<BTreeSet<_>>().len()
  }

  pub fn is_empty(&self) -> bool { self.by_blklot.is_empty() && self.by_address.is_empty() }

  /// The parcel for an assessor block+lot, if exactly one.
  pub fn by_blklot(&self, blklot: &str) -> Option<ParcelKey> {
    single(self.by_blklot.get(blklot.trim()))
  }

  /// Resolve a raw address: exact canonical match first, then `number +
  /// street name`. A step matching more than one parcel yields nothing.
  pub fn normalize(&self, raw_address: &str) -> Option<ParcelKey> {
    let address = Address::parse(raw_address);
    if address.is_empty() {
      return None;
    }
    if let Some(keys) = self.by_address.get(&address.to_string()) {
      return single(Some(keys));
    }
    single(self.by_relaxed.get(&address.relaxed_key()?))
  }

  /// Resolve a record: its blklot when it has one, otherwise its address.
  pub fn resolve(&self, address: Option<&str>, blklot: Option<&str>) -> Option<ParcelKey> {
    if let Some(key) = blklot.and_then(|b| self.by_blklot(b)) {
      return Some(key);
    }
    address.and_then(|a| self.normalize(a))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TABLE: &str = "\
blklot,mapblklot,address,from_st
3705035,3705035,1 MARKET ST,1
3514098,3514045,1 VAN NESS AVE,1
3514099,3514045,1 VAN NESS AVE,1
0001001,0001001,20 MAIN ST,20
0002001,0002001,20 MAIN AVE,20
0003001,0003001,,
";

  fn index() -> ParcelIndex { ParcelIndex::from_reader(TABLE.as_bytes()).unwrap() }

  #[test]
  fn exact_match_across_spellings() {
    let index = index();
    let key = Some(ParcelKey::new("3705035"));
    assert_eq!(index.normalize("1 Market Street"), key);
    assert_eq!(index.normalize("0001 market st., SF CA 94105"), key);
  }

  #[test]
  fn condo_lots_collapse_to_one_key() {
    let index = index();
    assert_eq!(index.by_blklot("3514098"), Some(ParcelKey::new("3514045")));
    assert_eq!(index.by_blklot("3514099"), Some(ParcelKey::new("3514045")));
    assert_eq!(index.normalize("1 Van Ness Ave #5"), Some(ParcelKey::new("3514045")));
  }

  #[test]
  fn relaxed_match_must_be_unique() {
    let index = index();
    // Exact hits still work.
    assert_eq!(index.normalize("20 Main Ave"), Some(ParcelKey::new("0002001")));
    // Without a suffix, both MAIN parcels match: refuse to guess.
    assert_eq!(index.normalize("20 Main"), None);
    // Relaxed match with a single candidate.
    assert_eq!(index.normalize("1 Market"), Some(ParcelKey::new("3705035")));
  }

  #[test]
  fn unknown_inputs_yield_none() {
    let index = index();
    assert_eq!(index.normalize(""), None);
    assert_eq!(index.normalize("999 Nowhere Ln"), None);
    assert_eq!(index.by_blklot("foo"), None);
    assert_eq!(index.by_blklot(""), None);
  }

  #[test]
  fn blklot_takes_precedence() {
    let index = index();
    assert_eq!(
      index.resolve(Some("20 Main Ave"), Some("3705035")),
      Some(ParcelKey::new("3705035"))
    );
    assert_eq!(
      index.resolve(Some("20 Main Ave"), Some("unknown")),
      Some(ParcelKey::new("0002001"))
    );
  }

  #[test]
  fn normalizing_canonical_text_is_stable() {
    let index = index();
    for raw in ["1 Van Ness Ave #5", "1-9 market st", "20 main ave, CA"] {
      let canonical = crate::canonicalize(raw);
      assert_eq!(index.normalize(&canonical), index.normalize(raw), "{raw}");
    }
  }

  #[test]
  fn missing_columns_are_reported() {
    let err = ParcelIndex::from_reader("blklot,address\n1,2\n".as_bytes()).unwrap_err();
    assert!(matches!(err, Error::MissingColumns(cols) if cols == ["mapblklot"]));
  }
}
