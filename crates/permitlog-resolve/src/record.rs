//! Resolver-side view of source records and the candidate indexes built over
//! them once per run.

use std::collections::{BTreeSet, HashMap};

use permitlog_core::fact::{ForeignKey, LatestValues, RecordView};
use permitlog_parcel::{Address, ParcelIndex, ParcelKey};
use permitlog_sources::{RefTarget, SourceKind};

use crate::similarity::words;

/// Comma-separated values of a field, trimmed, empties dropped.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
  value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

/// Reference numbers compare on letters and digits only.
pub(crate) fn reference(value: &str) -> String {
  value
    .chars()
    .filter(|c| c.is_alphanumeric())
    .flat_map(char::to_uppercase)
    .collect()
}

#[derive(Debug, Clone)]
pub struct Record {
  pub fk:         ForeignKey,
  /// `None` for a source tag this build does not know.
  pub kind:       Option<SourceKind>,
  pub name:       Option<String>,
  pub address:    Option<Address>,
  pub parcel:     Option<ParcelKey>,
  /// Normalized reference numbers.
  pub references: Vec<String>,
  /// Permit-group values, present only when every group field is set.
  pub group:      Option<Vec<String>>,
}

impl Record {
  fn from_view(view: &RecordView, parcels: Option<&ParcelIndex>) -> Self {
    let kind = view.source.parse::<SourceKind>().ok();
    let Some(profile) = kind.map(|k| k.profile()) else {
      return Self {
        fk:         view.foreign_key.clone(),
        kind,
        name:       None,
        address:    None,
        parcel:     None,
        references: Vec::new(),
        group:      None,
      };
    };

    let raw_address = profile.address_field.and_then(|f| view.get(f));
    let blklot = profile.blklot_field.and_then(|f| view.get(f));
    let parcel = parcels.and_then(|index| index.resolve(raw_address, blklot));
    let address = raw_address.map(Address::parse).filter(|a| !a.is_empty());

    let mut references: Vec<String> = profile
      .reference_fields
      .iter()
      .filter_map(|f| view.get(f))
      .flat_map(split_list)
      .map(reference)
      .filter(|r| !r.is_empty())
      .collect();
    references.sort();
    references.dedup();

    let group = (!profile.permit_group_fields.is_empty())
      .then(|| {
        profile
          .permit_group_fields
          .iter()
          .map(|f| view.get(f).map(str::to_string))
          .collect::<Option<Vec<_>>>()
      })
      .flatten();

    Self {
      fk: view.foreign_key.clone(),
      kind,
      name: profile
        .name_field
        .and_then(|f| view.get(f))
        .map(str::to_string),
      address,
      parcel,
      references,
      group,
    }
  }

  /// Text compared for name similarity: both names, or else both canonical
  /// addresses.
  pub fn comparable_text(&self, other: &Record) -> Option<(String, String)> {
    match (&self.name, &other.name) {
      (Some(a), Some(b)) => Some((a.clone(), b.clone())),
      _ => match (&self.address, &other.address) {
        (Some(a), Some(b)) => Some((a.to_string(), b.to_string())),
        _ => None,
      },
    }
  }

  fn block_tokens(&self) -> BTreeSet<String> {
    let mut tokens = self.name.as_deref().map(words).unwrap_or_default();
    if let Some(address) = &self.address {
      tokens.extend(address.street_name().map(str::to_string));
    }
    tokens
  }
}

/// Every record of the fact log plus the lookups the signals need.
#[derive(Debug, Default)]
pub struct RecordSet {
  /// Ascending foreign-key order; indexes below refer to positions here.
  records:     Vec<Record>,
  by_fk:       HashMap<ForeignKey, usize>,
  cross_links: Vec<BTreeSet<usize>>,
  by_parcel:   HashMap<ParcelKey, Vec<usize>>,
  by_token:    HashMap<String, Vec<usize>>,
}

impl RecordSet {
  pub fn build(latest: &LatestValues, parcels: Option<&ParcelIndex>) -> Self {
    let views: Vec<&RecordView> = latest.records().collect();
    let records: Vec<Record> = views
      .iter()
      .map(|view| Record::from_view(view, parcels))
      .collect();
    let by_fk: HashMap<ForeignKey, usize> = records
      .iter()
      .enumerate()
      .map(|(i, r)| (r.fk.clone(), i))
      .collect();

    let mut by_parcel: HashMap<ParcelKey, Vec<usize>> = HashMap::new();
    let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
      if let Some(parcel) = &record.parcel {
        by_parcel.entry(parcel.clone()).or_default().push(i);
      }
      for token in record.block_tokens() {
        by_token.entry(token).or_default().push(i);
      }
    }

    let cross_links = cross_links(&views, &records, &by_fk);

    Self {
      records,
      by_fk,
      cross_links,
      by_parcel,
      by_token,
    }
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn get(&self, index: usize) -> &Record { &self.records[index] }

  pub fn records(&self) -> &[Record] { &self.records }

  pub fn index_of(&self, fk: &ForeignKey) -> Option<usize> {
    self.by_fk.get(fk).copied()
  }

  /// Records that `index` names, or that name it.
  pub fn cross_links(&self, index: usize) -> &BTreeSet<usize> {
    &self.cross_links[index]
  }

  /// Records on the same parcel as `index`, itself included.
  pub fn same_parcel(&self, index: usize) -> &[usize] {
    self.records[index]
      .parcel
      .as_ref()
      .and_then(|p| self.by_parcel.get(p))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Records sharing at least one name or street token with `index`,
  /// ignoring tokens held by more than `limit` records.
  pub fn token_neighbours(&self, index: usize, limit: usize) -> BTreeSet<usize> {
    self.records[index]
      .block_tokens()
      .iter()
      .filter_map(|t| self.by_token.get(t))
      .filter(|posting| posting.len() <= limit)
      .flatten()
      .copied()
      .filter(|&i| i != index)
      .collect()
  }
}

/// Resolve every cross-reference field to record positions, symmetrically.
fn cross_links(
  views: &[&RecordView],
  records: &[Record],
  by_fk: &HashMap<ForeignKey, usize>,
) -> Vec<BTreeSet<usize>> {
  // Only fields some profile points at are indexed.
  let targets: BTreeSet<(SourceKind, &'static str)> = SourceKind::ALL
    .iter()
    .flat_map(|k| k.profile().cross_refs)
    .filter_map(|c| match c.target {
      RefTarget::FieldValue(kind, field) => Some((kind, field)),
      RefTarget::RecordId(_) => None,
    })
    .collect();

  let mut by_value: HashMap<(SourceKind, &'static str, String), Vec<usize>> =
    HashMap::new();
  for (i, (view, record)) in views.iter().zip(records).enumerate() {
    let Some(kind) = record.kind else { continue };
    for &(target_kind, field) in &targets {
      if target_kind != kind {
        continue;
      }
      for value in view.get(field).into_iter().flat_map(split_list) {
        by_value
          .entry((kind, field, value.to_string()))
          .or_default()
          .push(i);
      }
    }
  }

  let mut links = vec![BTreeSet::new(); records.len()];
  for (i, (view, record)) in views.iter().zip(records).enumerate() {
    let Some(kind) = record.kind else { continue };
    for cross in kind.profile().cross_refs {
      for value in view.get(cross.field).into_iter().flat_map(split_list) {
        let found: Vec<usize> = match cross.target {
          RefTarget::RecordId(target) => {
            let fk = ForeignKey::from_parts(target.name(), [value]);
            by_fk.get(&fk).copied().into_iter().collect()
          }
          RefTarget::FieldValue(target, field) => by_value
            .get(&(target, field, value.to_string()))
            .cloned()
            .unwrap_or_default(),
        };
        for j in found.into_iter().filter(|&j| j != i) {
          links[i].insert(j);
          links[j].insert(i);
        }
      }
    }
  }
  links
}
