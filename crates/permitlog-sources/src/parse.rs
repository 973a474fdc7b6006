//! Row-level parsing for the two adapter layouts.

use std::{collections::HashMap, io::Read};

use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder};
use permitlog_core::fact::{DATE_FORMAT, ForeignKey, NewFact};

use crate::{
  ParsedSource,
  error::{Result, RowError, SourceLoadError},
  kind::{DirectLayout, KeyPart, SourceKind},
};

/// Raw columns of the permit addenda extract.
const ADDENDA_PERMIT_COLUMN: &str = "APPLICATION_NUMBER";
const ADDENDA_ARRIVE_COLUMN: &str = "ARRIVE";
const ADDENDA_ARRIVE_FORMAT: &str = "%Y/%m/%d";

fn csv_error(kind: SourceKind, err: csv::Error) -> SourceLoadError {
  SourceLoadError::Csv {
    source_name: kind.name(),
    message:     err.to_string(),
  }
}

/// Header positions of the columns a layout reads.
struct HeaderIndex {
  positions: HashMap<String, usize>,
}

impl HeaderIndex {
  fn read<R: Read>(kind: SourceKind, reader: &mut csv::Reader<R>) -> Result<Self> {
    let headers = reader.byte_headers().map_err(|e| csv_error(kind, e))?;
    let mut positions = HashMap::with_capacity(headers.len());
    for (i, raw) in headers.iter().enumerate() {
      let name = String::from_utf8_lossy(raw).trim().to_string();
      // First occurrence wins on duplicated headers.
      positions.entry(name).or_insert(i);
    }
    Ok(Self { positions })
  }

  fn position(&self, column: &str) -> Option<usize> {
    self.positions.get(column).copied()
  }

  fn required_position(&self, kind: SourceKind, column: &str) -> Result<usize> {
    self.position(column).ok_or_else(|| SourceLoadError::HeaderMismatch {
      source_name: kind.name(),
      missing:     vec![column.to_string()],
    })
  }

  fn require(&self, kind: SourceKind, columns: &[&str]) -> Result<()> {
    let missing: Vec<String> = columns
      .iter()
      .filter(|c| self.position(c).is_none())
      .map(|c| c.to_string())
      .collect();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(SourceLoadError::HeaderMismatch {
        source_name: kind.name(),
        missing,
      })
    }
  }
}

fn cell(record: &ByteRecord, position: usize) -> String {
  record
    .get(position)
    .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
    .unwrap_or_default()
}

/// Parse a date that may carry a trailing time component.
fn parse_leading_date(value: &str, format: &str) -> Option<NaiveDate> {
  let head = value.split_whitespace().next()?;
  NaiveDate::parse_from_str(head, format).ok()
}

fn warn_row(kind: SourceKind, err: &RowError) {
  tracing::warn!(source = kind.name(), row = err.row(), "skipping row: {err}");
}

fn open_reader<R: Read>(reader: R) -> csv::Reader<R> {
  ReaderBuilder::new().flexible(true).from_reader(reader)
}

// ─── Direct layout ───────────────────────────────────────────────────────────

pub(crate) fn parse_direct<R: Read>(
  kind: SourceKind,
  layout: &DirectLayout,
  reader: R,
) -> Result<ParsedSource> {
  let mut reader = open_reader(reader);
  let headers = HeaderIndex::read(kind, &mut reader)?;

  let key_columns: Vec<&str> = layout
    .key
    .iter()
    .filter_map(|part| layout.raw_column(part.field()))
    .collect();
  headers.require(kind, &key_columns)?;

  // Canonical name and header position of every mapped column present.
  let mapped: Vec<(&'static str, usize)> = layout
    .columns
    .iter()
    .filter_map(|(raw, canonical)| {
      headers.position(raw).map(|pos| (*canonical, pos))
    })
    .collect();

  let mut parsed = ParsedSource::new(kind);
  let mut rows = 0usize;
  let mut record = ByteRecord::new();
  loop {
    match reader.read_byte_record(&mut record) {
      Ok(true) => {}
      Ok(false) => break,
      Err(err) if err.is_io_error() => return Err(csv_error(kind, err)),
      Err(err) => {
        rows += 1;
        let row_err = RowError::Malformed {
          row:     rows,
          message: err.to_string(),
        };
        warn_row(kind, &row_err);
        parsed.warnings.push(row_err);
        continue;
      }
    }
    rows += 1;

    let fields: Vec<(&'static str, String)> = mapped
      .iter()
      .map(|(name, pos)| (*name, cell(&record, *pos)))
      .filter(|(_, value)| !value.is_empty())
      .collect();

    match record_key(kind, layout, rows, &fields) {
      Ok(fk) => {
        let computed = computed_fields(layout, &fields);
        for (name, value) in fields.into_iter().chain(computed) {
          parsed
            .facts
            .push(NewFact::new(fk.clone(), kind.name(), name, value));
        }
        parsed.records += 1;
      }
      Err(row_err) => {
        warn_row(kind, &row_err);
        parsed.warnings.push(row_err);
      }
    }
  }

  if rows == 0 {
    return Err(SourceLoadError::Empty {
      source_name: kind.name(),
    });
  }
  Ok(parsed)
}

fn field_value<'a>(fields: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
  fields
    .iter()
    .find(|(n, _)| *n == name)
    .map(|(_, v)| v.as_str())
}

fn record_key(
  kind: SourceKind,
  layout: &DirectLayout,
  row: usize,
  fields: &[(&'static str, String)],
) -> Result<ForeignKey, RowError> {
  let mut parts = Vec::with_capacity(layout.key.len());
  for part in layout.key {
    let column = || {
      layout
        .raw_column(part.field())
        .unwrap_or(part.field())
        .to_string()
    };
    let value = field_value(fields, part.field()).ok_or_else(|| {
      RowError::MissingKey {
        row,
        column: column(),
      }
    })?;
    match part {
      KeyPart::Field(_) => parts.push(value.to_string()),
      KeyPart::Date { format, .. } => {
        let date = parse_leading_date(value, format).ok_or_else(|| {
          RowError::InvalidDate {
            row,
            column: column(),
            value: value.to_string(),
          }
        })?;
        parts.push(date.format(DATE_FORMAT).to_string());
      }
    }
  }
  Ok(ForeignKey::from_parts(kind.name(), parts))
}

fn computed_fields(
  layout: &DirectLayout,
  fields: &[(&'static str, String)],
) -> Vec<(&'static str, String)> {
  layout
    .computed
    .iter()
    .filter_map(|computed| {
      let groups: Vec<String> = computed
        .groups
        .iter()
        .map(|group| {
          group
            .iter()
            .filter_map(|name| field_value(fields, name))
            .collect::<String>()
        })
        .filter(|g| !g.is_empty())
        .collect();
      let value = groups.join(" ");
      (!value.is_empty()).then_some((computed.name, value))
    })
    .collect()
}

// ─── Addenda summary ─────────────────────────────────────────────────────────

pub(crate) fn parse_addenda_summary<R: Read>(
  kind: SourceKind,
  reader: R,
) -> Result<ParsedSource> {
  let mut reader = open_reader(reader);
  let headers = HeaderIndex::read(kind, &mut reader)?;
  headers.require(kind, &[ADDENDA_PERMIT_COLUMN, ADDENDA_ARRIVE_COLUMN])?;
  let permit_pos = headers.required_position(kind, ADDENDA_PERMIT_COLUMN)?;
  let arrive_pos = headers.required_position(kind, ADDENDA_ARRIVE_COLUMN)?;

  let mut parsed = ParsedSource::new(kind);
  // Permit numbers in first-seen order, with their earliest arrival.
  let mut permits: Vec<(String, Option<NaiveDate>)> = Vec::new();
  let mut positions: HashMap<String, usize> = HashMap::new();
  let mut rows = 0usize;
  let mut record = ByteRecord::new();
  loop {
    match reader.read_byte_record(&mut record) {
      Ok(true) => {}
      Ok(false) => break,
      Err(err) if err.is_io_error() => return Err(csv_error(kind, err)),
      Err(err) => {
        rows += 1;
        let row_err = RowError::Malformed {
          row:     rows,
          message: err.to_string(),
        };
        warn_row(kind, &row_err);
        parsed.warnings.push(row_err);
        continue;
      }
    }
    rows += 1;

    let permit = cell(&record, permit_pos);
    if permit.is_empty() {
      let row_err = RowError::MissingKey {
        row:    rows,
        column: ADDENDA_PERMIT_COLUMN.to_string(),
      };
      warn_row(kind, &row_err);
      parsed.warnings.push(row_err);
      continue;
    }
    let arrive = parse_leading_date(&cell(&record, arrive_pos), ADDENDA_ARRIVE_FORMAT);

    match positions.get(&permit) {
      Some(&i) => {
        let earliest = &mut permits[i].1;
        *earliest = match (*earliest, arrive) {
          (Some(a), Some(b)) => Some(a.min(b)),
          (a, b) => a.or(b),
        };
      }
      None => {
        positions.insert(permit.clone(), permits.len());
        permits.push((permit, arrive));
      }
    }
  }

  if rows == 0 {
    return Err(SourceLoadError::Empty {
      source_name: kind.name(),
    });
  }

  for (permit, earliest) in permits {
    let fk = ForeignKey::from_parts(kind.name(), [permit.as_str()]);
    parsed.facts.push(NewFact::new(
      fk.clone(),
      kind.name(),
      "permit_number",
      permit.as_str(),
    ));
    if let Some(date) = earliest {
      parsed.facts.push(NewFact::new(
        fk,
        kind.name(),
        "earliest_addenda_arrival",
        date.format(DATE_FORMAT).to_string(),
      ));
    }
    parsed.records += 1;
  }
  Ok(parsed)
}
