//! Street-address canonicalization.
//!
//! Department files spell the same address many ways (`1 Market St`,
//! `0001 MARKET STREET #200`, `1-3 Market St., San Francisco, CA 94105`).
//! [`Address::parse`] reduces them to one canonical token sequence:
//!
//! - uppercase, punctuation removed
//! - number ranges keep their first number, leading zeros dropped
//! - unit designators and their value removed
//! - trailing ZIP code, city and state removed
//! - street suffixes and directions spelled out, leading `ST` read as `SAINT`
//!
//! The canonical rendering parses back to itself.

use std::fmt;

/// Street suffix spellings and their canonical form.
const SUFFIXES: &[(&str, &str)] = &[
  ("ALY", "ALLEY"),
  ("AV", "AVENUE"),
  ("AVE", "AVENUE"),
  ("BLVD", "BOULEVARD"),
  ("CIR", "CIRCLE"),
  ("CT", "COURT"),
  ("DR", "DRIVE"),
  ("HWY", "HIGHWAY"),
  ("LN", "LANE"),
  ("PKWY", "PARKWAY"),
  ("PL", "PLACE"),
  ("PLZ", "PLAZA"),
  ("RD", "ROAD"),
  ("SQ", "SQUARE"),
  ("ST", "STREET"),
  ("STR", "STREET"),
  ("TER", "TERRACE"),
  ("WY", "WAY"),
];

const SUFFIX_NAMES: &[&str] = &[
  "ALLEY",
  "AVENUE",
  "BOULEVARD",
  "CIRCLE",
  "COURT",
  "DRIVE",
  "HIGHWAY",
  "LANE",
  "PARKWAY",
  "PLACE",
  "PLAZA",
  "ROAD",
  "SQUARE",
  "STREET",
  "TERRACE",
  "WAY",
];

const DIRECTIONS: &[(&str, &str)] = &[
  ("N", "NORTH"),
  ("S", "SOUTH"),
  ("E", "EAST"),
  ("W", "WEST"),
  ("NE", "NORTHEAST"),
  ("NW", "NORTHWEST"),
  ("SE", "SOUTHEAST"),
  ("SW", "SOUTHWEST"),
];

const UNIT_DESIGNATORS: &[&str] = &[
  "#",
  "APARTMENT",
  "APT",
  "FL",
  "FLOOR",
  "RM",
  "ROOM",
  "STE",
  "SUITE",
  "UNIT",
];

const STATES: &[&str] = &["CA", "CALIFORNIA"];

fn suffix(token: &str) -> Option<&'static str> {
  SUFFIXES
    .iter()
    .find(|(abbr, _)| *abbr == token)
    .map(|(_, full)| *full)
    .or_else(|| SUFFIX_NAMES.iter().find(|full| **full == token).copied())
}

fn direction(token: &str) -> Option<&'static str> {
  DIRECTIONS
    .iter()
    .find(|(abbr, full)| *abbr == token || *full == token)
    .map(|(_, full)| *full)
}

fn is_digits(token: &str, len: usize) -> bool {
  token.len() == len && token.bytes().all(|b| b.is_ascii_digit())
}

fn starts_with_digit(token: &str) -> bool {
  token.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Uppercase and split on anything but letters, digits and dashes. `#` is
/// kept as a token of its own.
fn tokenize(raw: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();
  for ch in raw.chars().flat_map(char::to_uppercase) {
    if ch.is_alphanumeric() || ch == '-' {
      current.push(ch);
      continue;
    }
    if !current.is_empty() {
      tokens.push(std::mem::take(&mut current));
    }
    if ch == '#' {
      tokens.push("#".to_string());
    }
  }
  if !current.is_empty() {
    tokens.push(current);
  }
  tokens
}

/// Resolve dashes: `100-110` in number position keeps `100`, `94105-1234`
/// keeps `94105`, anything else splits.
fn split_dashes(tokens: Vec<String>) -> Vec<String> {
  let mut out = Vec::with_capacity(tokens.len());
  for (i, token) in tokens.into_iter().enumerate() {
    if !token.contains('-') {
      out.push(token);
      continue;
    }
    let parts: Vec<&str> = token.split('-').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
      [] => {}
      [first, ..] if i == 0 && starts_with_digit(first) => {
        out.push(first.to_string());
      }
      [zip, plus4] if is_digits(zip, 5) && is_digits(plus4, 4) => {
        out.push(zip.to_string());
      }
      _ => out.extend(parts.iter().map(|p| p.to_string())),
    }
  }
  out
}

/// A canonicalized street address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
  tokens:     Vec<String>,
  has_number: bool,
}

impl Address {
  pub fn parse(raw: &str) -> Self {
    let mut tokens = split_dashes(tokenize(raw));
    let leading_marks = tokens.iter().take_while(|t| *t == "#").count();
    tokens.drain(..leading_marks);

    let has_number = tokens.first().is_some_and(|t| starts_with_digit(t));
    if has_number {
      let trimmed = tokens[0].trim_start_matches('0');
      let number = if starts_with_digit(trimmed) {
        trimmed.to_string()
      } else {
        format!("0{trimmed}")
      };
      tokens[0] = number;
    }
    let name_start = usize::from(has_number);

    let mut tokens = drop_units(tokens, name_start);
    strip_trailing(&mut tokens, name_start);
    expand(&mut tokens, name_start);

    Self { tokens, has_number }
  }

  pub fn tokens(&self) -> &[String] { &self.tokens }

  pub fn is_empty(&self) -> bool { self.tokens.is_empty() }

  /// The leading house number, if the address has one.
  pub fn number(&self) -> Option<&str> {
    self
      .has_number
      .then(|| self.tokens.first().map(String::as_str))
      .flatten()
  }

  /// Street name tokens, without suffixes and directions.
  pub fn street_name(&self) -> impl Iterator<Item = &str> {
    self.tokens[usize::from(self.has_number)..]
      .iter()
      .map(String::as_str)
      .filter(|t| suffix(t).is_none() && direction(t).is_none())
  }

  /// `number + street name`, the key for relaxed matching. `None` without a
  /// house number or a street name.
  pub fn relaxed_key(&self) -> Option<String> {
    let number = self.number()?;
    let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
    let name: Vec<&str> = self.street_name().collect();
    if name.is_empty() {
      return None;
    }
    Some(format!("{digits} {}", name.join(" ")))
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.tokens.join(" "))
  }
}

/// Canonical text of `raw`.
pub fn canonicalize(raw: &str) -> String { Address::parse(raw).to_string() }

/// Remove unit designators and their value. A designator directly after the
/// house number is a street name, not a unit.
fn drop_units(tokens: Vec<String>, name_start: usize) -> Vec<String> {
  let mut out = Vec::with_capacity(tokens.len());
  let mut iter = tokens.into_iter().enumerate().peekable();
  while let Some((i, token)) = iter.next() {
    if token == "#" && i <= name_start {
      continue;
    }
    if i <= name_start || !UNIT_DESIGNATORS.contains(&token.as_str()) {
      out.push(token);
      continue;
    }
    while iter.next_if(|(_, t)| t == "#").is_some() {}
    iter.next();
  }
  out
}

/// Remove trailing ZIP, city and state, always leaving one name token.
fn strip_trailing(tokens: &mut Vec<String>, name_start: usize) {
  loop {
    let len = tokens.len();
    let strip = match tokens.as_slice() {
      [.., last] if len > name_start + 1 && is_digits(last, 5) => 1,
      [.., last] if len > name_start + 1 && STATES.contains(&last.as_str()) => 1,
      [.., last] if len > name_start + 1 && last == "SF" => 1,
      [.., city, last]
        if len > name_start + 2 && city == "SAN" && last == "FRANCISCO" =>
      {
        2
      }
      _ => break,
    };
    tokens.truncate(len - strip);
  }
}

fn expand(tokens: &mut [String], name_start: usize) {
  let len = tokens.len();
  if len <= name_start {
    return;
  }
  let last_is_direction = direction(&tokens[len - 1]).is_some();
  let suffix_at = if last_is_direction && len >= name_start + 2 {
    len - 2
  } else {
    len - 1
  };

  for (i, token) in tokens.iter_mut().enumerate().skip(name_start) {
    let replacement = if i == suffix_at {
      suffix(token).or_else(|| direction(token))
    } else if i == name_start && token.as_str() == "ST" {
      Some("SAINT")
    } else {
      direction(token)
    };
    if let Some(full) = replacement {
      *token = full.to_string();
    }
  }
}
