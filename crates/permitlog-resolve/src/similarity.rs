//! Text similarity for project names and addresses.

use std::collections::BTreeSet;

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

/// Uppercase words of two or more letters or digits.
pub(crate) fn words(text: &str) -> BTreeSet<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| w.chars().count() >= 2)
    .map(str::to_uppercase)
    .collect()
}

/// Jaccard similarity of two word sets. Two empty sets score 0.
pub(crate) fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
  if a.is_empty() && b.is_empty() {
    return 0.0;
  }
  let intersection = a.intersection(b).count() as f64;
  let union = a.union(b).count() as f64;
  intersection / union
}

/// Scores pairs of names in `[0, 1]`: the mean of word-set Jaccard and the
/// fuzzy match of the shorter text inside the longer one, relative to a
/// perfect match.
pub struct NameScorer {
  matcher: SkimMatcherV2,
}

impl Default for NameScorer {
  fn default() -> Self {
    Self {
      matcher: SkimMatcherV2::default().ignore_case(),
    }
  }
}

impl NameScorer {
  pub fn score(&self, a: &str, b: &str) -> f64 {
    let wa = words(a);
    let wb = words(b);
    if wa.is_empty() || wb.is_empty() {
      return 0.0;
    }
    let a = wa.iter().cloned().collect::<Vec<_>>().join(" ");
    let b = wb.iter().cloned().collect::<Vec<_>>().join(" ");
    if a == b {
      return 1.0;
    }

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let fuzzy = match (
      self.matcher.fuzzy_match(long, short),
      self.matcher.fuzzy_match(short, short),
    ) {
      (Some(hit), Some(perfect)) if perfect > 0 => {
        (hit as f64 / perfect as f64).clamp(0.0, 1.0)
      }
      _ => 0.0,
    };
    (jaccard(&wa, &wb) + fuzzy) / 2.0
  }
}
