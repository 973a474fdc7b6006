use serde::{Deserialize, Serialize};

/// What to do with unseen records whose confirmed matches reach more than one
/// existing project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousPolicy {
  /// Give the component its own fresh project id.
  #[default]
  Mint,
  /// Leave the component unassigned until an operator promotes it.
  Defer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
  /// Minimum score for a name-similarity likely match, in `[0, 1]`.
  pub name_similarity_threshold: f64,
  /// Minimum significant characters of a reference number contained in
  /// another for parcel corroboration.
  pub corroboration_min_len:     usize,
  /// Name tokens shared by more records than this are not used to find
  /// similarity candidates.
  pub name_block_limit:          usize,
  pub ambiguous_policy:          AmbiguousPolicy,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      name_similarity_threshold: 0.85,
      corroboration_min_len:     6,
      name_block_limit:          64,
      ambiguous_policy:          AmbiguousPolicy::Mint,
    }
  }
}
