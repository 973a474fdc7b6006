//! Disjoint-set forest over record positions.

use std::collections::BTreeMap;

pub struct UnionFind {
  parent: Vec<usize>,
  rank:   Vec<u8>,
}

impl UnionFind {
  pub fn new(len: usize) -> Self {
    Self {
      parent: (0..len).collect(),
      rank:   vec![0; len],
    }
  }

  pub fn find(&mut self, x: usize) -> usize {
    if self.parent[x] != x {
      let root = self.find(self.parent[x]);
      self.parent[x] = root;
    }
    self.parent[x]
  }

  pub fn union(&mut self, a: usize, b: usize) {
    let mut ra = self.find(a);
    let mut rb = self.find(b);
    if ra == rb {
      return;
    }
    if self.rank[ra] < self.rank[rb] {
      std::mem::swap(&mut ra, &mut rb);
    }
    self.parent[rb] = ra;
    if self.rank[ra] == self.rank[rb] {
      self.rank[ra] += 1;
    }
  }

  /// Components of `members`, each in ascending order, ordered by their
  /// smallest member.
  pub fn components(&mut self, members: impl IntoIterator<Item = usize>) -> Vec<Vec<usize>> {
    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for member in members {
      let root = self.find(member);
      by_root.entry(root).or_default().push(member);
    }
    let mut components: Vec<Vec<usize>> = by_root
      .into_values()
      .map(|mut c| {
        c.sort_unstable();
        c
      })
      .collect();
    components.sort_unstable_by_key(|c| c[0]);
    components
  }
}
