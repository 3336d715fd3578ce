use itertools::Itertools;

use shared::Result;

use super::{AtomSelection, Featurizer};
use crate::core::{Fragment, TrajFragment};


/// All unordered atom pairs `(a, b)` with `a < b`, ordered by `a` then `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomPairs {
    pairs: Vec<(usize, usize)>,
}


impl AtomPairs {
    pub fn from_selection(selection: &AtomSelection) -> Self {
        let pairs = selection.indices()
            .iter()
            .copied()
            .tuple_combinations()
            .collect();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(usize, usize)] { &self.pairs }
    pub fn len(&self) -> usize { self.pairs.len() }
    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }
}


#[inline]
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}


/// Euclidean distance of every pair of selected atoms, in Angstrom.
pub struct PairwiseDistances {
    selection: AtomSelection,
    pairs: AtomPairs,
}


impl PairwiseDistances {
    pub fn new(selection: AtomSelection) -> Self {
        let pairs = AtomPairs::from_selection(&selection);
        Self { selection, pairs }
    }
}


impl Featurizer for PairwiseDistances {
    fn description(&self) -> &str { "pairwise distances" }
    fn n_features(&self) -> usize { self.pairs.len() }

    fn check_fragment(&self, fragment: &TrajFragment) -> Result<()> {
        self.selection.check_bounds(fragment.n_atoms(), fragment.get_source())
    }

    fn featurize_frame(&self, xyz: &[[f64; 3]]) -> Vec<f64> {
        self.pairs.pairs()
            .iter()
            .map(|&(a, b)| distance(&xyz[a], &xyz[b]))
            .collect()
    }
}
