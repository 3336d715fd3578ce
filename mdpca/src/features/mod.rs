//! Per-frame feature vectors computed from trajectory fragments.

use rayon::prelude::*;

use shared::{
    Array2,
    Result,
    log,
};

use crate::core::{Fragment, TrajFragment};

pub mod selection;
pub use selection::{AtomSelection, select_backbone_ca};

pub mod distances;
pub use distances::{AtomPairs, PairwiseDistances};

pub mod cartesian;
pub use cartesian::{CartesianFeatures, superpose};


pub trait Featurizer: Sync {
    /// Human readable name of the features, used in the log.
    fn description(&self) -> &str;

    fn n_features(&self) -> usize;

    /// Fails if the fragment cannot be featurized, e.g. the selection does not fit its atoms.
    fn check_fragment(&self, fragment: &TrajFragment) -> Result<()>;

    /// Called with the first fragment before any frame is featurized.
    fn prepare(&mut self, _fragment: &TrajFragment) -> Result<()> { Ok(()) }

    fn featurize_frame(&self, xyz: &[[f64; 3]]) -> Vec<f64>;
}


/// Feature matrix with one row per frame, in load order, and the time of each row.
#[derive(Clone, Debug, PartialEq)]
pub struct Features {
    pub matrix: Array2<f64>,
    pub times: Vec<f64>,
}


impl Features {
    pub fn n_samples(&self) -> usize { self.matrix.nrows() }
    pub fn n_features(&self) -> usize { self.matrix.ncols() }
}


/// Featurize every frame of every fragment and stack the rows.
///
/// Frames of one fragment are featurized in parallel on the current rayon
/// pool; the row order never depends on the number of threads.
pub fn extract_features<F, I>(featurizer: &mut F, fragments: I) -> Result<Features>
where F: Featurizer,
      I: IntoIterator<Item = Result<TrajFragment>> {
    let nfeatures = featurizer.n_features();
    let mut values: Vec<f64> = vec![];
    let mut times: Vec<f64> = vec![];
    let mut prepared = false;

    for fragment in fragments {
        let fragment = fragment?;
        featurizer.check_fragment(&fragment)?;
        if !prepared {
            featurizer.prepare(&fragment)?;
            prepared = true;
        }

        let f: &F = featurizer;
        let rows = (0 .. fragment.n_frames())
            .into_par_iter()
            .map(|i| f.featurize_frame(fragment.xyz(i)))
            .collect::<Vec<_>>();

        values.reserve(rows.len() * nfeatures);
        for row in rows {
            values.extend(row);
        }
        times.extend_from_slice(fragment.get_times());
    }

    let matrix = Array2::from_shape_vec((times.len(), nfeatures), values)?;

    log::info!("Number of data points: {}", matrix.nrows());
    log::info!("Number of features ({}): {}", featurizer.description(), matrix.ncols());

    Ok(Features { matrix, times })
}
