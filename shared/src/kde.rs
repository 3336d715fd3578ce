//! Gaussian kernel density estimation with Scott's rule bandwidth.
//!
//! Follows the conventions of `scipy.stats.gaussian_kde`: the dataset is an
//! array of shape `(ndim, npoints)` and the kernel covariance is the
//! unbiased sample covariance scaled by `factor²`, `factor = n^(-1/(d+4))`.

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix};
use ndarray::{
    Array1,
    Array2,
    ArrayView2,
};
use rayon::prelude::*;

use crate::{
    AnalysisError,
    Result,
    bail,
    numeric_methods::covariance,
};


#[derive(Clone, Debug)]
pub struct GaussianKde {
    dataset: Array2<f64>,
    factor: f64,
    covariance: Array2<f64>,
    inv_cov: Array2<f64>,
    norm: f64,
}


impl GaussianKde {
    pub fn new(dataset: ArrayView2<f64>) -> Result<Self> {
        let (ndim, npoints) = dataset.dim();
        if ndim == 0 || npoints <= ndim {
            return Err(AnalysisError::insufficient(format!(
                "KDE of {} dimension(s) needs more than {} points, got {}", ndim, ndim, npoints
            )).into());
        }

        let factor = (npoints as f64).powf(-1.0 / (ndim as f64 + 4.0));
        let cov = covariance(dataset) * factor.powi(2);

        let scale = (0 .. ndim).map(|i| cov[[i, i]]).product::<f64>();
        let chol = Cholesky::new(DMatrix::from_fn(ndim, ndim, |i, j| cov[[i, j]]))
            .ok_or_else(|| AnalysisError::insufficient("data covariance matrix is singular"))?;
        let det = chol.l().diagonal().iter().map(|l| l * l).product::<f64>();
        if !(det > 1E-12 * scale) {
            return Err(AnalysisError::insufficient("data covariance matrix is singular").into());
        }

        let inv = chol.inverse();
        let inv_cov = Array2::from_shape_fn((ndim, ndim), |(i, j)| inv[(i, j)]);
        let norm = 1.0 / (npoints as f64 * ((2.0 * PI).powi(ndim as i32) * det).sqrt());

        Ok(Self {
            dataset: dataset.to_owned(),
            factor,
            covariance: cov,
            inv_cov,
            norm,
        })
    }


    pub fn ndim(&self) -> usize { self.dataset.nrows() }
    pub fn npoints(&self) -> usize { self.dataset.ncols() }
    pub fn factor(&self) -> f64 { self.factor }
    pub fn covariance(&self) -> &Array2<f64> { &self.covariance }


    /// Evaluate the density at `points`, shape `(ndim, m)`.
    pub fn evaluate(&self, points: ArrayView2<f64>) -> Result<Array1<f64>> {
        if points.nrows() != self.ndim() {
            bail!("Points have dimension {}, but the KDE was built in {} dimension(s).",
                points.nrows(), self.ndim());
        }

        let ndim = self.ndim();
        let density = (0 .. points.ncols()).into_par_iter()
            .map(|ipoint| {
                let p = points.column(ipoint);
                let mut diff = vec![0.0; ndim];
                let mut sum = 0.0;
                for data in self.dataset.columns() {
                    diff.iter_mut().zip(p.iter().zip(data.iter()))
                        .for_each(|(d, (x, y))| *d = x - y);
                    let mut energy = 0.0;
                    for i in 0 .. ndim {
                        for j in 0 .. ndim {
                            energy += diff[i] * self.inv_cov[[i, j]] * diff[j];
                        }
                    }
                    sum += (-0.5 * energy).exp();
                }
                sum * self.norm
            })
            .collect::<Vec<f64>>();

        Ok(Array1::from(density))
    }
}
