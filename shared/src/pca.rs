//! Principal component analysis on a dense `(nsamples, nfeatures)` matrix.
//!
//! The eigen-decomposition is done on whichever of the covariance matrix
//! `Xcᵀ·Xc / (N-1)` or the Gram matrix `Xc·Xcᵀ / (N-1)` is smaller, so a
//! short trajectory with many pairwise distances stays cheap.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{
    Array1,
    Array2,
    ArrayView2,
    Axis,
    s,
};

use crate::{
    AnalysisError,
    Result,
    bail,
    log,
};


#[derive(Clone, Debug)]
pub struct Pca {
    /// Column means of the training data, length `nfeatures`.
    mean: Array1<f64>,

    /// Principal axes, shape `(n_components, nfeatures)`, rows are orthonormal.
    components: Array2<f64>,

    /// Variance of the training data along each principal axis.
    explained_variance: Array1<f64>,

    total_variance: f64,
}


impl Pca {
    /// Fit `n_components` principal axes to `x`.
    ///
    /// Requires at least two samples, two features and `1 <= n_components <= min(N, M)`.
    pub fn fit(x: ArrayView2<f64>, n_components: usize) -> Result<Self> {
        let (nsamples, nfeatures) = x.dim();

        if nsamples < 2 || nfeatures < 2 {
            return Err(AnalysisError::insufficient(format!(
                "PCA needs at least 2 samples and 2 features, got {} x {}", nsamples, nfeatures
            )).into());
        }

        if n_components == 0 || n_components > nsamples.min(nfeatures) {
            return Err(AnalysisError::insufficient(format!(
                "cannot extract {} components from a {} x {} matrix", n_components, nsamples, nfeatures
            )).into());
        }

        let mean = x.mean_axis(Axis(0))
            .ok_or_else(|| AnalysisError::insufficient("empty matrix"))?;
        let xc = &x - &mean;
        let ddof = (nsamples - 1) as f64;
        let total_variance = xc.iter().map(|v| v * v).sum::<f64>() / ddof;

        let (explained_variance, mut components) = if nfeatures <= nsamples {
            components_from_covariance(xc.view(), n_components, ddof)
        } else {
            components_from_gram(xc.view(), n_components, ddof)
        };

        // Orientation is arbitrary, pin it so that the largest entry of each axis is positive.
        for mut axis in components.rows_mut() {
            let imax = axis.iter()
                .enumerate()
                .fold(0, |im, (i, v)| if v.abs() > axis[im].abs() { i } else { im });
            if axis[imax] < 0.0 {
                axis.mapv_inplace(|v| -v);
            }
        }

        log::debug!("PCA fitted on {} x {} matrix, explained variance: {}",
            nsamples, nfeatures, explained_variance);

        Ok(Self {
            mean,
            components,
            explained_variance,
            total_variance,
        })
    }


    /// Fit on `x` and return its projection, shape `(nsamples, n_components)`.
    pub fn fit_transform(x: ArrayView2<f64>, n_components: usize) -> Result<(Self, Array2<f64>)> {
        let pca = Self::fit(x, n_components)?;
        let projected = pca.transform(x)?;
        Ok((pca, projected))
    }


    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            bail!("PCA was fitted with {} features, but input has {} columns.", self.mean.len(), x.ncols());
        }
        Ok((&x - &self.mean).dot(&self.components.t()))
    }


    /// Map projected points back into feature space.
    pub fn inverse_transform(&self, z: ArrayView2<f64>) -> Result<Array2<f64>> {
        if z.ncols() != self.n_components() {
            bail!("PCA has {} components, but input has {} columns.", self.n_components(), z.ncols());
        }
        Ok(z.dot(&self.components) + &self.mean)
    }


    pub fn n_components(&self) -> usize { self.components.nrows() }
    pub fn mean(&self) -> &Array1<f64> { &self.mean }
    pub fn components(&self) -> &Array2<f64> { &self.components }
    pub fn explained_variance(&self) -> &Array1<f64> { &self.explained_variance }

    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance > 0.0 {
            &self.explained_variance / self.total_variance
        } else {
            Array1::zeros(self.explained_variance.len())
        }
    }
}


/// Eigen-decomposition of a symmetric matrix, eigenpairs sorted by descending eigenvalue.
/// Eigenvectors are the columns of the returned matrix.
fn sorted_eigh(mat: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = mat.nrows();
    let eig = SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| mat[[i, j]]));

    let mut order = (0 .. n).collect::<Vec<_>>();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let vals = order.iter().map(|&i| eig.eigenvalues[i]).collect::<Array1<f64>>();
    let vecs = Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, order[j])]);
    (vals, vecs)
}


fn components_from_covariance(xc: ArrayView2<f64>, k: usize, ddof: f64) -> (Array1<f64>, Array2<f64>) {
    let cov = xc.t().dot(&xc) / ddof;
    let (vals, vecs) = sorted_eigh(&cov);
    let components = vecs.slice(s![.., ..k]).t().to_owned();
    (vals.slice(s![..k]).mapv(|v| v.max(0.0)), components)
}


fn components_from_gram(xc: ArrayView2<f64>, k: usize, ddof: f64) -> (Array1<f64>, Array2<f64>) {
    let gram = xc.dot(&xc.t()) / ddof;
    let (vals, vecs) = sorted_eigh(&gram);

    let nfeatures = xc.ncols();
    let mut components = Array2::<f64>::zeros((k, nfeatures));

    // Xc = U S Vᵀ  =>  v_i = Xcᵀ u_i / s_i with s_i² = λ_i (N-1)
    for i in 0 .. k {
        let singular = (vals[i].max(0.0) * ddof).sqrt();
        if singular <= f64::EPSILON * ddof {
            log::debug!("Principal axis {} carries no variance, left as zeros.", i + 1);
            continue;
        }
        let axis = xc.t().dot(&vecs.column(i)) / singular;
        components.row_mut(i).assign(&axis);
    }

    (vals.slice(s![..k]).mapv(|v| v.max(0.0)), components)
}
