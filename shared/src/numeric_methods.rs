use std::iter;
use ndarray::{
    Array2,
    ArrayView2,
    Axis,
};


/// `n` evenly spaced samples over the closed interval `[start, end]`.
///
/// Similar to `numpy.linspace` or `numpy.mgrid[start:end:nj]`.
pub fn linspace<R>(start: f64, end: f64, n: usize) -> R
where R: FromIterator<f64>
{
    match n {
        0 => iter::empty().collect(),
        1 => iter::once(start).collect(),
        _ => {
            let dx = (end - start) / (n - 1) as f64;
            (0 .. n).map(|i| start + dx * i as f64).collect()
        }
    }
}


/// Unbiased covariance of `data`, each row being one variable and each column
/// one observation.
///
/// Similar to `numpy.cov(data)`. Requires at least two observations.
pub fn covariance(data: ArrayView2<f64>) -> Array2<f64> {
    let nobs = data.ncols();
    assert!(nobs >= 2);

    let means = data.mean_axis(Axis(1)).expect("non-empty observations");
    let centered = &data - &means.insert_axis(Axis(1));
    centered.dot(&centered.t()) / (nobs - 1) as f64
}
