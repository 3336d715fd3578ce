//! Hexagonal binning on two interleaved rectangular lattices.
//!
//! With `gridsize` hexagons along x there are `gridsize / sqrt(3)` along y.
//! Lattice 1 has its centers on the grid points, lattice 2 is shifted by half
//! a cell in both directions, and every point goes to the nearer center.

use shared::Result;
use shared::anyhow::ensure;


#[derive(Clone, Debug, PartialEq)]
pub struct HexCell {
    pub center: (f64, f64),
    pub count: usize,
}


#[derive(Clone, Debug)]
pub struct HexBins {
    cells: Vec<HexCell>,
    /// Cell size along x and y.
    size: (f64, f64),
    xrange: (f64, f64),
    yrange: (f64, f64),
}


/// Widen degenerate ranges, then pad by a tiny fraction so extreme points stay inside.
fn data_range(values: &[f64]) -> (f64, f64) {
    let (mut lo, mut hi) = values.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if hi - lo <= 1E-12 * hi.abs().max(lo.abs()).max(1.0) {
        let delta = if lo == 0.0 { 0.1 } else { 0.1 * lo.abs() };
        lo -= delta;
        hi += delta;
    }
    let padding = 1E-9 * (hi - lo);
    (lo - padding, hi + padding)
}


impl HexBins {
    /// Bin the points, keeping only cells holding at least `mincnt` points.
    pub fn compute(x: &[f64], y: &[f64], gridsize: usize, mincnt: usize) -> Result<Self> {
        ensure!(x.len() == y.len(), "x and y hold different numbers of points: {} != {}", x.len(), y.len());
        ensure!(!x.is_empty(), "cannot bin an empty set of points");
        ensure!(gridsize >= 1, "gridsize must be positive");

        let nx = gridsize;
        let ny = ((gridsize as f64 / 3f64.sqrt()) as usize).max(1);

        let (xmin, xmax) = data_range(x);
        let (ymin, ymax) = data_range(y);
        let sx = (xmax - xmin) / nx as f64;
        let sy = (ymax - ymin) / ny as f64;

        let (nx1, ny1) = (nx + 1, ny + 1);
        let (nx2, ny2) = (nx, ny);
        let mut lattice1 = vec![0usize; nx1 * ny1];
        let mut lattice2 = vec![0usize; nx2 * ny2];

        for (&px, &py) in x.iter().zip(y.iter()) {
            let u = (px - xmin) / sx;
            let v = (py - ymin) / sy;

            let (ix1, iy1) = (u.round(), v.round());
            let (ix2, iy2) = (u.floor(), v.floor());

            let d1 = (u - ix1).powi(2) + 3.0 * (v - iy1).powi(2);
            let d2 = (u - ix2 - 0.5).powi(2) + 3.0 * (v - iy2 - 0.5).powi(2);

            if d1 < d2 {
                let (ix, iy) = (ix1 as usize, iy1 as usize);
                if ix1 >= 0.0 && iy1 >= 0.0 && ix < nx1 && iy < ny1 {
                    lattice1[ix * ny1 + iy] += 1;
                }
            } else {
                let (ix, iy) = (ix2 as usize, iy2 as usize);
                if ix2 >= 0.0 && iy2 >= 0.0 && ix < nx2 && iy < ny2 {
                    lattice2[ix * ny2 + iy] += 1;
                }
            }
        }

        let mut cells = vec![];
        for (k, &count) in lattice1.iter().enumerate() {
            if count >= mincnt.max(1) {
                let (ix, iy) = (k / ny1, k % ny1);
                cells.push(HexCell {
                    center: (xmin + ix as f64 * sx, ymin + iy as f64 * sy),
                    count,
                });
            }
        }
        for (k, &count) in lattice2.iter().enumerate() {
            if count >= mincnt.max(1) {
                let (ix, iy) = (k / ny2, k % ny2);
                cells.push(HexCell {
                    center: (xmin + (ix as f64 + 0.5) * sx, ymin + (iy as f64 + 0.5) * sy),
                    count,
                });
            }
        }

        Ok(Self {
            cells,
            size: (sx, sy),
            xrange: (xmin, xmax),
            yrange: (ymin, ymax),
        })
    }


    pub fn cells(&self) -> &[HexCell] { &self.cells }
    pub fn xrange(&self) -> (f64, f64) { self.xrange }
    pub fn yrange(&self) -> (f64, f64) { self.yrange }

    pub fn max_count(&self) -> usize {
        self.cells.iter().map(|c| c.count).max().unwrap_or(0)
    }

    pub fn min_count(&self) -> usize {
        self.cells.iter().map(|c| c.count).min().unwrap_or(0)
    }


    /// Corners of the hexagon around `cell`, pointy side up.
    pub fn hexagon(&self, cell: &HexCell) -> Vec<(f64, f64)> {
        const OFFSETS: [(f64, f64); 6] = [
            ( 0.5, -0.5),
            ( 0.5,  0.5),
            ( 0.0,  1.0),
            (-0.5,  0.5),
            (-0.5, -0.5),
            ( 0.0, -1.0),
        ];
        let (sx, sy) = self.size;
        OFFSETS.iter()
            .map(|(dx, dy)| (cell.center.0 + dx * sx, cell.center.1 + dy * sy / 3.0))
            .collect()
    }
}
