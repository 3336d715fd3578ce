use shared::{
    Result,
    nalgebra::{Matrix3, Vector3},
};

use super::{AtomSelection, Featurizer};
use crate::core::{Fragment, TrajFragment};


fn centroid(coords: &[[f64; 3]]) -> Vector3<f64> {
    let sum = coords.iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p));
    sum / coords.len().max(1) as f64
}


/// Rigid-body superposition of `mobile` onto `reference` (Kabsch).
///
/// Both sets must hold the same number of atoms. The result minimizes the
/// RMSD to `reference` and has the centroid of `reference`.
pub fn superpose(mobile: &[[f64; 3]], reference: &[[f64; 3]]) -> Vec<[f64; 3]> {
    assert_eq!(mobile.len(), reference.len());

    let cm = centroid(mobile);
    let cr = centroid(reference);

    let mut h = Matrix3::<f64>::zeros();
    for (p, q) in mobile.iter().zip(reference.iter()) {
        let p = Vector3::from(*p) - cm;
        let q = Vector3::from(*q) - cr;
        h += p * q.transpose();
    }

    let svd = h.svd(true, true);
    let rotation = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => {
            let v = v_t.transpose();
            let d = (v * u.transpose()).determinant();
            // avoid reflections
            let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, if d < 0.0 { -1.0 } else { 1.0 }));
            v * correction * u.transpose()
        },
        _ => Matrix3::identity(),
    };

    mobile.iter()
        .map(|p| {
            let x = rotation * (Vector3::from(*p) - cm) + cr;
            [x[0], x[1], x[2]]
        })
        .collect()
}


/// Coordinates of the selected atoms after superposition on the first loaded
/// frame, flattened to `3 * n` values per frame.
pub struct CartesianFeatures {
    selection: AtomSelection,
    reference: Option<Vec<[f64; 3]>>,
}


impl CartesianFeatures {
    pub fn new(selection: AtomSelection) -> Self {
        Self { selection, reference: None }
    }

    pub fn get_reference(&self) -> Option<&[[f64; 3]]> { self.reference.as_deref() }
}


impl Featurizer for CartesianFeatures {
    fn description(&self) -> &str { "superposed cartesian coordinates" }
    fn n_features(&self) -> usize { 3 * self.selection.len() }

    fn check_fragment(&self, fragment: &TrajFragment) -> Result<()> {
        self.selection.check_bounds(fragment.n_atoms(), fragment.get_source())
    }

    fn prepare(&mut self, fragment: &TrajFragment) -> Result<()> {
        if fragment.n_frames() > 0 {
            self.reference = Some(self.selection.gather(fragment.xyz(0)));
        }
        Ok(())
    }

    fn featurize_frame(&self, xyz: &[[f64; 3]]) -> Vec<f64> {
        let coords = self.selection.gather(xyz);
        let coords = match self.reference.as_ref() {
            Some(reference) => superpose(&coords, reference),
            None => coords,
        };
        coords.into_iter().flatten().collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::path::PathBuf;
    use crate::features::extract_features;
    use traj_parsers::{Atom, Topology};

    fn rmsd(a: &[[f64; 3]], b: &[[f64; 3]]) -> f64 {
        let s: f64 = a.iter().zip(b.iter())
            .map(|(p, q)| (0 .. 3).map(|k| (p[k] - q[k]).powi(2)).sum::<f64>())
            .sum();
        (s / a.len() as f64).sqrt()
    }

    fn rotate_z(p: [f64; 3], angle: f64, shift: [f64; 3]) -> [f64; 3] {
        let (s, c) = angle.sin_cos();
        [c * p[0] - s * p[1] + shift[0], s * p[0] + c * p[1] + shift[1], p[2] + shift[2]]
    }

    fn reference() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [3.8, 0.0, 0.0],
            [5.1, 3.5, 0.4],
            [4.0, 5.9, 3.2],
            [1.2, 4.4, 5.0],
        ]
    }


    #[test]
    fn test_superpose_rigid_motion() {
        let reference = reference();
        let mobile = reference.iter()
            .map(|&p| rotate_z(p, 1.1, [10.0, -4.0, 2.5]))
            .collect::<Vec<_>>();
        assert!(rmsd(&mobile, &reference) > 1.0);

        let fitted = superpose(&mobile, &reference);
        assert!(rmsd(&fitted, &reference) < 1E-10);
    }


    #[test]
    fn test_superpose_no_reflection() {
        let reference = reference();
        let mirrored = reference.iter().map(|p| [p[0], p[1], -p[2]]).collect::<Vec<_>>();
        let fitted = superpose(&mirrored, &reference);

        // a proper rotation cannot undo a mirror image
        assert!(rmsd(&fitted, &reference) > 1E-3);
        let c = centroid(&fitted) - centroid(&reference);
        assert!(c.norm() < 1E-10);
    }


    #[test]
    fn test_cartesian_features() {
        let atoms = (0 .. 5)
            .map(|i| Atom {
                name: "CA".into(),
                resname: "GLY".into(),
                resid: i + 1,
                residue_index: i as usize,
                element: Some("C".into()),
            })
            .collect();
        let top = Arc::new(Topology::new(atoms, false));

        let first = reference();
        let moved = first.iter().map(|&p| rotate_z(p, -0.4, [1.0, 2.0, 3.0])).collect::<Vec<_>>();
        let frag = TrajFragment::new(top, PathBuf::from("run.dcd"),
            vec![first.clone(), moved], vec![0.0, 1.0], vec![0, 1]);

        let mut featurizer = CartesianFeatures::new(AtomSelection::new(vec![0, 2, 4]));
        let features = extract_features(&mut featurizer, vec![Ok(frag)]).unwrap();
        assert_eq!(features.matrix.dim(), (2, 9));
        assert_eq!(featurizer.get_reference().unwrap().len(), 3);

        for (a, b) in features.matrix.row(0).iter().zip(features.matrix.row(1).iter()) {
            assert!((a - b).abs() < 1E-10);
        }
    }
}
