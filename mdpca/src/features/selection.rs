use std::path::Path;

use itertools::Itertools;

use shared::{
    AnalysisError,
    Result,
};
use traj_parsers::{Topology, topology::is_protein_residue};


/// Sorted, duplicate-free atom indices into one topology.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomSelection {
    indices: Vec<usize>,
}


impl AtomSelection {
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] { &self.indices }
    pub fn len(&self) -> usize { self.indices.len() }
    pub fn is_empty(&self) -> bool { self.indices.is_empty() }

    /// Fails if any index does not exist in a frame of `n_atoms` atoms.
    pub fn check_bounds(&self, n_atoms: usize, source: &Path) -> Result<()> {
        match self.indices.last() {
            Some(&last) if last >= n_atoms => Err(AnalysisError::format(source,
                format!("selected atom index {} is out of range for {} atoms", last, n_atoms)).into()),
            _ => Ok(()),
        }
    }

    /// Gather the selected atoms out of a full frame.
    pub fn gather(&self, xyz: &[[f64; 3]]) -> Vec<[f64; 3]> {
        self.indices.iter().map(|&i| xyz[i]).collect()
    }
}


/// Alpha carbons of the protein backbone, optionally restricted to the residues numbered in `residues`.
pub fn select_backbone_ca(topology: &Topology, residues: Option<&[i32]>) -> Result<AtomSelection> {
    let indices = topology.select(|a| {
        a.name == "CA"
            && is_protein_residue(&a.resname)
            && residues.map(|rs| rs.contains(&a.resid)).unwrap_or(true)
    });

    if indices.is_empty() {
        return Err(AnalysisError::insufficient(match residues {
            Some(rs) => format!("no protein alpha carbon found in residues [{}]", rs.iter().format(" ")),
            None => format!("no protein alpha carbon found in {}", topology),
        }).into());
    }

    Ok(AtomSelection::new(indices))
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use traj_parsers::read_topology;
    use crate::test_utils::*;

    #[test]
    fn test_select_backbone_ca() {
        let dir = tempdir().unwrap();
        let top = read_topology(write_topology(dir.path())).unwrap();

        let sel = select_backbone_ca(&top, None).unwrap();
        assert_eq!(sel.indices(), ca_indices().as_slice());

        let sel = select_backbone_ca(&top, Some(&[2, 3, 6][..])).unwrap();
        assert_eq!(sel.indices(), &[4, 7]);

        let err = select_backbone_ca(&top, Some(&[5, 6][..])).unwrap_err();
        assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_selection_helpers() {
        let sel = AtomSelection::new(vec![7, 1, 4, 1]);
        assert_eq!(sel.indices(), &[1, 4, 7]);
        assert!(sel.check_bounds(8, Path::new("run.dcd")).is_ok());
        assert!(sel.check_bounds(7, Path::new("run.dcd")).is_err());

        let xyz = (0 .. 8).map(|i| [i as f64; 3]).collect::<Vec<_>>();
        assert_eq!(sel.gather(&xyz), vec![[1.0; 3], [4.0; 3], [7.0; 3]]);
    }
}
