//! Synthetic systems written as PDB files for the tests of this crate.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};


/// Residue name and atom names of the test peptide: four alanines, one water
/// and a calcium ion whose atom is also called `CA`.
const RESIDUES: &[(&str, &[&str])] = &[
    ("ALA", &["N", "CA", "C"]),
    ("ALA", &["N", "CA", "C"]),
    ("ALA", &["N", "CA", "C"]),
    ("ALA", &["N", "CA", "C"]),
    ("WAT", &["O"]),
    ("CA",  &["CA"]),
];


pub fn n_atoms() -> usize {
    RESIDUES.iter().map(|(_, names)| names.len()).sum()
}


/// Indices of the four protein alpha carbons.
pub fn ca_indices() -> Vec<usize> {
    vec![1, 4, 7, 10]
}


/// Deterministic, non-degenerate coordinates of one frame.
pub fn frame_coords(ifile: usize, iframe: usize) -> Vec<[f64; 3]> {
    let t = (ifile * 10 + iframe) as f64;
    (0 .. n_atoms())
        .map(|i| {
            let x = i as f64;
            [
                3.8 * x + (0.7 * t + x).sin(),
                2.0 * (1.3 * t + 0.5 * x).cos(),
                0.3 * x * (0.2 * t).sin() + 0.1 * t,
            ]
        })
        .collect()
}


fn write_models(frames: &[Vec<[f64; 3]>]) -> String {
    let mut s = String::new();
    for (imodel, coords) in frames.iter().enumerate() {
        writeln!(s, "MODEL     {:>4}", imodel + 1).unwrap();
        let mut iatom = 0;
        for (ires, (resname, names)) in RESIDUES.iter().enumerate() {
            for name in names.iter() {
                let xyz = coords[iatom];
                writeln!(s, "ATOM  {:>5} {:<4} {:>3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00",
                    iatom + 1, name, resname, ires + 1, xyz[0], xyz[1], xyz[2]).unwrap();
                iatom += 1;
                if iatom == coords.len() {
                    break;
                }
            }
            if iatom == coords.len() {
                break;
            }
        }
        writeln!(s, "ENDMDL").unwrap();
    }
    writeln!(s, "END").unwrap();
    s
}


pub fn write_topology(dir: &Path) -> PathBuf {
    let fname = dir.join("peptide.pdb");
    fs::write(&fname, write_models(&[frame_coords(0, 0)])).unwrap();
    fname
}


/// Write `nfiles` trajectories of `nframes` models each, named `run<i>.pdb`.
pub fn write_trajectories(dir: &Path, nfiles: usize, nframes: usize) -> Vec<PathBuf> {
    (0 .. nfiles)
        .map(|ifile| {
            let fname = dir.join(format!("run{}.pdb", ifile));
            let frames = (0 .. nframes).map(|iframe| frame_coords(ifile, iframe)).collect::<Vec<_>>();
            fs::write(&fname, write_models(&frames)).unwrap();
            fname
        })
        .collect()
}


/// A trajectory whose frames hold only the first `natoms` atoms.
pub fn write_truncated_trajectory(dir: &Path, natoms: usize) -> PathBuf {
    let fname = dir.join("truncated.pdb");
    let frames = (0 .. 3)
        .map(|iframe| frame_coords(0, iframe).into_iter().take(natoms).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    fs::write(&fname, write_models(&frames)).unwrap();
    fname
}
