//! PDB reader: the first model as a topology, and `MODEL`/`ENDMDL` blocks as trajectory frames.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use shared::{
    AnalysisError,
    MatX3,
    Result,
};

use crate::{
    Frame,
    TrajectoryReader,
    open_text,
};
use crate::topology::{Atom, Topology};


#[derive(Clone, Debug, PartialEq)]
struct PdbAtom {
    name: String,
    resname: String,
    chain: char,
    resid: i32,
    icode: char,
    position: [f64; 3],
    element: Option<String>,
}


/// Fixed PDB columns are 1-based inclusive in the format documentation, here they are 0-based half-open.
fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start .. end).unwrap_or("")
}


fn parse_atom_line(path: &Path, lineno: usize, line: &str) -> Result<PdbAtom> {
    let err = |what: &str| AnalysisError::format(path, format!("line {}: invalid {} in '{}'", lineno, what, line.trim_end()));

    let coord = |start, end, what: &str| -> Result<f64> {
        column(line, start, end).trim().parse::<f64>().map_err(|_| err(what).into())
    };

    let resid_field = column(line, 22, 26).trim();
    let resid = if resid_field.is_empty() {
        0
    } else {
        resid_field.parse::<i32>().map_err(|_| err("residue number"))?
    };

    let element = column(line, 76, 78).trim();

    Ok(PdbAtom {
        name: column(line, 12, 16).trim().to_string(),
        resname: column(line, 17, 21).trim().to_string(),
        chain: column(line, 21, 22).chars().next().unwrap_or(' '),
        resid,
        icode: column(line, 26, 27).chars().next().unwrap_or(' '),
        position: [
            coord(30, 38, "x coordinate")?,
            coord(38, 46, "y coordinate")?,
            coord(46, 54, "z coordinate")?,
        ],
        element: if element.is_empty() { None } else { Some(element.to_string()) },
    })
}


fn is_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}


/// Streams models out of a PDB file.
struct ModelReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    lineno: usize,
    finished: bool,
    periodic: bool,
}


impl ModelReader {
    fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            reader: open_text(path)?,
            lineno: 0,
            finished: false,
            periodic: false,
        })
    }


    /// Atoms of the next model; `None` once the file holds no further atoms.
    fn next_model(&mut self) -> Result<Option<Vec<PdbAtom>>> {
        if self.finished {
            return Ok(None);
        }

        let mut atoms = vec![];
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.finished = true;
                break;
            }
            self.lineno += 1;
            let record = line.trim_end_matches(['\n', '\r']);

            if is_atom_record(record) {
                atoms.push(parse_atom_line(&self.path, self.lineno, record)?);
            } else if record.starts_with("CRYST1") {
                self.periodic = true;
            } else if record.starts_with("ENDMDL") {
                if !atoms.is_empty() {
                    break;
                }
            } else if record.starts_with("MODEL") {
                // a missing ENDMDL still closes the previous model
                if !atoms.is_empty() {
                    break;
                }
            } else if record.starts_with("END") && !record.starts_with("ENDMDL") {
                self.finished = true;
                break;
            }
        }

        Ok(if atoms.is_empty() { None } else { Some(atoms) })
    }
}


/// Read the first model of a PDB file as a topology.
///
/// Residues are numbered in order of appearance; a new residue starts whenever
/// the residue number, insertion code, chain or residue name changes.
pub fn read_pdb_topology<P>(path: P) -> Result<Topology>
where P: AsRef<Path> {
    let path = path.as_ref();
    let mut models = ModelReader::open(path)?;
    let first = models.next_model()?
        .ok_or_else(|| AnalysisError::format(path, "no ATOM/HETATM records found"))?;

    let mut atoms = Vec::with_capacity(first.len());
    let mut residue_index = 0usize;
    let mut previous: Option<(i32, char, char, &str)> = None;

    for a in first.iter() {
        let key = (a.resid, a.icode, a.chain, a.resname.as_str());
        if let Some(prev) = previous {
            if prev != key {
                residue_index += 1;
            }
        }
        previous = Some(key);

        atoms.push(Atom {
            name: a.name.clone(),
            resname: a.resname.clone(),
            resid: a.resid,
            residue_index,
            element: a.element.clone(),
        });
    }

    Ok(Topology::new(atoms, models.periodic))
}


/// Multi-model PDB file read as a trajectory, one frame per model.
pub struct PdbTrajReader {
    models: ModelReader,
    n_atoms: usize,
    pending: Option<MatX3<f64>>,
}


impl PdbTrajReader {
    pub fn open<P>(path: P) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        let mut models = ModelReader::open(path)?;
        let first = models.next_model()?
            .ok_or_else(|| AnalysisError::format(path, "no ATOM/HETATM records found"))?;

        Ok(Self {
            n_atoms: first.len(),
            pending: Some(first.into_iter().map(|a| a.position).collect()),
            models,
        })
    }
}


impl TrajectoryReader for PdbTrajReader {
    fn n_atoms(&self) -> usize { self.n_atoms }
    fn n_frames_hint(&self) -> Option<usize> { None }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let coords = match self.pending.take() {
            Some(c) => c,
            None => match self.models.next_model()? {
                Some(atoms) => atoms.into_iter().map(|a| a.position).collect::<MatX3<f64>>(),
                None => return Ok(None),
            },
        };

        if coords.len() != self.n_atoms {
            return Err(AnalysisError::format(&self.models.path, format!(
                "model ending at line {} has {} atoms, the first model has {}",
                self.models.lineno, coords.len(), self.n_atoms
            )).into());
        }

        Ok(Some(Frame { coords, time: None }))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::fs;
    use tempfile::tempdir;

    /// Format one PDB ATOM record.
    fn atom_line(serial: usize, name: &str, resname: &str, resid: i32, xyz: [f64; 3]) -> String {
        format!("ATOM  {:>5} {:<4} {:>3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00           {}",
            serial, name, resname, resid, xyz[0], xyz[1], xyz[2], &name[..1])
    }

    fn write_models(models: &[Vec<[f64; 3]>]) -> String {
        let names = ["N", "CA", "C", "O"];
        let mut s = String::new();
        writeln!(s, "CRYST1   30.000   30.000   30.000  90.00  90.00  90.00 P 1           1").unwrap();
        for (imodel, coords) in models.iter().enumerate() {
            writeln!(s, "MODEL     {:>4}", imodel + 1).unwrap();
            for (i, xyz) in coords.iter().enumerate() {
                writeln!(s, "{}", atom_line(i + 1, names[i % 4], "ALA", 1 + i as i32 / 4, *xyz)).unwrap();
            }
            writeln!(s, "ENDMDL").unwrap();
        }
        writeln!(s, "END").unwrap();
        s
    }


    #[test]
    fn test_parse_atom_line() {
        let line = atom_line(12, "CA", "GLY", 7, [1.5, -2.25, 10.125]);
        let atom = parse_atom_line(Path::new("x.pdb"), 1, &line).unwrap();
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.resname, "GLY");
        assert_eq!(atom.resid, 7);
        assert_eq!(atom.chain, 'A');
        assert_eq!(atom.position, [1.5, -2.25, 10.125]);
        assert_eq!(atom.element.as_deref(), Some("C"));

        let broken = line.replace("-2.250", "  abcd");
        assert!(parse_atom_line(Path::new("x.pdb"), 1, &broken).is_err());
    }


    #[test]
    fn test_topology_and_frames() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("traj.pdb");
        let models = (0 .. 3)
            .map(|m| (0 .. 8).map(|i| [i as f64, m as f64, 0.5]).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        fs::write(&fname, write_models(&models)).unwrap();

        let top = read_pdb_topology(&fname).unwrap();
        assert_eq!(top.n_atoms(), 8);
        assert_eq!(top.n_residues(), 2);
        assert!(top.is_periodic());
        assert_eq!(top.atoms()[5].name, "CA");
        assert_eq!(top.atoms()[5].residue_index, 1);

        let mut traj = PdbTrajReader::open(&fname).unwrap();
        assert_eq!(traj.n_atoms(), 8);
        let mut count = 0;
        while let Some(frame) = traj.read_frame().unwrap() {
            assert_eq!(frame.coords.len(), 8);
            assert_eq!(frame.coords[3], [3.0, count as f64, 0.5]);
            assert_eq!(frame.time, None);
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(traj.read_frame().unwrap().is_none());
    }


    #[test]
    fn test_single_model_without_model_records() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("single.pdb");
        let body = (0 .. 4)
            .map(|i| atom_line(i + 1, "CA", "LYS", i as i32 + 1, [i as f64, 0.0, 0.0]))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&fname, body + "\nEND\n").unwrap();

        let mut traj = PdbTrajReader::open(&fname).unwrap();
        assert!(traj.read_frame().unwrap().is_some());
        assert!(traj.read_frame().unwrap().is_none());
        assert_eq!(read_pdb_topology(&fname).unwrap().n_residues(), 4);
    }


    #[test]
    fn test_models_without_endmdl() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("no_endmdl.pdb");
        let models = (0 .. 3)
            .map(|m| (0 .. 4).map(|i| [i as f64, m as f64, 0.0]).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let text = write_models(&models).replace("ENDMDL\n", "");
        fs::write(&fname, text).unwrap();

        assert_eq!(read_pdb_topology(&fname).unwrap().n_atoms(), 4);

        let mut traj = PdbTrajReader::open(&fname).unwrap();
        assert_eq!(traj.n_atoms(), 4);
        let mut count = 0;
        while let Some(frame) = traj.read_frame().unwrap() {
            assert_eq!(frame.coords[2], [2.0, count as f64, 0.0]);
            count += 1;
        }
        assert_eq!(count, 3);
    }


    #[test]
    fn test_inconsistent_models() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("bad.pdb");
        let models = vec![
            vec![[0.0, 0.0, 0.0]; 4],
            vec![[0.0, 0.0, 0.0]; 3],
        ];
        fs::write(&fname, write_models(&models)).unwrap();

        let mut traj = PdbTrajReader::open(&fname).unwrap();
        assert!(traj.read_frame().unwrap().is_some());
        let err = traj.read_frame().unwrap_err();
        assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::Format { .. })));
    }
}
