//! AMBER prmtop (parm7) topology reader.
//!
//! Only the sections needed to describe atoms and residues are kept:
//! `POINTERS`, `ATOM_NAME`, `RESIDUE_LABEL`, `RESIDUE_POINTER` and, when
//! present, `ATOMIC_NUMBER`.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use shared::{
    AnalysisError,
    Context,
    Regex,
    Result,
};

use crate::open_text;
use crate::topology::{Atom, Topology};


struct Section {
    width: usize,
    lines: Vec<String>,
}


impl Section {
    /// Split the section into its fixed-width fields, dropping blank ones.
    fn fields(&self) -> Vec<&str> {
        let mut ret = vec![];
        for line in self.lines.iter() {
            let line = line.trim_end_matches('\r');
            let mut pos = 0;
            while pos < line.len() {
                let end = (pos + self.width).min(line.len());
                let field = line.get(pos .. end).unwrap_or("").trim();
                if !field.is_empty() {
                    ret.push(field);
                }
                pos = end;
            }
        }
        ret
    }
}


struct Prmtop {
    path: std::path::PathBuf,
    sections: HashMap<String, Section>,
}


impl Prmtop {
    fn parse<R: BufRead>(path: &Path, reader: R) -> Result<Self> {
        let re_format = Regex::new(r"^%FORMAT\(\s*\d*\s*[aAiIeEfF](\d+)")?;

        let mut sections: HashMap<String, Section> = HashMap::new();
        let mut current: Option<String> = None;

        for line in reader.lines() {
            let line = line?;

            if let Some(flag) = line.strip_prefix("%FLAG") {
                let flag = flag.trim().to_string();
                sections.insert(flag.clone(), Section { width: 0, lines: vec![] });
                current = Some(flag);
            } else if line.starts_with("%FORMAT") {
                let width = re_format.captures(&line)
                    .and_then(|c| c[1].parse::<usize>().ok())
                    .ok_or_else(|| AnalysisError::format(path, format!("unrecognized format line: {}", line.trim())))?;
                if let Some(sec) = current.as_ref().and_then(|f| sections.get_mut(f)) {
                    sec.width = width;
                }
            } else if line.starts_with('%') {
                continue;
            } else if let Some(sec) = current.as_ref().and_then(|f| sections.get_mut(f)) {
                sec.lines.push(line);
            }
        }

        if sections.is_empty() {
            return Err(AnalysisError::format(path, "no %FLAG sections found, not an AMBER prmtop file").into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            sections,
        })
    }


    fn section(&self, flag: &str) -> Result<&Section> {
        let sec = self.sections.get(flag)
            .ok_or_else(|| AnalysisError::format(&self.path, format!("missing section %FLAG {}", flag)))?;
        if sec.width == 0 {
            return Err(AnalysisError::format(&self.path, format!("section %FLAG {} has no %FORMAT line", flag)).into());
        }
        Ok(sec)
    }


    fn strings(&self, flag: &str) -> Result<Vec<String>> {
        Ok(self.section(flag)?.fields().into_iter().map(String::from).collect())
    }


    fn integers(&self, flag: &str) -> Result<Vec<i64>> {
        self.section(flag)?.fields()
            .into_iter()
            .map(|s| s.parse::<i64>()
                 .map_err(|_| AnalysisError::format(&self.path, format!("invalid integer '{}' in %FLAG {}", s, flag)).into()))
            .collect()
    }
}


fn element_from_atomic_number(z: i64) -> Option<String> {
    const ELEMENTS: &[&str] = &[
        "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
        "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
        "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    ];
    usize::try_from(z).ok()
        .filter(|&z| z >= 1)
        .and_then(|z| ELEMENTS.get(z - 1))
        .map(|s| s.to_string())
}


pub fn read_prmtop<P>(path: P) -> Result<Topology>
where P: AsRef<Path> {
    let path = path.as_ref();
    let reader = open_text(path)?;
    let prmtop = Prmtop::parse(path, reader)
        .with_context(|| format!("Failed to read AMBER topology {:?}", path))?;

    let pointers = prmtop.integers("POINTERS")?;
    if pointers.len() < 12 {
        return Err(AnalysisError::format(path, "%FLAG POINTERS is too short").into());
    }
    let n_atoms    = usize::try_from(pointers[0]).map_err(|_| AnalysisError::format(path, "negative NATOM"))?;
    let n_residues = usize::try_from(pointers[11]).map_err(|_| AnalysisError::format(path, "negative NRES"))?;
    let periodic   = pointers.get(27).map(|&ifbox| ifbox > 0).unwrap_or(false);

    let names = prmtop.strings("ATOM_NAME")?;
    let labels = prmtop.strings("RESIDUE_LABEL")?;
    let res_pointers = prmtop.integers("RESIDUE_POINTER")?;
    let atomic_numbers = prmtop.integers("ATOMIC_NUMBER").ok();

    if names.len() != n_atoms {
        return Err(AnalysisError::format(path,
            format!("ATOM_NAME has {} entries, but POINTERS declares {} atoms", names.len(), n_atoms)).into());
    }
    if labels.len() != n_residues || res_pointers.len() != n_residues {
        return Err(AnalysisError::format(path,
            format!("RESIDUE_LABEL/RESIDUE_POINTER have {}/{} entries, but POINTERS declares {} residues",
                labels.len(), res_pointers.len(), n_residues)).into());
    }

    // RESIDUE_POINTER counts from 1 and must be strictly increasing
    let mut starts = Vec::with_capacity(n_residues);
    for (ires, &p) in res_pointers.iter().enumerate() {
        let start = usize::try_from(p - 1)
            .map_err(|_| AnalysisError::format(path, format!("invalid RESIDUE_POINTER {} at residue {}", p, ires + 1)))?;
        if start >= n_atoms || starts.last().map(|&last| start <= last).unwrap_or(false) {
            return Err(AnalysisError::format(path, format!("invalid RESIDUE_POINTER {} at residue {}", p, ires + 1)).into());
        }
        starts.push(start);
    }
    if n_atoms > 0 && starts.first() != Some(&0) {
        return Err(AnalysisError::format(path, "first residue does not start at atom 1").into());
    }

    let mut atoms = Vec::with_capacity(n_atoms);
    for ires in 0 .. n_residues {
        let end = starts.get(ires + 1).copied().unwrap_or(n_atoms);
        for iatom in starts[ires] .. end {
            atoms.push(Atom {
                name: names[iatom].clone(),
                resname: labels[ires].clone(),
                resid: ires as i32 + 1,
                residue_index: ires,
                element: atomic_numbers.as_ref()
                    .and_then(|zs| zs.get(iatom))
                    .and_then(|&z| element_from_atomic_number(z)),
            });
        }
    }

    Ok(Topology::new(atoms, periodic))
}
