use std::fmt;


/// Residue names treated as protein, including the AMBER and CHARMM
/// protonation/termini variants.
const PROTEIN_RESIDUES: &[&str] = &[
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    "ASH", "GLH", "HID", "HIE", "HIP", "HSD", "HSE", "HSP", "CYX", "CYM",
    "LYN", "MSE", "SEC", "PYL", "HYP",
];


pub fn is_protein_residue(resname: &str) -> bool {
    let name = resname.trim().to_ascii_uppercase();
    // AMBER terminal residues carry an N/C prefix: NALA, CGLY, ...
    let stripped = match name.len() {
        4 if name.starts_with('N') || name.starts_with('C') => &name[1..],
        _ => name.as_str(),
    };
    PROTEIN_RESIDUES.contains(&name.as_str()) || PROTEIN_RESIDUES.contains(&stripped)
}


#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub name: String,
    pub resname: String,

    /// Residue number as written in the topology file.
    pub resid: i32,

    /// 0-based residue index in order of appearance.
    pub residue_index: usize,

    pub element: Option<String>,
}


/// Static description of the atoms referenced by a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Topology {
    atoms: Vec<Atom>,
    n_residues: usize,
    periodic: bool,
}


impl Topology {
    pub fn new(atoms: Vec<Atom>, periodic: bool) -> Self {
        let n_residues = atoms.last().map(|a| a.residue_index + 1).unwrap_or(0);
        Self { atoms, n_residues, periodic }
    }

    pub fn n_atoms(&self) -> usize { self.atoms.len() }
    pub fn n_residues(&self) -> usize { self.n_residues }
    pub fn atoms(&self) -> &[Atom] { &self.atoms }
    pub fn is_periodic(&self) -> bool { self.periodic }

    /// Indices of all atoms satisfying `pred`, in ascending order.
    pub fn select<F>(&self, pred: F) -> Vec<usize>
    where F: Fn(&Atom) -> bool {
        self.atoms.iter()
            .enumerate()
            .filter(|(_, a)| pred(a))
            .map(|(i, _)| i)
            .collect()
    }
}


impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Topology with {} atoms in {} residues{}>",
            self.n_atoms(), self.n_residues, if self.periodic { ", periodic" } else { "" })
    }
}
