use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use shared::{
    AnalysisError,
    MatX3,
    Result,
    ensure_file,
};

pub mod topology;
pub mod prmtop;
pub mod pdb;
pub mod dcd;
pub mod mdcrd;

pub use topology::{Atom, Topology};
pub use dcd::DcdReader;
pub use mdcrd::MdcrdReader;
pub use pdb::PdbTrajReader;


/// One snapshot of a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Cartesian coordinates in Angstrom, one entry per atom.
    pub coords: MatX3<f64>,

    /// Simulation time in ps, if the file format stores it.
    pub time: Option<f64>,
}


pub trait TrajectoryReader: Send {
    fn n_atoms(&self) -> usize;

    /// Number of frames in the file, if known without reading it through.
    fn n_frames_hint(&self) -> Option<usize>;

    /// Read the next frame, `Ok(None)` at the end of the trajectory.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Advance past the next frame without keeping it. Returns `false` at the end.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.read_frame()?.is_some())
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrajectoryFormat {
    Dcd,
    Mdcrd,
    Pdb,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyFormat {
    Prmtop,
    Pdb,
}


/// Lower-cased extension of `path`, looking through a trailing `.gz`.
fn extension_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext == "gz" {
        let inner = Path::new(path.file_stem()?);
        return inner.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
    }
    Some(ext)
}


impl TrajectoryFormat {
    pub fn from_path<P>(path: P) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("dcd") => Ok(Self::Dcd),
            Some("mdcrd" | "crd" | "trj" | "x") => Ok(Self::Mdcrd),
            Some("pdb" | "ent") => Ok(Self::Pdb),
            _ => Err(AnalysisError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }
}


impl TopologyFormat {
    pub fn from_path<P>(path: P) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("prmtop" | "parm7" | "top") => Ok(Self::Prmtop),
            Some("pdb" | "ent") => Ok(Self::Pdb),
            _ => Err(AnalysisError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }
}


/// Open a text file for buffered reading, decompressing it on the fly if it ends with `.gz`.
pub fn open_text<P>(path: P) -> Result<Box<dyn BufRead + Send>>
where P: AsRef<Path> {
    let path = path.as_ref();
    ensure_file(path)?;
    let file = File::open(path)?;

    let is_gz = path.extension()
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}


pub fn read_topology<P>(path: P) -> Result<Topology>
where P: AsRef<Path> {
    let path = path.as_ref();
    ensure_file(path)?;
    match TopologyFormat::from_path(path)? {
        TopologyFormat::Prmtop => prmtop::read_prmtop(path),
        TopologyFormat::Pdb    => pdb::read_pdb_topology(path),
    }
}


/// Open a trajectory file whose atoms are described by `topology`.
///
/// Formats that do not store the atom count themselves (AMBER mdcrd) take it from `topology`.
pub fn open_trajectory<P>(path: P, topology: &Topology) -> Result<Box<dyn TrajectoryReader>>
where P: AsRef<Path> {
    let path = path.as_ref();
    ensure_file(path)?;
    Ok(match TrajectoryFormat::from_path(path)? {
        TrajectoryFormat::Dcd   => Box::new(DcdReader::open(path)?),
        TrajectoryFormat::Mdcrd => Box::new(MdcrdReader::open(path, topology.n_atoms())?),
        TrajectoryFormat::Pdb   => Box::new(PdbTrajReader::open(path)?),
    })
}
