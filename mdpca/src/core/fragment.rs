use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::MatX3;
use traj_parsers::Topology;


/// A contiguous run of frames taken from one trajectory file.
pub trait Fragment {
    fn n_frames(&self) -> usize;
    fn n_atoms(&self) -> usize;

    /// Coordinates of frame `iframe` in Angstrom.
    fn xyz(&self, iframe: usize) -> &[[f64; 3]];

    /// Simulation time of frame `iframe` in ps.
    fn time(&self, iframe: usize) -> f64;

    fn topology(&self) -> &Topology;
}


#[derive(Clone, Debug)]
pub struct TrajFragment {
    topology: Arc<Topology>,
    source: PathBuf,
    frames: Vec<MatX3<f64>>,
    times: Vec<f64>,
    indices: Vec<usize>,
}


impl TrajFragment {
    /// `indices` are the positions of the frames inside `source`.
    pub fn new(topology: Arc<Topology>, source: PathBuf,
               frames: Vec<MatX3<f64>>, times: Vec<f64>, indices: Vec<usize>) -> Self {
        assert_eq!(frames.len(), times.len());
        assert_eq!(frames.len(), indices.len());
        Self { topology, source, frames, times, indices }
    }

    pub fn get_source(&self) -> &Path { &self.source }
    pub fn get_times(&self) -> &[f64] { &self.times }
    pub fn get_indices(&self) -> &[usize] { &self.indices }
}


impl Fragment for TrajFragment {
    fn n_frames(&self) -> usize { self.frames.len() }
    fn n_atoms(&self) -> usize { self.topology.n_atoms() }
    fn xyz(&self, iframe: usize) -> &[[f64; 3]] { &self.frames[iframe] }
    fn time(&self, iframe: usize) -> f64 { self.times[iframe] }
    fn topology(&self) -> &Topology { &self.topology }
}
