//! Chunked, strided loading of trajectory files against one topology.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::{
    AnalysisError,
    Context,
    Result,
    anyhow::ensure,
    ensure_file,
    log,
};
use traj_parsers::{
    Topology,
    TrajectoryFormat,
    TrajectoryReader,
    open_trajectory,
    read_topology,
};

use crate::core::TrajFragment;


struct OpenTrajectory {
    path: PathBuf,
    reader: Box<dyn TrajectoryReader>,
    iframe: usize,
}


/// Pull-based producer of trajectory fragments.
///
/// Files are visited in the given order. Inside each file, frames whose index
/// is a multiple of `stride` are kept, and every `chunk` frames read from disk
/// form one fragment. Batches without any kept frame are skipped. After the
/// first error the loader yields nothing more.
pub struct TrajectoryLoader {
    topology: Arc<Topology>,
    paths: Vec<PathBuf>,
    stride: usize,
    chunk: usize,

    ifile: usize,
    current: Option<OpenTrajectory>,
    /// Frames in the files already read, so that index-based times keep increasing.
    frame_offset: usize,
    finished: bool,
}


impl TrajectoryLoader {
    pub fn new<P, Q>(trajectories: &[P], topology: Q, stride: usize, chunk: usize) -> Result<Self>
    where P: AsRef<Path>,
          Q: AsRef<Path> {
        let topology = topology.as_ref();
        ensure_file(topology)?;
        let top = read_topology(topology)
            .with_context(|| format!("Failed to read topology {:?}", topology))?;
        log::info!("Topology {:?} loaded: {}", topology, top);
        Self::with_topology(trajectories, Arc::new(top), stride, chunk)
    }


    pub fn with_topology<P>(trajectories: &[P], topology: Arc<Topology>, stride: usize, chunk: usize) -> Result<Self>
    where P: AsRef<Path> {
        ensure!(stride >= 1, "Stride must be a positive integer, got {}.", stride);
        ensure!(chunk >= 1, "Chunk must be a positive integer, got {}.", chunk);
        if chunk % stride != 0 {
            log::warn!("Chunk ({}) is not a multiple of stride ({}), fragments will hold uneven numbers of frames.",
                chunk, stride);
        }

        let paths = trajectories.iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect::<Vec<_>>();
        for path in paths.iter() {
            ensure_file(path)?;
            TrajectoryFormat::from_path(path)?;
        }

        Ok(Self {
            topology,
            paths,
            stride,
            chunk,
            ifile: 0,
            current: None,
            frame_offset: 0,
            finished: false,
        })
    }


    pub fn get_topology(&self) -> &Arc<Topology> { &self.topology }


    fn open_next_file(&mut self) -> Result<bool> {
        let Some(path) = self.paths.get(self.ifile).cloned() else {
            return Ok(false);
        };
        self.ifile += 1;

        let reader = open_trajectory(&path, &self.topology)?;
        match reader.n_frames_hint() {
            Some(n) => log::info!("Loading {:?} ({} frames)", path, n),
            None => log::info!("Loading {:?}", path),
        }
        if reader.n_atoms() != self.topology.n_atoms() {
            return Err(AnalysisError::format(&path, format!(
                "trajectory has {} atoms while the topology has {}",
                reader.n_atoms(), self.topology.n_atoms()
            )).into());
        }

        self.current = Some(OpenTrajectory { path, reader, iframe: 0 });
        Ok(true)
    }


    fn next_fragment(&mut self) -> Result<Option<TrajFragment>> {
        loop {
            if self.current.is_none() && !self.open_next_file()? {
                return Ok(None);
            }
            let Some(file) = self.current.as_mut() else {
                continue;
            };

            let mut frames = vec![];
            let mut times = vec![];
            let mut indices = vec![];
            let mut exhausted = false;

            for _ in 0 .. self.chunk {
                let iframe = file.iframe;
                if iframe % self.stride == 0 {
                    match file.reader.read_frame()? {
                        Some(frame) => {
                            times.push(frame.time.unwrap_or((self.frame_offset + iframe) as f64));
                            frames.push(frame.coords);
                            indices.push(iframe);
                        },
                        None => {
                            exhausted = true;
                            break;
                        },
                    }
                } else if !file.reader.skip_frame()? {
                    exhausted = true;
                    break;
                }
                file.iframe += 1;
            }

            let source = file.path.clone();
            if exhausted {
                log::debug!("Reached the end of {:?} after {} frames.", source, file.iframe);
                self.frame_offset += file.iframe;
                self.current = None;
            }

            if !frames.is_empty() {
                log::debug!("Fragment of {} frames from {:?}, frames {:?}", frames.len(), source, indices);
                return Ok(Some(TrajFragment::new(self.topology.clone(), source, frames, times, indices)));
            }
        }
    }
}


impl Iterator for TrajectoryLoader {
    type Item = Result<TrajFragment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_fragment() {
            Ok(Some(frag)) => Some(Ok(frag)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(e) => {
                self.finished = true;
                self.current = None;
                Some(Err(e))
            },
        }
    }
}
