use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shared::{
    AnalysisError,
    Context,
    Result,
    log,
};

use crate::OptProcess;
use crate::core::AnalysisConfig;
use crate::plot::{PlotKind, DEFAULT_DPI};
use crate::pca;
use super::config::FeatureKind;


#[derive(Debug, Parser)]
/// Principal component analysis of MD trajectories.
///
/// Every kept frame is described by the distances between all pairs of
/// protein alpha carbons (or by their superposed coordinates), and the first
/// two principal components are plotted as scatter or hexbin.
///
/// Positional arguments come in the order TOPOLOGY PLOT_KIND TRAJECTORIES...,
/// the trajectories last so that any number of files or patterns may follow.
pub struct PcaCommand {
    #[arg(required_unless_present_any=["config", "generate"])]
    /// Topology file: AMBER prmtop or PDB.
    topology: Option<PathBuf>,

    #[arg(value_enum, required_unless_present_any=["config", "generate"])]
    /// Kind of plot.
    plot_kind: Option<PlotKind>,

    #[arg(required_unless_present_any=["config", "generate"], num_args=1..)]
    /// Trajectory files, glob patterns like "run_*.dcd" are expanded.
    ///
    /// The final list is sorted by file name.
    trajectories: Vec<String>,

    #[arg(short, long)]
    /// Save the figure under `<TITLE>.png` instead of showing it.
    save: bool,

    #[arg(long, default_value_t=1)]
    /// Keep every N-th frame of each trajectory.
    stride: usize,

    #[arg(long, default_value_t=50)]
    /// Number of frames read from disk per batch.
    ///
    /// Should be a multiple of the stride.
    chunk: usize,

    #[arg(short, long, default_value="PCA")]
    /// Title of the figure, also used as the file name stem with `--save`.
    title: String,

    #[arg(long, default_value_t=DEFAULT_DPI)]
    /// Resolution of the saved figure.
    dpi: u32,

    #[arg(long, value_enum, default_value_t=FeatureKind::Distances)]
    /// Features describing each frame.
    features: FeatureKind,

    #[arg(long)]
    /// Restrict the alpha carbons to these residue ids, e.g. "1..50 60".
    residues: Option<String>,

    #[arg(long)]
    /// Color the scatter markers by simulation time.
    color_by_time: bool,

    #[arg(long)]
    /// Caption printed above the plot.
    caption: Option<String>,

    #[arg(long)]
    /// Write the projection to this file, readable by `mdpca kde`.
    write_projection: Option<PathBuf>,

    #[arg(long, num_args=2, value_names=["FIRST", "LAST"], default_values_t=[1, 1])]
    /// Frame range, 1-based and inclusive, of the `--generate cpptraj` scripts.
    frames: Vec<usize>,

    #[arg(short='n', long, default_value_t=1)]
    /// Number of threads for feature extraction.
    ///
    /// If 0 is set, it will fall back to the number of logical CPU cores of your machine.
    nthreads: usize,

    #[arg(short='c', long, aliases=["cfg", "conf"],
          conflicts_with_all=["topology", "plot_kind", "trajectories"])]
    /// Read the settings from a config file instead of the command line.
    ///
    /// Aliases: "cfg", "conf".
    config: Option<PathBuf>,

    #[arg(long, value_enum, alias="gen")]
    /// Generate auxiliary files for the analysis.
    ///
    /// The analysis will not run if this flag is set.
    ///
    /// Alias: "gen"
    generate: Option<TemplateGenerator>,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TemplateGenerator {
    #[value(aliases=["config", "cfg", "conf"])]
    /// Generate config template for PCA. Aliases: "config", "cfg", "conf".
    ConfigTemplate,

    #[value(aliases=["cpptraj"])]
    /// Generate one cpptraj script per trajectory extracting `--frames` to `pdbs/<name>.pdb`. Alias: "cpptraj".
    CpptrajScript,
}


fn has_glob_meta(s: &str) -> bool {
    s.contains(&['*', '?', '['][..])
}


/// Expand glob patterns and sort the resulting paths.
fn expand_trajectories(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut ret = vec![];
    for arg in args.iter() {
        if !has_glob_meta(arg) {
            ret.push(PathBuf::from(arg));
            continue;
        }

        let matched = glob::glob(arg)
            .with_context(|| format!("Invalid glob pattern {:?}", arg))?
            .collect::<Result<Vec<_>, _>>()?;
        if matched.is_empty() {
            return Err(AnalysisError::FileNotFound(PathBuf::from(arg)).into());
        }
        log::debug!("Pattern {:?} matched {} files.", arg, matched.len());
        ret.extend(matched);
    }
    ret.sort();
    Ok(ret)
}


impl PcaCommand {
    fn write_cpptraj_scripts(&self) -> Result<Vec<PathBuf>> {
        let Some(topology) = self.topology.as_ref() else {
            shared::bail!("A topology and trajectories are required for cpptraj scripts.");
        };
        let frames = (self.frames[0], self.frames[1]);
        let trajs = expand_trajectories(&self.trajectories)?;
        pca::write_cpptraj_scripts(".", &trajs, topology, frames, self.stride)
    }


    fn to_config(&self) -> Result<pca::PcaConfig> {
        if let Some(fname) = self.config.as_ref() {
            return pca::PcaConfig::from_file(fname);
        }

        let (Some(topology), Some(plot_kind)) = (self.topology.as_ref(), self.plot_kind) else {
            shared::bail!("Topology and plot kind are required without a config file.");
        };

        let cfg = pca::PcaConfig {
            trajectories: expand_trajectories(&self.trajectories)?,
            topology: topology.clone(),
            plot_kind,
            save: self.save,
            stride: self.stride,
            chunk: self.chunk,
            title: self.title.clone(),
            dpi: self.dpi,
            features: self.features,
            residues: self.residues.clone(),
            color_by_time: self.color_by_time,
            projection_fname: self.write_projection.clone(),
            caption: self.caption.clone(),
        };
        cfg.check_config()?;
        Ok(cfg)
    }
}


impl OptProcess for PcaCommand {
    fn process(&self) -> Result<()> {
        use TemplateGenerator::*;

        if let Some(g) = self.generate {
            return match g {
                ConfigTemplate => pca::PcaConfig::default().to_file("pca_config_template.toml"),
                CpptrajScript => self.write_cpptraj_scripts().map(|_| ()),
            }
        }

        let cfg = self.to_config()?;
        cfg.print_to_log();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.nthreads).build()?;
        let image = pool.install(|| pca::run_pca(&cfg))?;
        log::info!("PCA finished, figure at {:?}", image);
        Ok(())
    }
}
