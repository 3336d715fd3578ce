use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;
use shared::{
    log,
    Result,
};

use crate::core::config::{AnalysisConfig, add_violation};
use crate::plot::{PlotKind, DEFAULT_DPI};


#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Distances between every pair of alpha carbons.
    Distances,
    /// Alpha carbon coordinates superposed on the first frame.
    Cartesian,
}


impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            FeatureKind::Distances => "distances",
            FeatureKind::Cartesian => "cartesian",
        })
    }
}


fn default_title() -> String { "PCA".to_string() }
fn default_dpi() -> u32 { DEFAULT_DPI }
fn default_features() -> FeatureKind { FeatureKind::Distances }


#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PcaConfig {
    pub(super) trajectories: Vec<PathBuf>,
    pub(super) topology: PathBuf,
    pub(super) plot_kind: PlotKind,

    #[serde(default)]
    pub(super) save: bool,

    pub(super) stride: usize,
    pub(super) chunk: usize,

    #[serde(default = "default_title")]
    pub(super) title: String,

    #[serde(default = "default_dpi")]
    pub(super) dpi: u32,

    #[serde(default = "default_features")]
    pub(super) features: FeatureKind,

    #[serde(default)]
    pub(super) residues: Option<String>,

    #[serde(default)]
    pub(super) color_by_time: bool,

    #[serde(default)]
    pub(super) projection_fname: Option<PathBuf>,

    #[serde(default)]
    pub(super) caption: Option<String>,
}


impl PcaConfig {
    pub fn get_trajectories(&self) -> &[PathBuf] { &self.trajectories }
    pub fn get_topology(&self) -> &PathBuf { &self.topology }
    pub fn get_plot_kind(&self) -> PlotKind { self.plot_kind }
    pub fn get_save(&self) -> bool { self.save }
    pub fn get_stride(&self) -> usize { self.stride }
    pub fn get_chunk(&self) -> usize { self.chunk }
    pub fn get_title(&self) -> &str { &self.title }
    pub fn get_dpi(&self) -> u32 { self.dpi }
    pub fn get_features(&self) -> FeatureKind { self.features }
    pub fn get_residues(&self) -> Option<&str> { self.residues.as_deref() }
    pub fn get_color_by_time(&self) -> bool { self.color_by_time }
    pub fn get_projection_fname(&self) -> Option<&PathBuf> { self.projection_fname.as_ref() }
    pub fn get_caption(&self) -> Option<&str> { self.caption.as_deref() }
}


impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            trajectories: vec![
                PathBuf::from("../traj/000-050ns_run1.dcd"),
                PathBuf::from("../traj/050-100ns_run1.dcd"),
            ],
            topology: PathBuf::from("../system.prmtop"),
            plot_kind: PlotKind::Hexbin,
            save: true,
            stride: 1,
            chunk: 50,
            title: default_title(),
            dpi: DEFAULT_DPI,
            features: FeatureKind::Distances,
            residues: None,
            color_by_time: false,
            projection_fname: None,
            caption: None,
        }
    }
}


impl fmt::Display for PcaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# mdpca config for principal component analysis of MD trajectories")?;
        writeln!(f)?;

        writeln!(f, " {:>20} = {:?}", "trajectories", self.trajectories)?;
        writeln!(f, " {:>20} = {:?}", "topology", self.topology)?;
        writeln!(f, " {:>20} = \"{}\" # scatter or hexbin", "plot_kind", self.plot_kind)?;
        writeln!(f, " {:>20} = {}",   "save", self.save)?;
        writeln!(f, " {:>20} = {}",   "stride", self.stride)?;
        writeln!(f, " {:>20} = {} # frames read per batch", "chunk", self.chunk)?;
        writeln!(f, " {:>20} = {:?}", "title", self.title)?;
        writeln!(f, " {:>20} = {}",   "dpi", self.dpi)?;
        writeln!(f, " {:>20} = \"{}\" # distances or cartesian", "features", self.features)?;

        if let Some(residues) = self.residues.as_ref() {
            writeln!(f, " {:>20} = {:?}", "residues", residues)?;
        } else {
            writeln!(f, "#{:>20} = \"1..50 60\" # residue ids of the alpha carbons", "residues")?;
        }

        writeln!(f, " {:>20} = {}",   "color_by_time", self.color_by_time)?;

        if let Some(fname) = self.projection_fname.as_ref() {
            writeln!(f, " {:>20} = {:?}", "projection_fname", fname)?;
        } else {
            writeln!(f, "#{:>20} = \"projection.dat\"", "projection_fname")?;
        }

        if let Some(caption) = self.caption.as_ref() {
            writeln!(f, " {:>20} = {:?}", "caption", caption)?;
        } else {
            writeln!(f, "#{:>20} = \"\"", "caption")?;
        }

        Ok(())
    }
}


impl AnalysisConfig for PcaConfig {
    fn check_config(&self) -> Result<()> {
        let mut ret = Ok(());

        if self.stride == 0 {
            ret = add_violation(ret, "Field 'stride' must be a positive integer.");
        }

        if self.chunk == 0 {
            ret = add_violation(ret, "Field 'chunk' must be a positive integer.");
        }

        if self.dpi == 0 {
            ret = add_violation(ret, "Field 'dpi' must be a positive integer.");
        }

        if self.trajectories.is_empty() {
            ret = add_violation(ret, "Field 'trajectories' must list at least one file.");
        }

        if self.title.trim().is_empty() {
            ret = add_violation(ret, "Field 'title' cannot be empty.");
        }

        if self.stride > 0 && self.chunk % self.stride != 0 {
            log::warn!("Field 'chunk' ({}) is not a multiple of 'stride' ({}).", self.chunk, self.stride);
        }

        ret
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let txt = r#"
        trajectories = ["run1.dcd", "run2.dcd"]
        topology = "system.prmtop"
        plot_kind = "scatter"
        stride = 2
        chunk = 10
        residues = "1..20"
        color_by_time = true
        "#;

        let actual_cfg: PcaConfig = toml::from_str(txt).unwrap();
        let expect_cfg = PcaConfig {
            trajectories: vec![PathBuf::from("run1.dcd"), PathBuf::from("run2.dcd")],
            topology: PathBuf::from("system.prmtop"),
            plot_kind: PlotKind::Scatter,
            save: false,
            stride: 2,
            chunk: 10,
            title: "PCA".to_string(),
            dpi: 600,
            features: FeatureKind::Distances,
            residues: Some("1..20".to_string()),
            color_by_time: true,
            projection_fname: None,
            caption: None,
        };

        assert_eq!(expect_cfg, actual_cfg);
        assert!(actual_cfg.check_config().is_ok());
    }

    #[test]
    fn test_stride_and_chunk_required() {
        let txt = r#"
        trajectories = ["run1.dcd"]
        topology = "system.prmtop"
        plot_kind = "hexbin"
        chunk = 10
        "#;
        assert!(toml::from_str::<PcaConfig>(txt).is_err());

        let txt = r#"
        trajectories = ["run1.dcd"]
        topology = "system.prmtop"
        plot_kind = "hexbin"
        stride = 1
        "#;
        assert!(toml::from_str::<PcaConfig>(txt).is_err());

        let txt = r#"
        trajectories = ["run1.dcd"]
        topology = "system.prmtop"
        plot_kind = "hexbin"
        stride = 1
        chunk = 1
        nsw = 3
        "#;
        assert!(toml::from_str::<PcaConfig>(txt).is_err());
    }

    #[test]
    fn test_template_parses_back() {
        let cfg = PcaConfig::default();
        let parsed: PcaConfig = toml::from_str(&cfg.to_string()).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn test_check_config() {
        let cfg = PcaConfig {
            stride: 0,
            chunk: 0,
            trajectories: vec![],
            title: " ".to_string(),
            ..PcaConfig::default()
        };
        let err = cfg.check_config().unwrap_err();
        assert_eq!(err.chain().count(), 4);

        let cfg = PcaConfig { stride: 3, chunk: 10, ..PcaConfig::default() };
        assert!(cfg.check_config().is_ok());
    }
}
