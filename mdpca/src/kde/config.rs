use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use shared::Result;

use crate::core::config::{AnalysisConfig, add_violation};
use crate::plot::SHOW_DPI;


fn default_grid_points() -> usize { 100 }
fn default_padding() -> f64 { 10.0 }
fn default_dpi() -> u32 { SHOW_DPI }


#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KdeConfig {
    pub(super) inputs: Vec<PathBuf>,

    #[serde(default = "default_grid_points")]
    pub(super) grid_points: usize,

    #[serde(default = "default_padding")]
    pub(super) padding: f64,

    #[serde(default)]
    pub(super) show: bool,

    #[serde(default = "default_dpi")]
    pub(super) dpi: u32,

    #[serde(default)]
    pub(super) show_points: bool,
}


impl KdeConfig {
    pub fn get_inputs(&self) -> &[PathBuf] { &self.inputs }
    pub fn get_grid_points(&self) -> usize { self.grid_points }
    pub fn get_padding(&self) -> f64 { self.padding }
    pub fn get_show(&self) -> bool { self.show }
    pub fn get_dpi(&self) -> u32 { self.dpi }
    pub fn get_show_points(&self) -> bool { self.show_points }
}


impl Default for KdeConfig {
    fn default() -> Self {
        KdeConfig {
            inputs: vec![
                PathBuf::from("myevecs000-050ns_run1.dat"),
                PathBuf::from("myevecs000-050ns_run2.dat"),
            ],
            grid_points: default_grid_points(),
            padding: default_padding(),
            show: false,
            dpi: SHOW_DPI,
            show_points: false,
        }
    }
}


impl fmt::Display for KdeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# mdpca config for kernel density maps of PCA projections")?;
        writeln!(f)?;

        writeln!(f, " {:>20} = {:?}", "inputs", self.inputs)?;
        writeln!(f, " {:>20} = {} # along each axis", "grid_points", self.grid_points)?;
        writeln!(f, " {:>20} = {:?} # added to the data limits", "padding", self.padding)?;
        writeln!(f, " {:>20} = {}",   "show", self.show)?;
        writeln!(f, " {:>20} = {}",   "dpi", self.dpi)?;
        writeln!(f, " {:>20} = {}",   "show_points", self.show_points)?;

        Ok(())
    }
}


impl AnalysisConfig for KdeConfig {
    fn check_config(&self) -> Result<()> {
        let mut ret = Ok(());

        if self.inputs.is_empty() {
            ret = add_violation(ret, "Field 'inputs' must list at least one file.");
        }

        if self.grid_points < 2 {
            ret = add_violation(ret, "Field 'grid_points' must be at least 2.");
        }

        if !self.padding.is_finite() || self.padding < 0.0 {
            ret = add_violation(ret, "Field 'padding' must be a non-negative number.");
        }

        if self.dpi == 0 {
            ret = add_violation(ret, "Field 'dpi' must be a positive integer.");
        }

        ret
    }
}
