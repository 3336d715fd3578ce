use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shared::{
    log,
    Result,
};

use crate::OptProcess;
use crate::core::AnalysisConfig;
use crate::plot::SHOW_DPI;
use crate::kde;


#[derive(Debug, Parser)]
/// Gaussian kernel density maps of PCA projections.
///
/// Each input is a table as written by `mdpca pca --write-projection`: one
/// header line, then the time and the first two components per row. All maps
/// share the same limits, and `<input without .dat>.png` is written per input.
pub struct KdeCommand {
    #[arg(required_unless_present_any=["config", "generate"], num_args=1..)]
    /// Projection tables, e.g. "myevecs000-050ns_run1.dat".
    inputs: Vec<PathBuf>,

    #[arg(long)]
    /// Also open each image with the image viewer.
    show: bool,

    #[arg(long, default_value_t=SHOW_DPI)]
    /// Resolution of the images.
    dpi: u32,

    #[arg(long, default_value_t=100)]
    /// Number of grid points along each axis.
    grid_points: usize,

    #[arg(long, default_value_t=10.0)]
    /// Margin added around the data limits.
    padding: f64,

    #[arg(long)]
    /// Draw the samples on top of the density.
    points: bool,

    #[arg(short='n', long, default_value_t=1)]
    /// Number of threads for the density evaluation.
    ///
    /// If 0 is set, it will fall back to the number of logical CPU cores of your machine.
    nthreads: usize,

    #[arg(short='c', long, aliases=["cfg", "conf"], conflicts_with="inputs")]
    /// Read the settings from a config file instead of the command line.
    ///
    /// Aliases: "cfg", "conf".
    config: Option<PathBuf>,

    #[arg(long, value_enum, alias="gen")]
    /// Generate auxiliary files for the analysis.
    ///
    /// Alias: "gen"
    generate: Option<TemplateGenerator>,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TemplateGenerator {
    #[value(aliases=["config", "cfg", "conf"])]
    /// Generate config template for density maps. Aliases: "config", "cfg", "conf".
    ConfigTemplate,
}


impl KdeCommand {
    fn to_config(&self) -> Result<kde::KdeConfig> {
        if let Some(fname) = self.config.as_ref() {
            return kde::KdeConfig::from_file(fname);
        }

        let cfg = kde::KdeConfig {
            inputs: self.inputs.clone(),
            grid_points: self.grid_points,
            padding: self.padding,
            show: self.show,
            dpi: self.dpi,
            show_points: self.points,
        };
        cfg.check_config()?;
        Ok(cfg)
    }
}


impl OptProcess for KdeCommand {
    fn process(&self) -> Result<()> {
        use TemplateGenerator::*;

        if let Some(g) = self.generate {
            return match g {
                ConfigTemplate => kde::KdeConfig::default().to_file("kde_config_template.toml"),
            }
        }

        let cfg = self.to_config()?;
        cfg.print_to_log();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.nthreads).build()?;
        let images = pool.install(|| kde::run_kde(&cfg))?;
        log::info!("{} density map(s) written.", images.len());
        Ok(())
    }
}
