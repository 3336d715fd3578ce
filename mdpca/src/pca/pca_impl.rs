use std::fs;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use shared::{
    Array2,
    Context,
    Pca,
    Result,
    log,
    range_parse,
};

use crate::features::{
    CartesianFeatures,
    PairwiseDistances,
    extract_features,
    select_backbone_ca,
};
use crate::loader::TrajectoryLoader;
use crate::plot::{
    output_figure,
    PlotOutput,
    ProjectionPlot,
};
use super::config::{FeatureKind, PcaConfig};


/// Number of principal components kept for plotting.
pub const NCOMPONENTS: usize = 2;


/// Frames of all trajectories projected onto their first principal components.
pub struct PcaProjection {
    pca: Pca,
    points: Array2<f64>,
    times: Vec<f64>,
}


impl PcaProjection {
    pub fn from_config(cfg: &PcaConfig) -> Result<Self> {
        let loader = TrajectoryLoader::new(cfg.get_trajectories(), cfg.get_topology(),
                                           cfg.get_stride(), cfg.get_chunk())?;

        let residues = cfg.get_residues()
            .map(range_parse)
            .transpose()
            .context("Invalid residue range")?;
        let selection = select_backbone_ca(loader.get_topology(), residues.as_deref())?;
        log::info!("Selected {} alpha carbons.", selection.len());

        let features = match cfg.get_features() {
            FeatureKind::Distances => extract_features(&mut PairwiseDistances::new(selection), loader)?,
            FeatureKind::Cartesian => extract_features(&mut CartesianFeatures::new(selection), loader)?,
        };

        let (pca, points) = Pca::fit_transform(features.matrix.view(), NCOMPONENTS)?;
        let ratio = pca.explained_variance_ratio();
        log::info!("Explained variance ratio: PC1 = {:.4}, PC2 = {:.4}, sum = {:.4}",
            ratio[0], ratio[1], ratio.sum());

        Ok(Self { pca, points, times: features.times })
    }


    pub fn get_pca(&self) -> &Pca { &self.pca }
    pub fn get_points(&self) -> &Array2<f64> { &self.points }
    pub fn get_times(&self) -> &[f64] { &self.times }


    /// Write `# time_ps PC1 PC2` followed by one row per frame.
    pub fn write_projection<P>(&self, fname: P) -> Result<()>
    where P: AsRef<Path> {
        let mut out = String::new();
        writeln!(out, "# {:>14} {:>16} {:>16}", "time_ps", "PC1", "PC2")?;
        for (t, row) in self.times.iter().zip(self.points.rows()) {
            writeln!(out, "{:16.4} {:16.8} {:16.8}", t, row[0], row[1])?;
        }
        fs::write(fname.as_ref(), out)
            .with_context(|| format!("Failed to write projection to {:?}", fname.as_ref()))?;
        log::info!("Projection written to {:?}", fname.as_ref());
        Ok(())
    }


    /// Plot the projection, returning the path of the image.
    pub fn plot(&self, cfg: &PcaConfig) -> Result<PathBuf> {
        let mut figure = ProjectionPlot::new(self.points.view(), cfg.get_plot_kind())?
            .with_name(cfg.get_title());
        if cfg.get_color_by_time() {
            figure = figure.with_times(&self.times)?;
        }
        if let Some(caption) = cfg.get_caption() {
            figure = figure.with_caption(caption);
        }

        let output = if cfg.get_save() {
            PlotOutput::save_as(cfg.get_title(), cfg.get_dpi())
        } else {
            PlotOutput::Show
        };
        output_figure(&figure, &output)
    }
}


/// Run the whole analysis: load, featurize, reduce, then write and plot.
pub fn run_pca(cfg: &PcaConfig) -> Result<PathBuf> {
    let projection = PcaProjection::from_config(cfg)?;
    if let Some(fname) = cfg.get_projection_fname() {
        projection.write_projection(fname)?;
    }
    projection.plot(cfg)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use crate::plot::PlotKind;
    use crate::test_utils::*;

    fn config(dir: &Path, features: FeatureKind) -> PcaConfig {
        PcaConfig {
            trajectories: write_trajectories(dir, 3, 10),
            topology: write_topology(dir),
            plot_kind: PlotKind::Hexbin,
            save: true,
            stride: 1,
            chunk: 5,
            title: dir.join("foo").to_string_lossy().into_owned(),
            dpi: 30,
            features,
            ..PcaConfig::default()
        }
    }


    #[test]
    fn test_distance_projection() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), FeatureKind::Distances);
        let projection = PcaProjection::from_config(&cfg).unwrap();

        assert_eq!(projection.get_points().dim(), (30, 2));
        assert_eq!(projection.get_pca().mean().len(), 6);
        assert_eq!(projection.get_times().len(), 30);

        let ratio = projection.get_pca().explained_variance_ratio();
        assert!(ratio[0] >= ratio[1]);
        assert!(ratio.sum() <= 1.0 + 1E-12);
    }


    #[test]
    fn test_cartesian_projection() {
        let dir = tempdir().unwrap();
        let cfg = PcaConfig {
            stride: 2,
            chunk: 4,
            ..config(dir.path(), FeatureKind::Cartesian)
        };
        let projection = PcaProjection::from_config(&cfg).unwrap();
        assert_eq!(projection.get_points().dim(), (15, 2));
        assert_eq!(projection.get_pca().mean().len(), 12);
    }


    #[test]
    fn test_residue_filter() {
        let dir = tempdir().unwrap();
        let cfg = PcaConfig {
            residues: Some("1..3".to_string()),
            ..config(dir.path(), FeatureKind::Distances)
        };
        let projection = PcaProjection::from_config(&cfg).unwrap();
        assert_eq!(projection.get_pca().mean().len(), 3);

        let cfg = PcaConfig {
            residues: Some("5..6".to_string()),
            ..config(dir.path(), FeatureKind::Distances)
        };
        assert!(PcaProjection::from_config(&cfg).is_err());
    }


    #[test]
    fn test_save_with_title() {
        let dir = tempdir().unwrap();
        let cfg = PcaConfig {
            projection_fname: Some(dir.path().join("projection.dat")),
            color_by_time: true,
            plot_kind: PlotKind::Scatter,
            ..config(dir.path(), FeatureKind::Distances)
        };

        let image = run_pca(&cfg).unwrap();
        assert_eq!(image, dir.path().join("foo.png"));
        assert!(image.is_file());

        let table = fs::read_to_string(dir.path().join("projection.dat")).unwrap();
        let mut lines = table.lines();
        let header = lines.next().unwrap().split_whitespace().collect::<Vec<_>>();
        assert_eq!(header, vec!["#", "time_ps", "PC1", "PC2"]);
        let rows = lines.map(|l| l.split_whitespace().count()).collect::<Vec<_>>();
        assert_eq!(rows.len(), 30);
        assert!(rows.iter().all(|&n| n == 3));
    }
}
