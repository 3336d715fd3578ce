//! Rendering of PCA projections and density maps to raster or SVG images.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::ValueEnum;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use serde::Deserialize;

use shared::{
    ndarray::{Array2, ArrayView2},
    anyhow::ensure,
    log,
    Result,
};

pub mod colormap;
pub use colormap::Colormap;

pub mod hexbin;
pub use hexbin::HexBins;


/// Figure size in inches, the image is this times dpi pixels large.
pub const FIGURE_SIZE: (f64, f64) = (6.4, 4.8);
pub const DEFAULT_DPI: u32 = 600;
pub const SHOW_DPI: u32 = 100;
pub const HEXBIN_GRIDSIZE: usize = 100;

const MARKER_COLOR: RGBColor = RGBColor(31, 119, 180);


#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    /// One `x` marker per frame.
    Scatter,
    /// Hexagonal binning with logarithmic color scale.
    Hexbin,
}


impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            PlotKind::Scatter => "scatter",
            PlotKind::Hexbin  => "hexbin",
        })
    }
}


#[derive(Clone, Debug, PartialEq)]
pub enum PlotOutput {
    Save {
        path: PathBuf,
        dpi: u32,
    },
    /// Render to the temporary directory and open the platform image viewer.
    Show,
}


impl PlotOutput {
    pub fn save_as(title: &str, dpi: u32) -> Self {
        PlotOutput::Save { path: output_fname(title), dpi }
    }
}


/// `title` with a `.png` extension, unless it already carries one.
pub fn output_fname(title: &str) -> PathBuf {
    let path = PathBuf::from(title);
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("png")
    }
}


pub fn figure_pixels(dpi: u32) -> (u32, u32) {
    (
        (FIGURE_SIZE.0 * dpi as f64).round() as u32,
        (FIGURE_SIZE.1 * dpi as f64).round() as u32,
    )
}


pub trait Figure {
    /// Short name, used for the file name when the figure is only shown.
    fn name(&self) -> &str;

    /// Draw onto `root`; lengths are given at 100 dpi and multiplied by `scale`.
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()>
    where DB: DrawingBackend,
          DB::ErrorType: 'static;
}


/// Render `figure` into `path`, SVG if the extension says so and a bitmap otherwise.
pub fn render_to_file<F, P>(figure: &F, path: P, dpi: u32) -> Result<()>
where F: Figure,
      P: AsRef<Path> {
    ensure!(dpi >= 1, "Resolution must be at least 1 dpi.");
    let path = path.as_ref();
    let size = figure_pixels(dpi);
    let scale = dpi as f64 / SHOW_DPI as f64;

    let is_svg = path.extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        figure.draw(&root, scale)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        figure.draw(&root, scale)?;
        root.present()?;
    }

    log::info!("Figure written to {:?} ({}x{} pixels).", path, size.0, size.1);
    Ok(())
}


/// Save or show `figure`, returning the path of the image written.
pub fn output_figure<F>(figure: &F, output: &PlotOutput) -> Result<PathBuf>
where F: Figure {
    match output {
        PlotOutput::Save { path, dpi } => {
            render_to_file(figure, path, *dpi)?;
            Ok(path.clone())
        },
        PlotOutput::Show => {
            let stem = figure.name()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect::<String>();
            let path = std::env::temp_dir().join(format!("mdpca_{}_{}.png", stem, std::process::id()));
            render_to_file(figure, &path, SHOW_DPI)?;
            open_viewer(&path);
            Ok(path)
        },
    }
}


pub(crate) fn open_viewer(path: &Path) {
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut cmd = Command::new("xdg-open");

    match cmd.arg(path).spawn() {
        Ok(_) => log::info!("Opening {:?} with the image viewer.", path),
        Err(e) => log::warn!("Cannot launch an image viewer ({}), the figure is kept at {:?}.", e, path),
    }
}


fn px(scale: f64, v: f64) -> u32 {
    (v * scale).round().max(1.0) as u32
}


fn font(scale: f64, pt: f64) -> (&'static str, f64) {
    ("sans-serif", pt * scale)
}


fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}


/// Data limits with 5% margins on both sides.
fn axis_range(values: &[f64]) -> std::ops::Range<f64> {
    let (lo, hi) = min_max(values);
    if !lo.is_finite() || !hi.is_finite() {
        return -1.0 .. 1.0;
    }
    let span = hi - lo;
    if span <= 0.0 {
        return lo - 1.0 .. hi + 1.0;
    }
    lo - 0.05 * span .. hi + 0.05 * span
}


fn chart_builder<'a, 'b, DB>(area: &'a DrawingArea<DB, Shift>, caption: Option<&'b str>, scale: f64) -> ChartBuilder<'a, 'b, DB>
where DB: DrawingBackend {
    let mut builder = ChartBuilder::on(area);
    builder
        .margin(px(scale, 12.0))
        .x_label_area_size(px(scale, 40.0))
        .y_label_area_size(px(scale, 55.0));
    if let Some(caption) = caption {
        builder.caption(caption, font(scale, 14.0));
    }
    builder
}


fn draw_axes<DB>(chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
                 xdesc: &str, ydesc: &str, scale: f64) -> Result<()>
where DB: DrawingBackend,
      DB::ErrorType: 'static {
    chart.configure_mesh()
        .disable_mesh()
        .x_desc(xdesc)
        .y_desc(ydesc)
        .x_labels(8)
        .y_labels(8)
        .label_style(font(scale, 10.0))
        .axis_desc_style(font(scale, 11.0))
        .draw()?;
    Ok(())
}


fn split_for_colorbar<DB>(root: &DrawingArea<DB, Shift>) -> (DrawingArea<DB, Shift>, DrawingArea<DB, Shift>)
where DB: DrawingBackend {
    let (width, _) = root.dim_in_pixel();
    root.split_horizontally((width as f64 * 0.84).round() as u32)
}


/// Vertical color scale next to a chart drawn by `chart_builder`.
fn draw_colorbar<DB>(area: &DrawingArea<DB, Shift>, cmap: Colormap, range: (f64, f64),
                     label: &str, has_caption: bool, scale: f64) -> Result<()>
where DB: DrawingBackend,
      DB::ErrorType: 'static {
    const NSTEPS: usize = 256;

    let (vmin, vmax) = if range.1 > range.0 { range } else { (range.0 - 0.5, range.0 + 0.5) };
    let top = if has_caption { 12.0 + 14.0 * 1.6 } else { 12.0 };

    let mut chart = ChartBuilder::on(area)
        .margin_top(px(scale, top))
        .margin_bottom(px(scale, 12.0))
        .margin_left(px(scale, 4.0))
        .margin_right(px(scale, 4.0))
        .x_label_area_size(px(scale, 40.0))
        .right_y_label_area_size(px(scale, 55.0))
        .build_cartesian_2d(0f64 .. 1f64, vmin .. vmax)?;

    let step = (vmax - vmin) / NSTEPS as f64;
    chart.draw_series((0 .. NSTEPS).map(|k| {
        let y0 = vmin + k as f64 * step;
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], cmap.color_in(y0 + 0.5 * step, vmin, vmax).filled())
    }))?;

    chart.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc(label)
        .y_labels(6)
        .label_style(font(scale, 10.0))
        .axis_desc_style(font(scale, 11.0))
        .draw()?;
    Ok(())
}


/// Two-dimensional PCA projection, one point per frame.
#[derive(Clone, Debug)]
pub struct ProjectionPlot {
    x: Vec<f64>,
    y: Vec<f64>,
    kind: PlotKind,
    times: Option<Vec<f64>>,
    caption: Option<String>,
    name: String,
}


impl ProjectionPlot {
    /// Plot the first two columns of `points`.
    pub fn new(points: ArrayView2<f64>, kind: PlotKind) -> Result<Self> {
        ensure!(points.ncols() >= 2, "Projection needs at least two components to be plotted, got {}.", points.ncols());
        ensure!(points.nrows() >= 1, "Projection holds no points.");
        Ok(Self {
            x: points.column(0).to_vec(),
            y: points.column(1).to_vec(),
            kind,
            times: None,
            caption: None,
            name: "PCA".to_string(),
        })
    }

    /// Color the scatter markers by `times`, drawing a `Time [ps]` color bar.
    pub fn with_times(mut self, times: &[f64]) -> Result<Self> {
        ensure!(times.len() == self.x.len(), "Got {} times for {} points.", times.len(), self.x.len());
        self.times = Some(times.to_vec());
        Ok(self)
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }


    fn draw_scatter<DB>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()>
    where DB: DrawingBackend,
          DB::ErrorType: 'static {
        let marker = px(scale, 3.0) as i32;
        let stroke = px(scale, 1.0);

        let split = self.times.as_ref().map(|_| split_for_colorbar(root));
        let plot_area = match split.as_ref() {
            Some((area, _)) => area,
            None => root,
        };

        let mut chart = chart_builder(plot_area, self.caption.as_deref(), scale)
            .build_cartesian_2d(axis_range(&self.x), axis_range(&self.y))?;
        draw_axes(&mut chart, "PC1 (Å)", "PC2 (Å)", scale)?;

        let points = self.x.iter().copied().zip(self.y.iter().copied());
        match (self.times.as_ref(), split.as_ref()) {
            (Some(times), Some((_, bar))) => {
                let (tmin, tmax) = min_max(times);
                chart.draw_series(points.zip(times.iter()).map(|(p, &t)| {
                    Cross::new(p, marker, Colormap::Viridis.color_in(t, tmin, tmax).stroke_width(stroke))
                }))?;
                draw_colorbar(bar, Colormap::Viridis, (tmin, tmax), "Time [ps]", self.caption.is_some(), scale)?;
            },
            _ => {
                chart.draw_series(points.map(|p| Cross::new(p, marker, MARKER_COLOR.stroke_width(stroke))))?;
            },
        }
        Ok(())
    }


    fn draw_hexbin<DB>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()>
    where DB: DrawingBackend,
          DB::ErrorType: 'static {
        let bins = HexBins::compute(&self.x, &self.y, HEXBIN_GRIDSIZE, 1)?;
        let (plot_area, bar_area) = split_for_colorbar(root);

        let (xmin, xmax) = bins.xrange();
        let (ymin, ymax) = bins.yrange();
        let mut chart = chart_builder(&plot_area, self.caption.as_deref(), scale)
            .build_cartesian_2d(xmin .. xmax, ymin .. ymax)?;
        draw_axes(&mut chart, "PC1 (Å)", "PC2 (Å)", scale)?;

        let lmin = (bins.min_count() as f64).log10();
        let lmax = (bins.max_count() as f64).log10();
        chart.draw_series(bins.cells().iter().map(|cell| {
            let color = Colormap::Viridis.color_in((cell.count as f64).log10(), lmin, lmax);
            Polygon::new(bins.hexagon(cell), color.filled())
        }))?;

        draw_colorbar(&bar_area, Colormap::Viridis, (lmin, lmax), "log10(N)", self.caption.is_some(), scale)
    }
}


impl Figure for ProjectionPlot {
    fn name(&self) -> &str { &self.name }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()>
    where DB: DrawingBackend,
          DB::ErrorType: 'static {
        root.fill(&WHITE)?;
        match self.kind {
            PlotKind::Scatter => self.draw_scatter(root, scale),
            PlotKind::Hexbin  => self.draw_hexbin(root, scale),
        }
    }
}


/// Density evaluated on a regular grid, drawn as an image over `extent`.
#[derive(Clone, Debug)]
pub struct DensityMap {
    /// `values[[i, j]]` is the density at the i-th x and the j-th y grid line.
    values: Array2<f64>,
    extent: (f64, f64, f64, f64),
    title: String,
    points: Option<(Vec<f64>, Vec<f64>)>,
}


impl DensityMap {
    /// `extent` is `(xmin, xmax, ymin, ymax)`.
    pub fn new(values: Array2<f64>, extent: (f64, f64, f64, f64), title: &str) -> Result<Self> {
        ensure!(values.nrows() >= 1 && values.ncols() >= 1, "Density grid is empty.");
        ensure!(extent.1 > extent.0 && extent.3 > extent.2, "Invalid extent of density map: {:?}", extent);
        Ok(Self { values, extent, title: title.to_string(), points: None })
    }

    /// Overlay the samples the density was estimated from.
    pub fn with_points(mut self, x: &[f64], y: &[f64]) -> Self {
        self.points = Some((x.to_vec(), y.to_vec()));
        self
    }
}


impl Figure for DensityMap {
    fn name(&self) -> &str { &self.title }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()>
    where DB: DrawingBackend,
          DB::ErrorType: 'static {
        root.fill(&WHITE)?;

        let (xmin, xmax, ymin, ymax) = self.extent;
        let mut chart = chart_builder(root, Some(self.title.as_str()), scale)
            .build_cartesian_2d(xmin .. xmax, ymin .. ymax)?;
        draw_axes(&mut chart, "PCA1", "PCA2", scale)?;

        let (nx, ny) = self.values.dim();
        let dx = (xmax - xmin) / nx as f64;
        let dy = (ymax - ymin) / ny as f64;
        let (vmin, vmax) = self.values.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        chart.draw_series((0 .. nx).flat_map(|i| (0 .. ny).map(move |j| (i, j))).map(|(i, j)| {
            let x0 = xmin + i as f64 * dx;
            let y0 = ymin + j as f64 * dy;
            let color = Colormap::GistEarthR.color_in(self.values[[i, j]], vmin, vmax);
            Rectangle::new([(x0, y0), (x0 + dx, y0 + dy)], color.filled())
        }))?;

        if let Some((x, y)) = self.points.as_ref() {
            let size = px(scale, 1.0) as i32;
            chart.draw_series(x.iter().zip(y.iter()).map(|(&x, &y)| Circle::new((x, y), size, BLACK.filled())))?;
        }
        Ok(())
    }
}
