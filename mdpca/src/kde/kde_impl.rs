use std::fs;
use std::path::{Path, PathBuf};

use shared::{
    AnalysisError,
    Array2,
    GaussianKde,
    Result,
    log,
    numeric_methods::linspace,
};

use crate::plot::{
    open_viewer,
    render_to_file,
    DensityMap,
};
use super::config::KdeConfig;


/// Second and third columns of a projection table, the first line being a header.
pub fn read_table<P>(fname: P) -> Result<(Vec<f64>, Vec<f64>)>
where P: AsRef<Path> {
    let fname = fname.as_ref();
    shared::ensure_file(fname)?;
    let raw = fs::read_to_string(fname)?;

    let mut x = vec![];
    let mut y = vec![];
    for (iline, line) in raw.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parse = |s: Option<&str>| -> Result<f64> {
            let s = s.ok_or_else(|| AnalysisError::format(fname,
                format!("line {} holds less than three columns", iline + 1)))?;
            s.parse::<f64>()
                .map_err(|e| AnalysisError::format(fname, format!("line {}: {:?} {}", iline + 1, s, e)).into())
        };
        let mut cols = line.split_whitespace().skip(1);
        x.push(parse(cols.next())?);
        y.push(parse(cols.next())?);
    }

    if x.is_empty() {
        return Err(AnalysisError::insufficient(format!("{:?} holds no data rows", fname)).into());
    }
    Ok((x, y))
}


/// Common limits of all tables, always including the origin, widened by `padding`.
pub fn common_bounds(tables: &[(Vec<f64>, Vec<f64>)], padding: f64) -> (f64, f64, f64, f64) {
    let (mut xmin, mut xmax, mut ymin, mut ymax) = (0f64, 0f64, 0f64, 0f64);
    for (x, y) in tables.iter() {
        for &v in x.iter() {
            xmin = xmin.min(v);
            xmax = xmax.max(v);
        }
        for &v in y.iter() {
            ymin = ymin.min(v);
            ymax = ymax.max(v);
        }
    }
    (xmin - padding, xmax + padding, ymin - padding, ymax + padding)
}


/// Density of the points on a `n x n` grid spanning `extent`, indexed `[ix, iy]`.
pub fn density_grid(x: &[f64], y: &[f64], extent: (f64, f64, f64, f64), n: usize) -> Result<Array2<f64>> {
    let dataset = Array2::from_shape_fn((2, x.len()), |(i, j)| if i == 0 { x[j] } else { y[j] });
    let kde = GaussianKde::new(dataset.view())?;

    let xs: Vec<f64> = linspace(extent.0, extent.1, n);
    let ys: Vec<f64> = linspace(extent.2, extent.3, n);
    let positions = Array2::from_shape_fn((2, n * n), |(i, k)| {
        if i == 0 { xs[k / n] } else { ys[k % n] }
    });

    let density = kde.evaluate(positions.view())?;
    Ok(density.into_shape((n, n))?)
}


/// File name without `myevecs` and `.dat`, e.g. `myevecs000-050ns_run1.dat` gives `000-050ns_run1`.
pub fn title_from_fname(fname: &Path) -> String {
    fname.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .replace("myevecs", "")
        .replace(".dat", "")
}


pub fn image_fname(fname: &Path) -> PathBuf {
    let name = fname.file_name()
        .map(|s| s.to_string_lossy().replace(".dat", ""))
        .unwrap_or_default();
    fname.with_file_name(format!("{}.png", name))
}


/// Render one density map per input, returning the images written.
pub fn run_kde(cfg: &KdeConfig) -> Result<Vec<PathBuf>> {
    let tables = cfg.get_inputs()
        .iter()
        .map(read_table)
        .collect::<Result<Vec<_>>>()?;
    let extent = common_bounds(&tables, cfg.get_padding());
    log::info!("Density maps span x = [{:.3}, {:.3}], y = [{:.3}, {:.3}]", extent.0, extent.1, extent.2, extent.3);

    let mut images = vec![];
    for (fname, (x, y)) in cfg.get_inputs().iter().zip(tables.iter()) {
        log::info!("Estimating density of {} points from {:?}", x.len(), fname);
        let values = density_grid(x, y, extent, cfg.get_grid_points())?;

        let mut map = DensityMap::new(values, extent, &title_from_fname(fname))?;
        if cfg.get_show_points() {
            map = map.with_points(x, y);
        }

        let image = image_fname(fname);
        render_to_file(&map, &image, cfg.get_dpi())?;
        if cfg.get_show() {
            open_viewer(&image);
        }
        images.push(image);
    }
    Ok(images)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use tempfile::tempdir;

    fn write_table(dir: &Path, name: &str, shift: f64) -> PathBuf {
        let mut s = String::from("#   time_ps   PC1   PC2\n");
        for i in 0 .. 60 {
            let t = i as f64;
            writeln!(s, "{:.1} {:.6} {:.6}", t * 2.0, (0.3 * t).sin() * 4.0 + shift, (0.7 * t).cos() * 2.0 - shift).unwrap();
        }
        let fname = dir.join(name);
        fs::write(&fname, s).unwrap();
        fname
    }


    #[test]
    fn test_read_table() {
        let dir = tempdir().unwrap();
        let fname = write_table(dir.path(), "myevecs000-050ns_run1.dat", 0.0);
        let (x, y) = read_table(&fname).unwrap();
        assert_eq!(x.len(), 60);
        assert_eq!(y.len(), 60);
        assert!((y[0] - 2.0).abs() < 1E-12);

        let bad = dir.path().join("bad.dat");
        fs::write(&bad, "header\n1.0 2.0\n").unwrap();
        assert!(read_table(&bad).is_err());

        fs::write(&bad, "header\n").unwrap();
        assert!(read_table(&bad).is_err());
        assert!(read_table(dir.path().join("missing.dat")).is_err());
    }


    #[test]
    fn test_bounds_include_origin() {
        let tables = vec![
            (vec![3.0, 5.0], vec![2.0, 4.0]),
            (vec![4.0, 7.5], vec![1.0, 9.0]),
        ];
        assert_eq!(common_bounds(&tables, 10.0), (-10.0, 17.5, -10.0, 19.0));
    }


    #[test]
    fn test_names() {
        assert_eq!(title_from_fname(Path::new("dir/myevecs000-050ns_run1.dat")), "000-050ns_run1");
        assert_eq!(image_fname(Path::new("dir/myevecs000-050ns_run1.dat")), PathBuf::from("dir/myevecs000-050ns_run1.png"));
        assert_eq!(image_fname(Path::new("proj.txt")), PathBuf::from("proj.txt.png"));
    }


    #[test]
    fn test_density_grid_normalised() {
        let x = (0 .. 50).map(|i| (i as f64 * 0.9).sin()).collect::<Vec<_>>();
        let y = (0 .. 50).map(|i| (i as f64 * 0.4).cos()).collect::<Vec<_>>();
        let n = 120;
        let extent = (-8.0, 8.0, -8.0, 8.0);
        let grid = density_grid(&x, &y, extent, n).unwrap();
        assert_eq!(grid.dim(), (n, n));

        let d = 16.0 / (n - 1) as f64;
        let integral = grid.sum() * d * d;
        assert!((integral - 1.0).abs() < 1E-2, "integral = {}", integral);
    }


    #[test]
    fn test_run_kde() {
        let dir = tempdir().unwrap();
        let inputs = vec![
            write_table(dir.path(), "myevecs000-050ns_run1.dat", 0.0),
            write_table(dir.path(), "myevecs000-050ns_run2.dat", 3.0),
        ];
        let cfg = KdeConfig {
            inputs,
            grid_points: 30,
            dpi: 30,
            show_points: true,
            ..KdeConfig::default()
        };

        let images = run_kde(&cfg).unwrap();
        assert_eq!(images, vec![
            dir.path().join("myevecs000-050ns_run1.png"),
            dir.path().join("myevecs000-050ns_run2.png"),
        ]);
        assert!(images.iter().all(|p| p.is_file()));
    }
}
