use plotters::style::RGBColor;


// evenly spaced anchors, linearly interpolated in between
const VIRIDIS: &[[u8; 3]] = &[
    [ 68,   1,  84],
    [ 71,  39, 117],
    [ 62,  73, 137],
    [ 49, 103, 142],
    [ 38, 130, 142],
    [ 31, 157, 138],
    [ 53, 183, 121],
    [109, 205,  89],
    [180, 222,  44],
    [253, 231,  37],
];

const GIST_EARTH: &[[u8; 3]] = &[
    [  0,   0,   0],
    [ 22,  30, 119],
    [ 36,  76, 126],
    [ 48, 114, 130],
    [ 60, 140, 118],
    [ 76, 156,  92],
    [110, 168,  80],
    [152, 178,  88],
    [185, 176, 100],
    [209, 184, 158],
    [253, 250, 250],
];


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    /// Reversed `gist_earth`: white for low values, dark blue for high ones.
    GistEarthR,
}


impl Colormap {
    /// Color of `t`, clamped into `[0, 1]`.
    pub fn color(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Viridis    => interpolate(VIRIDIS, t),
            Colormap::GistEarthR => interpolate(GIST_EARTH, 1.0 - t),
        }
    }

    /// Color of `value` normalized linearly into `[vmin, vmax]`.
    pub fn color_in(&self, value: f64, vmin: f64, vmax: f64) -> RGBColor {
        let span = vmax - vmin;
        let t = if span > 0.0 { (value - vmin) / span } else { 0.0 };
        self.color(t)
    }
}


fn interpolate(anchors: &[[u8; 3]], t: f64) -> RGBColor {
    let pos = t * (anchors.len() - 1) as f64;
    let i = (pos.floor() as usize).min(anchors.len() - 2);
    let frac = pos - i as f64;

    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (anchors[i], anchors[i + 1]);
    RGBColor(lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Colormap::Viridis.color(0.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.color(1.0), RGBColor(253, 231, 37));
        assert_eq!(Colormap::Viridis.color(7.0), RGBColor(253, 231, 37));
        assert_eq!(Colormap::Viridis.color(f64::NAN), RGBColor(68, 1, 84));
        assert_eq!(Colormap::GistEarthR.color(0.0), RGBColor(253, 250, 250));
        assert_eq!(Colormap::GistEarthR.color(1.0), RGBColor(0, 0, 0));
    }

    #[test]
    fn test_interpolation() {
        let mid = interpolate(&[[0, 0, 0], [200, 100, 50]], 0.5);
        assert_eq!(mid, RGBColor(100, 50, 25));
        assert_eq!(Colormap::Viridis.color_in(5.0, 5.0, 5.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.color_in(3.0, 1.0, 3.0), RGBColor(253, 231, 37));
    }
}
