use std::path::Path;

pub use anyhow::{
    self,
    Result,
    Context,
    bail,
};
pub use ndarray::{
    self,
    Array1,
    Array2,
};
pub use nalgebra;
pub use regex::Regex;
pub use log::{
    self,
    warn,
    info,
    debug,
    error,
};

pub mod error;
pub use error::AnalysisError;

pub mod numeric_methods;
pub mod pca;
pub use pca::Pca;
pub mod kde;
pub use kde::GaussianKde;

// Convenient types
pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix


/// Fails with `AnalysisError::FileNotFound` unless `path` points to an existing file.
pub fn ensure_file<P>(path: P) -> Result<()>
where P: AsRef<Path> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::FileNotFound(path.to_path_buf()).into());
    }
    Ok(())
}


/// Parse string containing range and integers into `Vec<i32>`
///
/// Valid strings can be `"1..5 12 -1..3 0"` will be parsed as
/// `vec![1, 2, 3, 4, 5, 12, -1, 1, 2, 3]`, `0` is filtered out.
/// If only `0` is supplied, `Ok(vec![0])` is return
pub fn range_parse(input: &str) -> Result<Vec<i32>> {
    if input.trim() == "0" {
        return Ok(vec![0]);
    }

    let mut ret = vec![];

    let re_range = Regex::new(r"^(-?\d+)\.\.(-?\d+)$")?;
    let re_digit = Regex::new(r"^-?\d+$")?;

    for s in input.split_ascii_whitespace() {
        if re_digit.is_match(s) {
            ret.push(s.parse::<i32>()?);
        } else if let Some(m) = re_range.captures(s) {
            let start = m[1].parse::<i32>()?;
            let end   = m[2].parse::<i32>()?;

            if start > end {
                bail!("[RANGE_PARSE]: start is greater than end in token \'{}\'", s);
            }

            ret.extend(start ..= end);
        } else {
            bail!("[RANGE_PARSE]: token \'{}\' is invalid, cannot be parsed as range or integer", s);
        }
    }

    let ret = ret.into_iter().filter(|x| *x != 0).collect::<Vec<_>>();

    Ok(ret)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_range_parse() {
        assert_eq!(range_parse("1..6").unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(range_parse("9..12").unwrap(), vec![9, 10, 11, 12]);
        assert_eq!(range_parse("-1..5").unwrap(), vec![-1, 1, 2, 3, 4, 5]);
        assert_eq!(range_parse("-10..-5").unwrap(), vec![-10, -9, -8, -7, -6, -5]);
        assert_eq!(range_parse("-10..-9 4    29 \n  -5").unwrap(), vec![-10, -9, 4, 29, -5]);
        assert_eq!(range_parse(" 0   ").unwrap(), vec![0]);
        assert!(range_parse("5..-1").is_err());
        assert!(range_parse("..-1").is_err());
        assert!(range_parse("..10").is_err());
        assert!(range_parse("1 .. 10").is_err());
        assert!(range_parse("1-2..5").is_err());
    }

    #[test]
    fn test_ensure_file() {
        let err = ensure_file("surely/not/here.prmtop").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::FileNotFound(_))
        ));
    }
}
