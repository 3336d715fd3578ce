use std::fs;
use std::path::{Path, PathBuf};

use shared::{
    Context,
    Result,
    bail,
    log,
};


/// Default output of an extraction, `pdbs/<name up to the first dot>.pdb`.
pub fn default_outfile(traj: &Path) -> PathBuf {
    let name = traj.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    Path::new("pdbs").join(format!("{}.pdb", stem))
}


/// cpptraj commands writing frames `first ..= last` (1-based) of `traj` to `outfile`.
///
/// A stride above 1 is passed on as the trajin offset.
pub fn cpptraj_script(traj: &Path, topology: &Path, frames: (usize, usize), stride: usize, outfile: &Path) -> Result<String> {
    let (first, last) = frames;
    if first == 0 || last < first {
        bail!("Invalid frame range {} to {}, frames are counted from 1.", first, last);
    }
    if stride == 0 {
        bail!("Stride must be a positive integer.");
    }

    let mut trajin = format!("trajin {} {} {}", traj.display(), first, last);
    if stride > 1 {
        trajin.push_str(&format!(" {}", stride));
    }

    let cmds = [
        format!("parm {}", topology.display()),
        trajin,
        format!("trajout {}", outfile.display()),
        "run".to_string(),
    ];
    Ok(cmds.join("\n") + "\n")
}


/// Write one `<name>.cpptraj` script per trajectory into `dir`, returning their paths.
pub fn write_cpptraj_scripts<P>(dir: P, trajs: &[PathBuf], topology: &Path, frames: (usize, usize), stride: usize) -> Result<Vec<PathBuf>>
where P: AsRef<Path> {
    let dir = dir.as_ref();
    if trajs.is_empty() {
        bail!("At least one trajectory is needed for a cpptraj script.");
    }

    let mut ret = vec![];
    for traj in trajs.iter() {
        let outfile = default_outfile(traj);
        let script = cpptraj_script(traj, topology, frames, stride, &outfile)?;

        let fname = dir.join(outfile.with_extension("cpptraj").file_name().unwrap_or_default());
        fs::write(&fname, script)
            .with_context(|| format!("Failed to write cpptraj script {:?}", fname))?;
        log::info!("cpptraj script for frames {} to {} of {:?} written to {:?}", frames.0, frames.1, traj, fname);
        ret.push(fname);
    }
    Ok(ret)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_script() {
        let script = cpptraj_script(Path::new("run1.nc"), Path::new("system.prmtop"), (1, 500), 1,
                                    &default_outfile(Path::new("run1.nc"))).unwrap();
        assert_eq!(script, "parm system.prmtop\ntrajin run1.nc 1 500\ntrajout pdbs/run1.pdb\nrun\n");

        let script = cpptraj_script(Path::new("run1.nc"), Path::new("system.prmtop"), (10, 20), 5,
                                    Path::new("out.dcd")).unwrap();
        assert!(script.contains("trajin run1.nc 10 20 5\n"));

        assert!(cpptraj_script(Path::new("a.nc"), Path::new("b.prmtop"), (0, 5), 1, Path::new("o.pdb")).is_err());
        assert!(cpptraj_script(Path::new("a.nc"), Path::new("b.prmtop"), (6, 5), 1, Path::new("o.pdb")).is_err());
    }


    #[test]
    fn test_default_outfile() {
        assert_eq!(default_outfile(Path::new("data/run2.prod.nc")), PathBuf::from("pdbs/run2.pdb"));
        assert_eq!(default_outfile(Path::new("run3.dcd")), PathBuf::from("pdbs/run3.pdb"));
    }


    #[test]
    fn test_write_scripts() {
        let dir = tempdir().unwrap();
        let trajs = vec![PathBuf::from("data/run1.dcd"), PathBuf::from("data/run2.dcd")];
        let scripts = write_cpptraj_scripts(dir.path(), &trajs, Path::new("top.prmtop"), (1, 1), 1).unwrap();
        assert_eq!(scripts, vec![dir.path().join("run1.cpptraj"), dir.path().join("run2.cpptraj")]);

        let txt = fs::read_to_string(&scripts[1]).unwrap();
        assert_eq!(txt.lines().nth(1), Some("trajin data/run2.dcd 1 1"));
        assert!(write_cpptraj_scripts(dir.path(), &[], Path::new("top.prmtop"), (1, 1), 1).is_err());
    }
}
