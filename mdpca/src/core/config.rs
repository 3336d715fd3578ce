use std::path::Path;
use std::fmt;
use std::fs;

use serde::Deserialize;
use shared::{
    log,
    anyhow::{anyhow, ensure},
    Context,
    Result,
};


pub trait AnalysisConfig: Clone + Sized + Default + fmt::Display + for<'a> Deserialize<'a> {
    /// Validate the fields, collecting every violation into one error.
    fn check_config(&self) -> Result<()>;

    fn from_file<P>(fname: P) -> Result<Self>
    where P: AsRef<Path> {
        let fname = fname.as_ref();
        ensure!(fname.is_file(), "Config file {:?} not available.", fname);
        let raw = fs::read_to_string(fname)?;
        let cfg = toml::from_str::<Self>(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", fname))?;
        cfg.check_config()?;
        Ok(cfg)
    }

    fn to_file<P>(&self, fname: P) -> Result<()>
    where P: AsRef<Path> {
        let fname = fname.as_ref();
        if fname.is_file() {
            log::warn!("File {:?} exists, overwriting ...", fname);
        }
        log::info!("Writing config to file {:?}", fname);
        fs::write(fname, self.to_string())?;
        Ok(())
    }

    fn print_to_log(&self) {
        let input_print = format!("{}", self);
        let hashtag_line = "#".repeat(120);
        log::info!("Config loaded. The formatted config is:\n\n{hashtag_line}\n{}\n{hashtag_line}\n\n", input_print);
    }
}


/// Fold one more violation into the result of a `check_config` run.
pub fn add_violation<S>(ret: Result<()>, msg: S) -> Result<()>
where S: fmt::Display + Send + Sync + 'static {
    match ret {
        Ok(()) => Err(anyhow!("{}", msg)),
        Err(e) => Err(e.context(msg)),
    }
}
