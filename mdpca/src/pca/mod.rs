pub mod config;
pub use config::{FeatureKind, PcaConfig};

pub mod pca_impl;
pub use pca_impl::{PcaProjection, run_pca};

pub mod cpptraj;
pub use cpptraj::write_cpptraj_scripts;

pub mod command;
pub use command::PcaCommand;
