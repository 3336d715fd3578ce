pub mod version;
pub mod logging;
pub mod cli;
pub use cli::OptProcess;

pub mod core;
pub mod loader;
pub mod features;
pub mod plot;

pub mod pca;
pub mod kde;

#[cfg(test)]
pub(crate) mod test_utils;
