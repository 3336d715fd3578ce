pub mod config;
pub use config::KdeConfig;

pub mod kde_impl;
pub use kde_impl::run_kde;

pub mod command;
pub use command::KdeCommand;
