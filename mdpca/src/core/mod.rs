pub mod config;
pub use config::*;

pub mod fragment;
pub use fragment::*;
