use std::path::PathBuf;
use thiserror::Error;


/// Failures shared by the parsers and the analysis pipeline.
///
/// Functions return `anyhow::Result`; callers that need to branch on the
/// failure kind can `downcast_ref::<AnalysisError>()`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("file {0:?} does not exist")]
    FileNotFound(PathBuf),

    #[error("invalid data in {path:?}: {details}")]
    Format {
        path: PathBuf,
        details: String,
    },

    #[error("cannot infer the file format of {0:?} from its extension")]
    UnsupportedFormat(PathBuf),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}


impl AnalysisError {
    pub fn format(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn insufficient(details: impl Into<String>) -> Self {
        Self::InsufficientData(details.into())
    }
}
