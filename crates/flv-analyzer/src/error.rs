use std::io;

use flv::FlvError;

/// Errors that stop an analysis. Everything recoverable is a
/// [`crate::Warning`] in the report instead.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// The input is not FLV or its header is unusable.
    #[error("invalid FLV: {0}")]
    Format(FlvError),
    /// Reading the source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<FlvError> for AnalyzeError {
    fn from(err: FlvError) -> Self {
        match err {
            FlvError::Io(err) => Self::Io(err),
            other => Self::Format(other),
        }
    }
}
