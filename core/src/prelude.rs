use std::path::PathBuf;

use crate::swath::PingState;

/// Common error type for configuration loading, auxiliary tables and record streams.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("missing auxiliary data: {0}")]
    MissingAuxiliary(String),
    #[error("insufficient data in {path}: {detail}")]
    InsufficientData { path: PathBuf, detail: String },
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("codec failure: {0}")]
    Codec(String),
    #[error("processing cancelled")]
    Cancelled,
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ProcessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn insufficient(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ProcessError::InsufficientData {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// One step of the per-ping correction chain.
///
/// Stages run in a fixed order and mutate the ping held by the [`PingState`].
/// Per-beam numeric trouble is handled inside the stage by nulling or leaving
/// the beam untouched; an `Err` aborts the whole input.
pub trait ProcessingStage {
    fn name(&self) -> &'static str;
    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()>;
}
