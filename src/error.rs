use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the carving engine.
///
/// None of these are retried by the engine itself; the caller decides how
/// to present them.
#[derive(Error, Debug)]
pub enum CarveError {
    #[error("Source not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Read error on {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Write error on {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CarveError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OutputWriteFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CarveError>;
