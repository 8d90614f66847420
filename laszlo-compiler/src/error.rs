//! Compiler error types

use laszlo_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{} isn't inside {}", path.display(), root.display())]
    Location { path: PathBuf, root: PathBuf },

    #[error("Transport error: {url} returned {status}")]
    Transport {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Transport error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Race condition: {} was modified during compilation", .0.display())]
    RaceCondition(PathBuf),

    #[error("{0}")]
    Compilation(String),

    #[error("{} and {} do not have the same basename", source_file.display(), output.display())]
    OutputMismatch { source_file: PathBuf, output: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CompilerError {
    /// True for errors the facade recovers from by switching strategy
    pub fn is_location(&self) -> bool {
        matches!(self, CompilerError::Location { .. })
    }

    /// True for failures of the HTTP exchange itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CompilerError::Transport { .. } | CompilerError::Request(_)
        )
    }
}
