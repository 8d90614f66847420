//! Error types for the core crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid source name: {}", .0.display())]
    InvalidSourceName(PathBuf),
}
