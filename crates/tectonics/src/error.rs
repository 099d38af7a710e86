use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the simulation core.
///
/// Only input and format problems end up here. Geometric and numeric degeneracies are
/// recovered where they happen so a running simulation never halts.
#[derive(Error, Debug)]
pub enum TectonicsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mesh template not found: {0}")]
    MissingTemplate(PathBuf),

    #[error("stream ended while reading {context}")]
    Truncated { context: &'static str },

    #[error("malformed data: {0}")]
    Format(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("operation requires initialized plates")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, TectonicsError>;
