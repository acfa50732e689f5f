use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing an MRC micrograph container.
#[derive(Debug, Error)]
pub enum MrcError {
    #[error("Failed to read MRC file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write MRC file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid MRC header in '{path}': {reason}")]
    Header { path: PathBuf, reason: String },

    #[error("Unsupported MRC mode {mode} in '{path}'")]
    UnsupportedMode { path: PathBuf, mode: i32 },

    #[error("MRC data in '{path}' is truncated: expected {expected} bytes, found {found}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Cannot store a {ndim}-dimensional array in MRC file '{path}'")]
    Dimensions { path: PathBuf, ndim: usize },
}

/// Errors raised while reading or writing a MATLAB Level 5 MAT file.
#[derive(Debug, Error)]
pub enum MatError {
    #[error("Failed to read MAT file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write MAT file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed MAT file '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Variable '{name}' not found in MAT file '{path}'")]
    MissingVariable { path: PathBuf, name: String },

    #[error("Variable name '{name}' is not a valid MATLAB identifier")]
    InvalidName { name: String },
}
