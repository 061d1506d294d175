//! Error types for manifest operations.
//!
//! Covers file I/O, both serialization formats, and declaration errors raised
//! while building a program from a manifest.

use std::path::PathBuf;

use argweave_core::DeclarationError;
use thiserror::Error;

/// Errors that can occur while loading, saving, or building a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An option or command entry is malformed.
    #[error("invalid declaration: {0}")]
    Declaration(#[from] DeclarationError),

    /// The file extension is neither YAML nor JSON.
    #[error("unsupported manifest format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Convenience alias for results with [`ManifestError`].
pub type Result<T> = std::result::Result<T, ManifestError>;
