//! Error types for the Typst template backend

use thiserror::Error;

use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::encoding::EncodeError;
use crate::origin::Origin;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while building an engine, locating or rendering a template
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine options could not be turned into a valid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No search directory contained the requested template
    #[error("Template not found: {name} (backend '{backend}', tried {} candidate(s))", .tried.len())]
    TemplateDoesNotExist {
        /// The requested template name
        name: String,
        /// Every candidate that was checked, in search order
        tried: Vec<(Origin, String)>,
        /// Name of the backend that performed the lookup
        backend: String,
    },

    /// The context could not be serialized to TOML
    #[error("Context serialization failed: {0}")]
    Encode(#[from] EncodeError),

    /// Failure reported by the compiler, passed through unchanged
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// IO error while reading a template
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Candidates checked before a `TemplateDoesNotExist` was raised
    pub fn tried(&self) -> &[(Origin, String)] {
        match self {
            EngineError::TemplateDoesNotExist { tried, .. } => tried,
            _ => &[],
        }
    }
}
