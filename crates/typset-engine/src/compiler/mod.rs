//! Compiler boundary
//!
//! A template hands its source, filesystem root, font settings and encoded
//! context to a [`Compiler`] and returns whatever bytes come back. Two
//! implementations are provided:
//!
//! - [`TypstCompiler`] compiles in-process with `typst-as-lib`
//! - [`ProcessCompiler`] runs an external `typst` binary

mod embedded;
mod process;

use std::collections::BTreeMap;

use thiserror::Error;

pub use embedded::TypstCompiler;
pub use process::{ProcessCompiler, DEFAULT_TYPST_BIN};

/// Errors reported by a compiler
#[derive(Debug, Error)]
pub enum CompileError {
    /// The template source is not valid UTF-8
    #[error("Template source is not valid UTF-8: {0}")]
    InvalidSource(#[from] std::str::Utf8Error),

    /// The requested PDF standard is unknown to the compiler
    #[error("Unsupported PDF standard: {0}")]
    UnsupportedStandard(String),

    /// Typst compilation failed
    #[error("Typst compilation failed: {0}")]
    Compilation(String),

    /// PDF export failed
    #[error("PDF export failed: {0}")]
    Export(String),

    /// The compiler process exited unsuccessfully
    #[error("Typst exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for compiler operations
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Everything a compiler needs to produce one document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileRequest {
    /// Raw template source
    pub input: Vec<u8>,
    /// Root directory for file access from the document
    pub root: Option<String>,
    /// Extra font directories
    pub font_paths: Vec<String>,
    /// Skip fonts installed on the system
    pub ignore_system_fonts: bool,
    /// Pixel density for raster output
    pub ppi: Option<u32>,
    /// Values visible to the document as `sys.inputs`
    pub sys_inputs: BTreeMap<String, String>,
    /// Target PDF standard identifier (`1.7`, `a-2b`, `a-3b`)
    pub pdf_standards: String,
}

/// Produces a document from a [`CompileRequest`]
///
/// Compilers must be `Send + Sync`; templates share them through an `Arc`.
pub trait Compiler: Send + Sync {
    /// Human-readable name of this compiler
    fn name(&self) -> &'static str;

    /// Compile the request into document bytes
    fn compile(&self, request: &CompileRequest) -> CompileResult<Vec<u8>>;
}
