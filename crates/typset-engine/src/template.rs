//! Renderable Typst template

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::compiler::{CompileRequest, Compiler, TypstCompiler};
use crate::config::EngineConfig;
use crate::encoding::EncoderRegistry;
use crate::error::Result;
use crate::origin::Origin;
use crate::request::HttpRequest;
use crate::value::{Context, Value};

/// Context key removed before rendering; views have no TOML form
pub const VIEW_KEY: &str = "view";
/// Context key the request is stored under
pub const REQUEST_KEY: &str = "request";
/// Sys-inputs key holding the TOML-encoded context
pub const CONTEXT_INPUT: &str = "context";

/// A Typst template bound to its engine's configuration
#[derive(Clone)]
pub struct Template {
    source: Vec<u8>,
    config: Arc<EngineConfig>,
    origin: Origin,
    compiler: Arc<dyn Compiler>,
    encoders: Arc<EncoderRegistry>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("origin", &self.origin)
            .field("source_len", &self.source.len())
            .field("config", &self.config)
            .field("compiler", &self.compiler.name())
            .finish()
    }
}

impl Template {
    /// Template compiled in-process with the standard encoders
    pub fn new(
        source: impl Into<Vec<u8>>,
        config: Arc<EngineConfig>,
        origin: Option<Origin>,
    ) -> Self {
        Self {
            source: source.into(),
            config,
            origin: origin.unwrap_or_default(),
            compiler: Arc::new(TypstCompiler),
            encoders: Arc::new(EncoderRegistry::standard()),
        }
    }

    /// Replace the compiler used by [`render`](Self::render)
    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Replace the encoders used to serialize the context
    pub fn with_encoders(mut self, encoders: Arc<EncoderRegistry>) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Root directory handed to the compiler
    ///
    /// The configured root wins; otherwise a template loaded from a file uses
    /// the directory containing it, `.` for a bare file name.
    pub fn effective_root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.config.root {
            return Some(root.clone());
        }
        self.origin
            .path()
            .and_then(|path| path.parent())
            .map(|parent| {
                if parent.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    parent.to_path_buf()
                }
            })
    }

    /// Build the compiler request for a context
    ///
    /// Removes the `view` entry and stores `request` under `request`.
    pub fn compile_request(
        &self,
        context: Option<Context>,
        request: Option<&HttpRequest>,
    ) -> Result<CompileRequest> {
        let mut context = context.unwrap_or_default();
        context.remove(VIEW_KEY);

        if let Some(request) = request {
            context.insert(REQUEST_KEY.to_string(), Value::from(request.clone()));
        }

        let document = self.encoders.to_document(&context)?;

        let mut sys_inputs = BTreeMap::new();
        sys_inputs.insert(CONTEXT_INPUT.to_string(), document);

        Ok(CompileRequest {
            input: self.source.clone(),
            root: self
                .effective_root()
                .map(|root| root.to_string_lossy().into_owned()),
            font_paths: self
                .config
                .font_paths
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
            ignore_system_fonts: self.config.ignore_system_fonts,
            ppi: self.config.ppi,
            sys_inputs,
            pdf_standards: self.config.pdf_standard.as_str().to_string(),
        })
    }

    /// Render the template to PDF bytes
    ///
    /// Compiler errors are returned unchanged.
    pub fn render(
        &self,
        context: Option<Context>,
        request: Option<&HttpRequest>,
    ) -> Result<Vec<u8>> {
        let compile_request = self.compile_request(context, request)?;
        debug!(
            origin = %self.origin,
            compiler = self.compiler.name(),
            root = ?compile_request.root,
            "Rendering template"
        );

        Ok(self.compiler.compile(&compile_request)?)
    }
}
