//! typset-engine - Typst template backend
//!
//! Locates Typst templates on a search path, encodes a rendering context as a
//! TOML document and compiles the template to PDF. The context is visible to
//! the document as `sys.inputs.context`:
//!
//! ```typst
//! #let ctx = toml(bytes(sys.inputs.context))
//! = Invoice #ctx.number
//! ```
//!
//! # Architecture
//!
//! 1. **Config** - validates the raw `OPTIONS` table into an [`EngineConfig`]
//! 2. **Engine** - finds templates on disk or wraps literal source
//! 3. **Encoding** - turns the [`Context`] into TOML through an [`EncoderRegistry`]
//! 4. **Compiler** - produces the PDF ([`TypstCompiler`] or [`ProcessCompiler`])
//!
//! # Example
//!
//! ```ignore
//! use typset_engine::{Context, EngineParams, TemplateBackend, TypstEngine, Value};
//!
//! let engine = TypstEngine::new(EngineParams::from_toml_str(settings)?)?;
//! let template = engine.get_template("invoice.typ")?;
//!
//! let mut context = Context::new();
//! context.insert("number".into(), Value::from("A-17"));
//! let pdf = template.render(Some(context), None)?;
//! ```

pub mod backend;
pub mod compiler;
pub mod config;
pub mod encoding;
pub mod engine;
mod error;
pub mod origin;
pub mod request;
pub mod template;
pub mod value;

pub use backend::{safe_join, TemplateBackend};
pub use compiler::{
    CompileError, CompileRequest, CompileResult, Compiler, ProcessCompiler, TypstCompiler,
};
pub use config::{ConfigError, EngineConfig, PdfStandard};
pub use encoding::{EncodeError, Encoder, EncoderRegistry, RequestEncoder, StringableEncoder};
pub use engine::{EngineParams, TypstEngine, APP_DIRNAME};
pub use error::{EngineError, Result};
pub use origin::{Origin, UNKNOWN_SOURCE};
pub use request::HttpRequest;
pub use template::Template;
pub use value::{context_from_json, context_from_toml, Context, Value, ValueKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
