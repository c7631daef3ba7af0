//! typset CLI - Command-line interface library
//!
//! This library provides the CLI functionality for typset:
//! - Render: compile a Typst template to PDF with a TOML/JSON context
//! - Locate: show which file a template name resolves to
//! - Inputs: print the context document handed to the template
//!
//! # Binary Usage
//!
//! ```bash
//! # Render a template found on the search path
//! typset --dir templates render invoice.typ --context invoice.toml -o invoice.pdf
//!
//! # Use settings from a file and an external typst binary
//! typset --config typset.toml render invoice.typ --compiler process
//!
//! # Inspect what the template will see as sys.inputs.context
//! typset inputs --context invoice.json --request-path /invoices/1
//! ```

pub mod app;

pub use app::{
    inputs_command, load_context, load_params, locate_command, render_command, run_cli,
    CompilerKind, ContextArgs,
};
