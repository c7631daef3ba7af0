//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use typset_engine::compiler::DEFAULT_TYPST_BIN;
use typset_engine::{
    context_from_json, context_from_toml, Compiler, Context, EngineError, EngineParams,
    HttpRequest, ProcessCompiler, TemplateBackend, TypstCompiler, TypstEngine,
};

/// Which compiler produces the PDF
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CompilerKind {
    /// Compile in-process
    #[default]
    Embedded,
    /// Run an external `typst` binary
    Process,
}

#[derive(Parser)]
#[command(name = "typset")]
#[command(author, version, about = "Render Typst templates to PDF", long_about = None)]
struct Cli {
    /// Settings file with an [engine] table
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Template directory, searched before the configured ones
    #[arg(short, long = "dir", global = true)]
    dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to PDF
    Render {
        /// Template name on the search path, or literal source with --string
        template: String,

        /// Treat TEMPLATE as literal Typst source
        #[arg(long)]
        string: bool,

        /// Output PDF file (defaults to the template name with a .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compiler backend
        #[arg(long, value_enum, default_value = "embedded")]
        compiler: CompilerKind,

        /// Typst binary used by the process compiler
        #[arg(long, default_value = DEFAULT_TYPST_BIN)]
        typst_bin: PathBuf,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Show which file a template name resolves to
    Locate {
        /// Template name on the search path
        template: String,
    },

    /// Print the TOML context document passed as sys.inputs.context
    Inputs {
        #[command(flatten)]
        context: ContextArgs,
    },
}

/// Context and request options shared by `render` and `inputs`
#[derive(Debug, Clone, Default, Args)]
pub struct ContextArgs {
    /// Context file (.toml or .json)
    #[arg(long = "context")]
    pub context_file: Option<PathBuf>,

    /// Include a request with this path in the context
    #[arg(long)]
    pub request_path: Option<String>,

    /// Method of the included request
    #[arg(long, default_value = "GET", requires = "request_path")]
    pub method: String,

    /// Header of the included request, as "Name: value"
    #[arg(long = "header", requires = "request_path")]
    pub headers: Vec<String>,
}

impl ContextArgs {
    /// Load the context file, or an empty context
    pub fn load_context(&self) -> Result<Context> {
        match &self.context_file {
            Some(path) => load_context(path),
            None => Ok(Context::new()),
        }
    }

    /// Build the request described by the flags, if any
    pub fn request(&self) -> Result<Option<HttpRequest>> {
        let Some(path) = &self.request_path else {
            return Ok(None);
        };

        let mut request = HttpRequest::new(&self.method, path.clone());
        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("Header must be 'Name: value', got '{}'", header))?;
            request = request.with_header(name.trim(), value.trim());
        }
        Ok(Some(request))
    }
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let params = load_params(cli.config.as_deref(), &cli.dirs)?;

    match cli.command {
        Commands::Render {
            template,
            string,
            output,
            compiler,
            typst_bin,
            context,
        } => {
            let compiler: Arc<dyn Compiler> = match compiler {
                CompilerKind::Embedded => Arc::new(TypstCompiler::new()),
                CompilerKind::Process => Arc::new(ProcessCompiler::new(typst_bin)),
            };
            let written = render_command(
                params,
                &template,
                string,
                output.as_deref(),
                &context,
                compiler,
            )?;
            println!("Created: {}", written.display());
        }
        Commands::Locate { template } => match locate_command(params, &template) {
            Ok(path) => println!("{}", path.display()),
            Err(e) => {
                for (origin, _) in e
                    .downcast_ref::<EngineError>()
                    .map(EngineError::tried)
                    .unwrap_or_default()
                {
                    eprintln!("  tried: {}", origin);
                }
                return Err(e);
            }
        },
        Commands::Inputs { context } => {
            print!("{}", inputs_command(params, &context)?);
        }
    }

    Ok(())
}

/// Load engine settings, putting `extra_dirs` ahead of the configured directories
pub fn load_params(config: Option<&Path>, extra_dirs: &[PathBuf]) -> Result<EngineParams> {
    let mut params = match config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings: {}", path.display()))?;
            EngineParams::from_toml_str(&content)
                .with_context(|| format!("Failed to parse settings: {}", path.display()))?
        }
        None => EngineParams::default(),
    };

    if !extra_dirs.is_empty() {
        let mut dirs = extra_dirs.to_vec();
        dirs.append(&mut params.dirs);
        params.dirs = dirs;
    }
    Ok(params)
}

/// Read a `.toml` or `.json` context file
pub fn load_context(path: &Path) -> Result<Context> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON context: {}", path.display()))?;
        context_from_json(value)
            .with_context(|| format!("Context must be a JSON object: {}", path.display()))
    } else {
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML context: {}", path.display()))?;
        Ok(context_from_toml(table))
    }
}

/// Execute the render command, returning the written file
pub fn render_command(
    params: EngineParams,
    template: &str,
    literal: bool,
    output: Option<&Path>,
    context_args: &ContextArgs,
    compiler: Arc<dyn Compiler>,
) -> Result<PathBuf> {
    let engine = TypstEngine::new(params)
        .context("Invalid engine configuration")?
        .with_compiler(compiler);

    let template_obj = if literal {
        engine.from_string(template)
    } else {
        engine
            .get_template(template)
            .with_context(|| format!("Failed to load template: {}", template))?
    };

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None if literal => PathBuf::from("output.pdf"),
        None => Path::new(template)
            .file_name()
            .map(|name| Path::new(name).with_extension("pdf"))
            .unwrap_or_else(|| PathBuf::from("output.pdf")),
    };

    let context = context_args.load_context()?;
    let request = context_args.request()?;

    let pdf = template_obj
        .render(Some(context), request.as_ref())
        .with_context(|| format!("Failed to render: {}", template_obj.origin()))?;

    fs::write(&output_path, pdf)
        .with_context(|| format!("Failed to write PDF: {}", output_path.display()))?;

    Ok(output_path)
}

/// Execute the locate command
pub fn locate_command(params: EngineParams, template: &str) -> Result<PathBuf> {
    let engine = TypstEngine::new(params).context("Invalid engine configuration")?;
    let found = engine.get_template(template)?;

    Ok(PathBuf::from(&found.origin().name))
}

/// Execute the inputs command, returning the context document
pub fn inputs_command(params: EngineParams, context_args: &ContextArgs) -> Result<String> {
    let engine = TypstEngine::new(params).context("Invalid engine configuration")?;
    let context = context_args.load_context()?;
    let request = context_args.request()?;

    let compile_request = engine
        .from_string("")
        .compile_request(Some(context), request.as_ref())?;

    Ok(compile_request
        .sys_inputs
        .get(typset_engine::template::CONTEXT_INPUT)
        .cloned()
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "typset",
            "--dir",
            "templates",
            "render",
            "invoice.typ",
            "--compiler",
            "process",
            "--request-path",
            "/invoices/1",
            "--header",
            "Accept: application/pdf",
        ])
        .unwrap();

        assert_eq!(cli.dirs, vec![PathBuf::from("templates")]);
        match cli.command {
            Commands::Render {
                template,
                compiler,
                context,
                ..
            } => {
                assert_eq!(template, "invoice.typ");
                assert!(matches!(compiler, CompilerKind::Process));
                assert_eq!(context.request_path.as_deref(), Some("/invoices/1"));
                assert_eq!(context.headers, vec!["Accept: application/pdf".to_string()]);
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_header_requires_request_path() {
        let result = Cli::try_parse_from(["typset", "inputs", "--header", "Accept: */*"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_from_args() {
        let args = ContextArgs {
            request_path: Some("/upload".to_string()),
            method: "post".to_string(),
            headers: vec!["Content-Type: text/csv; charset=utf-8".to_string()],
            ..ContextArgs::default()
        };

        let request = args.request().unwrap().unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.content_type, "text/csv");
        assert_eq!(request.content_params["charset"], "utf-8");
    }

    #[test]
    fn test_malformed_header() {
        let args = ContextArgs {
            request_path: Some("/".to_string()),
            headers: vec!["no-colon".to_string()],
            ..ContextArgs::default()
        };

        assert!(args.request().is_err());
    }
}
