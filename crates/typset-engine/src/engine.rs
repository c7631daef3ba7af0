//! Typst template engine
//!
//! The engine owns the validated configuration, the search path, the encoder
//! chain and the compiler; every template it produces shares them.
//!
//! # Settings
//!
//! ```toml
//! [engine]
//! NAME = "typst"
//! DIRS = ["templates"]
//! APP_DIRS = true
//! APPS = ["apps/billing", "apps/reports"]
//!
//! [engine.OPTIONS]
//! PDF_STANDARD = "a-2b"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::backend::TemplateBackend;
use crate::compiler::{Compiler, TypstCompiler};
use crate::config::EngineConfig;
use crate::encoding::EncoderRegistry;
use crate::error::{EngineError, Result};
use crate::origin::Origin;
use crate::template::Template;

/// Name an engine is registered under unless configured otherwise
pub const DEFAULT_NAME: &str = "typst";

/// Subdirectory of an installed application that holds its Typst templates
pub const APP_DIRNAME: &str = "typst";

/// Backend settings block
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineParams {
    /// Registered name of the engine
    #[serde(rename = "NAME")]
    pub name: Option<String>,
    /// Explicit template directories, searched first
    #[serde(rename = "DIRS")]
    pub dirs: Vec<PathBuf>,
    /// Also search `<app>/typst` for every installed app
    #[serde(rename = "APP_DIRS")]
    pub app_dirs: bool,
    /// Installed application roots, in priority order
    #[serde(rename = "APPS")]
    pub apps: Vec<PathBuf>,
    /// Raw options for [`EngineConfig::from_options`]
    #[serde(rename = "OPTIONS")]
    pub options: toml::Table,
}

/// Settings file with an `[engine]` table
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    engine: EngineParams,
}

impl EngineParams {
    /// Parse the `[engine]` table of a TOML settings document
    pub fn from_toml_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let settings: SettingsFile = toml::from_str(toml_str)?;
        Ok(settings.engine)
    }

    /// Directories searched for templates: explicit dirs, then existing app dirs
    pub fn template_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.dirs.clone();
        if self.app_dirs {
            dirs.extend(
                self.apps
                    .iter()
                    .map(|app| app.join(APP_DIRNAME))
                    .filter(|dir| dir.is_dir()),
            );
        }
        dirs
    }
}

/// Template engine rendering Typst templates to PDF
pub struct TypstEngine {
    name: String,
    template_dirs: Vec<PathBuf>,
    config: Arc<EngineConfig>,
    compiler: Arc<dyn Compiler>,
    encoders: Arc<EncoderRegistry>,
}

impl std::fmt::Debug for TypstEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypstEngine")
            .field("name", &self.name)
            .field("template_dirs", &self.template_dirs)
            .field("config", &self.config)
            .field("compiler", &self.compiler.name())
            .field("encoders", &self.encoders)
            .finish()
    }
}

impl TypstEngine {
    /// Create an engine compiling in-process with the standard encoders
    ///
    /// Fails if `params.options` is not a valid configuration.
    pub fn new(params: EngineParams) -> Result<Self> {
        let config = EngineConfig::from_options(&params.options)?;
        let template_dirs = params.template_dirs();
        let name = params.name.unwrap_or_else(|| DEFAULT_NAME.to_string());

        debug!(engine = %name, dirs = ?template_dirs, "Created Typst engine");

        Ok(Self {
            name,
            template_dirs,
            config: Arc::new(config),
            compiler: Arc::new(TypstCompiler),
            encoders: Arc::new(EncoderRegistry::standard()),
        })
    }

    /// Use a different compiler for every template of this engine
    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Use a different encoder chain for every template of this engine
    pub fn with_encoders(mut self, encoders: EncoderRegistry) -> Self {
        self.encoders = Arc::new(encoders);
        self
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    fn template(&self, source: Vec<u8>, origin: Option<Origin>) -> Template {
        Template::new(source, self.config.clone(), origin)
            .with_compiler(self.compiler.clone())
            .with_encoders(self.encoders.clone())
    }
}

impl TemplateBackend for TypstEngine {
    type Template = Template;

    fn name(&self) -> &str {
        &self.name
    }

    fn app_dirname(&self) -> &'static str {
        APP_DIRNAME
    }

    fn template_dirs(&self) -> &[PathBuf] {
        &self.template_dirs
    }

    fn from_string(&self, template_code: &str) -> Template {
        self.template(template_code.as_bytes().to_vec(), None)
    }

    fn get_template(&self, template_name: &str) -> Result<Template> {
        let mut tried = Vec::new();

        for path in self.iter_template_filenames(template_name) {
            let origin = Origin::from_path(&path, template_name);
            tried.push((origin.clone(), template_name.to_string()));

            if path.is_file() {
                debug!(template = template_name, path = %path.display(), "Found template");
                let source = std::fs::read(&path)?;
                return Ok(self.template(source, Some(origin)));
            }
            debug!(template = template_name, path = %path.display(), "Template candidate missing");
        }

        Err(EngineError::TemplateDoesNotExist {
            name: template_name.to_string(),
            tried,
            backend: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = TypstEngine::new(EngineParams::default()).unwrap();

        assert_eq!(engine.name(), "typst");
        assert_eq!(engine.app_dirname(), "typst");
        assert!(engine.template_dirs().is_empty());
        assert_eq!(**engine.config(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_options_fail_construction() {
        let params = EngineParams {
            options: r#"PDF_STANDARD = "2.0""#.parse().unwrap(),
            ..EngineParams::default()
        };

        let err = TypstEngine::new(params).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_from_string() {
        let engine = TypstEngine::new(EngineParams::default()).unwrap();

        let template = engine.from_string("= A Title");

        assert!(template.origin().is_unknown());
        assert_eq!(template.origin().template_name, None);
        assert_eq!(template.source(), b"= A Title");
        assert!(Arc::ptr_eq(template.config(), engine.config()));
    }

    #[test]
    fn test_params_from_toml() {
        let params = EngineParams::from_toml_str(
            r#"
[engine]
NAME = "pdf"
DIRS = ["templates", "shared/templates"]
APP_DIRS = true
APPS = ["apps/billing"]

[engine.OPTIONS]
PDF_STANDARD = "a-2b"
PPI = 300
"#,
        )
        .unwrap();

        assert_eq!(params.name.as_deref(), Some("pdf"));
        assert_eq!(
            params.dirs,
            vec![PathBuf::from("templates"), PathBuf::from("shared/templates")]
        );
        assert!(params.app_dirs);
        assert_eq!(params.apps, vec![PathBuf::from("apps/billing")]);
        assert_eq!(params.options["PPI"].as_integer(), Some(300));
    }

    #[test]
    fn test_params_without_engine_table() {
        let params = EngineParams::from_toml_str("").unwrap();
        assert_eq!(params, EngineParams::default());
    }
}
