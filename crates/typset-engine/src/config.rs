//! Engine configuration
//!
//! Turns the loosely-typed `OPTIONS` table of an engine into a validated
//! [`EngineConfig`]. Recognized keys are case-sensitive:
//!
//! ```toml
//! [engine.OPTIONS]
//! ROOT = "assets/"
//! FONT_PATHS = ["fonts/", "/usr/share/fonts/corporate"]
//! IGNORE_SYSTEM_FONTS = true
//! PDF_STANDARD = "a-2b"
//! PPI = 300
//! ```
//!
//! Unknown keys are ignored.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use toml::{Table, Value};

/// Invalid engine configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid configuration for {key}: {message}")]
pub struct ConfigError {
    /// The option key that failed validation
    pub key: &'static str,
    /// What was wrong with the value
    pub message: String,
}

impl ConfigError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Target PDF standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PdfStandard {
    /// PDF 1.7
    #[default]
    Pdf17,
    /// PDF/A-2b
    PdfA2b,
    /// PDF/A-3b
    PdfA3b,
}

impl PdfStandard {
    /// All supported standards
    pub fn all() -> &'static [PdfStandard] {
        &[PdfStandard::Pdf17, PdfStandard::PdfA2b, PdfStandard::PdfA3b]
    }

    /// Identifier understood by the Typst compiler
    pub fn as_str(self) -> &'static str {
        match self {
            PdfStandard::Pdf17 => "1.7",
            PdfStandard::PdfA2b => "a-2b",
            PdfStandard::PdfA3b => "a-3b",
        }
    }
}

impl fmt::Display for PdfStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PdfStandard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PdfStandard::all()
            .iter()
            .copied()
            .find(|standard| standard.as_str() == s)
            .ok_or_else(|| {
                ConfigError::new(
                    "PDF_STANDARD",
                    format!("'{}' is not one of 1.7, a-2b, a-3b", s),
                )
            })
    }
}

/// Validated settings shared by every template of an engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Filesystem root for the compiler; `None` falls back to the template's directory
    pub root: Option<PathBuf>,
    /// Extra directories searched for fonts
    pub font_paths: Vec<PathBuf>,
    /// Skip fonts installed on the system
    pub ignore_system_fonts: bool,
    /// Target PDF standard
    pub pdf_standard: PdfStandard,
    /// Pixel density; `None` uses the compiler default
    pub ppi: Option<u32>,
}

impl EngineConfig {
    /// Build a configuration from a raw options table
    pub fn from_options(options: &Table) -> Result<Self, ConfigError> {
        let root = match options.get("ROOT") {
            Some(value) if is_truthy(value) => {
                Some(resolve_path("ROOT", path_value("ROOT", value)?)?)
            }
            _ => None,
        };

        let font_paths = match options.get("FONT_PATHS") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| resolve_path("FONT_PATHS", path_value("FONT_PATHS", entry)?))
                .collect::<Result<Vec<_>, _>>()?,
            Some(single) => vec![resolve_path("FONT_PATHS", path_value("FONT_PATHS", single)?)?],
        };

        let ignore_system_fonts = matches!(
            options.get("IGNORE_SYSTEM_FONTS"),
            Some(Value::Boolean(true))
        );

        let pdf_standard = match options.get("PDF_STANDARD") {
            Some(Value::String(s)) if !s.is_empty() => s.parse::<PdfStandard>()?,
            Some(value) if is_truthy(value) => {
                return Err(ConfigError::new(
                    "PDF_STANDARD",
                    format!("expected a string, found {}", value.type_str()),
                ))
            }
            _ => PdfStandard::default(),
        };

        let ppi = match options.get("PPI") {
            Some(value) if is_truthy(value) => Some(ppi_value(value)?),
            _ => None,
        };

        Ok(Self {
            root,
            font_paths,
            ignore_system_fonts,
            pdf_standard,
            ppi,
        })
    }
}

/// Empty strings, empty collections, zero and `false` are treated as unset
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Boolean(b) => *b,
        Value::Array(a) => !a.is_empty(),
        Value::Table(t) => !t.is_empty(),
        Value::Datetime(_) => true,
    }
}

fn path_value<'a>(key: &'static str, value: &'a Value) -> Result<&'a Path, ConfigError> {
    match value {
        Value::String(s) => Ok(Path::new(s)),
        other => Err(ConfigError::new(
            key,
            format!("expected a path string, found {}", other.type_str()),
        )),
    }
}

fn ppi_value(value: &Value) -> Result<u32, ConfigError> {
    let ppi = match value {
        Value::Integer(i) => *i,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            ConfigError::new("PPI", format!("'{}' is not an integer", s))
        })?,
        Value::Boolean(b) => i64::from(*b),
        other => {
            return Err(ConfigError::new(
                "PPI",
                format!("cannot convert {} to an integer", other.type_str()),
            ))
        }
    };

    u32::try_from(ppi).map_err(|_| ConfigError::new("PPI", format!("{} is out of range", ppi)))
}

/// Make a path absolute, resolving symlinks when the path exists
///
/// An empty path names the current directory.
fn resolve_path(key: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    std::path::absolute(path).map_err(|e| {
        ConfigError::new(key, format!("cannot resolve '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(source: &str) -> Table {
        source.parse::<Table>().unwrap()
    }

    #[test]
    fn test_empty_options_use_defaults() {
        let config = EngineConfig::from_options(&Table::new()).unwrap();

        assert_eq!(
            config,
            EngineConfig {
                root: None,
                font_paths: Vec::new(),
                ignore_system_fonts: false,
                pdf_standard: PdfStandard::Pdf17,
                ppi: None,
            }
        );
    }

    #[test]
    fn test_root_is_made_absolute() {
        let config = EngineConfig::from_options(&options(r#"ROOT = "some/relative/dir""#)).unwrap();

        let root = config.root.unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("some/relative/dir"));
    }

    #[test]
    fn test_empty_root_is_unset() {
        let config = EngineConfig::from_options(&options(r#"ROOT = """#)).unwrap();
        assert_eq!(config.root, None);
    }

    #[test]
    fn test_root_must_be_a_string() {
        let err = EngineConfig::from_options(&options("ROOT = 12")).unwrap_err();
        assert_eq!(err.key, "ROOT");
    }

    #[test]
    fn test_font_paths_list() {
        let config =
            EngineConfig::from_options(&options(r#"FONT_PATHS = ["/a/path/", "/another/path"]"#))
                .unwrap();

        assert_eq!(config.font_paths.len(), 2);
        assert!(config.font_paths.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_font_paths_single_value() {
        let config = EngineConfig::from_options(&options(r#"FONT_PATHS = "fonts""#)).unwrap();

        assert_eq!(config.font_paths.len(), 1);
        assert!(config.font_paths[0].is_absolute());
        assert!(config.font_paths[0].ends_with("fonts"));
    }

    #[test]
    fn test_empty_font_path_is_current_dir() {
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();

        for source in [r#"FONT_PATHS = """#, r#"FONT_PATHS = ["", "fonts"]"#] {
            let config = EngineConfig::from_options(&options(source)).unwrap();

            assert!(config.font_paths.iter().all(|p| p.is_absolute()), "{}", source);
            assert_eq!(config.font_paths[0], cwd, "{}", source);
        }
    }

    #[test]
    fn test_font_paths_reject_non_strings() {
        let err = EngineConfig::from_options(&options("FONT_PATHS = [\"ok\", 3]")).unwrap_err();
        assert_eq!(err.key, "FONT_PATHS");
    }

    #[test]
    fn test_ignore_system_fonts_requires_true() {
        let on = EngineConfig::from_options(&options("IGNORE_SYSTEM_FONTS = true")).unwrap();
        assert!(on.ignore_system_fonts);

        let truthy_string =
            EngineConfig::from_options(&options(r#"IGNORE_SYSTEM_FONTS = "yes""#)).unwrap();
        assert!(!truthy_string.ignore_system_fonts);

        let one = EngineConfig::from_options(&options("IGNORE_SYSTEM_FONTS = 1")).unwrap();
        assert!(!one.ignore_system_fonts);
    }

    #[test]
    fn test_pdf_standards() {
        for (name, expected) in [
            ("1.7", PdfStandard::Pdf17),
            ("a-2b", PdfStandard::PdfA2b),
            ("a-3b", PdfStandard::PdfA3b),
        ] {
            let mut table = Table::new();
            table.insert("PDF_STANDARD".to_string(), Value::String(name.to_string()));

            let config = EngineConfig::from_options(&table).unwrap();
            assert_eq!(config.pdf_standard, expected);
            assert_eq!(config.pdf_standard.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_pdf_standard_fails() {
        let err = EngineConfig::from_options(&options(r#"PDF_STANDARD = "a-1a""#)).unwrap_err();

        assert_eq!(err.key, "PDF_STANDARD");
        assert!(err.to_string().contains("a-1a"));
    }

    #[test]
    fn test_ppi_coercion() {
        let cases = [
            ("PPI = 300", Some(300)),
            (r#"PPI = "144""#, Some(144)),
            ("PPI = 72.9", Some(72)),
            ("PPI = 0", None),
            (r#"PPI = """#, None),
        ];

        for (source, expected) in cases {
            let config = EngineConfig::from_options(&options(source)).unwrap();
            assert_eq!(config.ppi, expected, "{}", source);
        }
    }

    #[test]
    fn test_invalid_ppi_fails() {
        for source in [r#"PPI = "lots""#, "PPI = -5", "PPI = [1]"] {
            let err = EngineConfig::from_options(&options(source)).unwrap_err();
            assert_eq!(err.key, "PPI", "{}", source);
        }
    }
}
