//! Where a template's source came from, for diagnostics

use std::fmt;
use std::path::Path;

/// Display name of templates built from a literal string
pub const UNKNOWN_SOURCE: &str = "<unknown source>";

/// Diagnostic record of a template's source location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    /// Filesystem path of the source, or [`UNKNOWN_SOURCE`]
    pub name: String,
    /// Name the template was requested under, if it was looked up
    pub template_name: Option<String>,
}

impl Origin {
    pub fn new(name: impl Into<String>, template_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_name: Some(template_name.into()),
        }
    }

    /// Origin of a template with no file backing
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_SOURCE.to_string(),
            template_name: None,
        }
    }

    pub fn from_path(path: &Path, template_name: &str) -> Self {
        Self::new(path.to_string_lossy(), template_name)
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_SOURCE
    }

    /// Path of the source file, `None` for literal templates
    pub fn path(&self) -> Option<&Path> {
        (!self.is_unknown()).then(|| Path::new(&self.name))
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_origin() {
        let origin = Origin::unknown();
        assert!(origin.is_unknown());
        assert_eq!(origin.path(), None);
        assert_eq!(origin.to_string(), "<unknown source>");
    }

    #[test]
    fn test_file_origin() {
        let origin = Origin::from_path(Path::new("/srv/templates/invoice.typ"), "invoice.typ");
        assert!(!origin.is_unknown());
        assert_eq!(origin.path(), Some(Path::new("/srv/templates/invoice.typ")));
        assert_eq!(origin.template_name.as_deref(), Some("invoice.typ"));
    }
}
