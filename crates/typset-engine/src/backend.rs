//! Template backend protocol
//!
//! A backend exposes two operations to its host: build a template from a
//! literal string, and locate a template by name on its search path. The
//! search path is the explicit template directories followed by the
//! `<app>/<app_dirname>` directory of each installed application.

use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// Pluggable template rendering engine
pub trait TemplateBackend {
    /// Template type produced by this backend
    type Template;

    /// Name the backend is registered under
    fn name(&self) -> &str;

    /// Subdirectory of an application searched for templates
    fn app_dirname(&self) -> &'static str;

    /// Directories searched for templates, in priority order
    fn template_dirs(&self) -> &[PathBuf];

    /// Candidate files for `template_name`, one per template directory
    ///
    /// Names that would resolve outside a directory are skipped for it.
    fn iter_template_filenames<'a>(
        &'a self,
        template_name: &'a str,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        self.template_dirs()
            .iter()
            .filter_map(move |dir| safe_join(dir, template_name))
    }

    /// Wrap literal source in a template
    fn from_string(&self, template_code: &str) -> Self::Template;

    /// Locate a template by name on the search path
    fn get_template(&self, template_name: &str) -> Result<Self::Template>;
}

/// Join `name` onto `base`, refusing results that escape `base`
///
/// The check is lexical: absolute names and `..` components that climb above
/// `base` are rejected.
pub fn safe_join(base: &Path, name: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(base.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_join_plain_name() {
        assert_eq!(
            safe_join(Path::new("templates"), "reports/monthly.typ"),
            Some(PathBuf::from("templates/reports/monthly.typ"))
        );
    }

    #[test]
    fn test_safe_join_normalizes_inner_parent() {
        assert_eq!(
            safe_join(Path::new("templates"), "reports/../invoice.typ"),
            Some(PathBuf::from("templates/invoice.typ"))
        );
    }

    #[test]
    fn test_safe_join_rejects_escape() {
        assert_eq!(safe_join(Path::new("templates"), "../secrets.typ"), None);
        assert_eq!(safe_join(Path::new("templates"), "a/../../b.typ"), None);
    }

    #[test]
    fn test_safe_join_rejects_absolute() {
        assert_eq!(safe_join(Path::new("templates"), "/etc/passwd"), None);
    }

    #[test]
    fn test_safe_join_rejects_empty() {
        assert_eq!(safe_join(Path::new("templates"), ""), None);
        assert_eq!(safe_join(Path::new("templates"), "./"), None);
    }
}
