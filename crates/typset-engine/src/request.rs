//! HTTP request snapshot placed in a template context
//!
//! Only the fields a document typically needs are carried: paths, method,
//! content type and headers. Query and form data are not modeled.

use std::collections::BTreeMap;

/// The parts of an incoming HTTP request exposed to templates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRequest {
    /// Full request path, including any script prefix
    pub path: String,
    /// Path relative to the application mount point
    pub path_info: String,
    /// Upper-case HTTP method
    pub method: String,
    /// Media type of the body, lower-cased, without parameters
    pub content_type: String,
    /// Parameters of the `Content-Type` header (e.g. `charset`)
    pub content_params: BTreeMap<String, String>,
    /// Request headers keyed by Title-Case name
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    /// Create a request for `method` on `path`
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path_info: path.clone(),
            path,
            method: method.as_ref().to_ascii_uppercase(),
            ..Self::default()
        }
    }

    /// Mount the application under `prefix`; `path` becomes `prefix + path_info`
    pub fn with_script_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        self.path = format!("{}{}", prefix, self.path_info);
        self
    }

    /// Add a header; repeated names are joined with `", "`
    ///
    /// A `Content-Type` header also sets [`content_type`](Self::content_type)
    /// and [`content_params`](Self::content_params).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = title_case_header(name);

        if name == "Content-Type" {
            let (content_type, params) = parse_content_type(value);
            self.content_type = content_type;
            self.content_params = params;
        }

        self.headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    /// Snapshot an [`http::Request`]
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        let mut snapshot = HttpRequest::new(request.method().as_str(), request.uri().path());
        for (name, value) in request.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            snapshot = snapshot.with_header(name.as_str(), &value);
        }
        snapshot
    }
}

impl<B> From<&http::Request<B>> for HttpRequest {
    fn from(request: &http::Request<B>) -> Self {
        HttpRequest::from_http(request)
    }
}

/// `content-type` -> `Content-Type`
fn title_case_header(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Split a `Content-Type` value into media type and parameters
pub fn parse_content_type(value: &str) -> (String, BTreeMap<String, String>) {
    let mut parts = value.split(';');
    let media_type = parts
        .next()
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let params = parts
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"').to_string();
            Some((key, value))
        })
        .collect();

    (media_type, params)
}
