//! Request boundary.
//!
//! The dispatch core never owns a wire format; it consumes requests
//! through the narrow [`Request`] trait. [`MemoryRequest`] is the
//! in-memory implementation used by embedders without a transport and
//! by the test suites.

use http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Scope a request parameter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamScope {
    /// Query-string parameters
    Get,
    /// Form/body parameters
    Post,
    /// Cookie values
    Cookie,
    /// Server/transport metadata
    Server,
    /// Per-session storage
    Session,
}

/// Read access to an inbound request.
///
/// Route condition matching and filter `on` checks consume exactly this
/// surface; the transport behind it is out of scope.
pub trait Request {
    /// The request's URL path (no query string).
    fn url_path(&self) -> &str;

    /// The HTTP method.
    fn http_method(&self) -> &Method;

    /// Name of the active template, when the host runtime tracks one.
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// Scope-keyed parameter lookup.
    fn param(&self, name: &str, scope: ParamScope) -> Option<&Value>;

    /// Scope-keyed lookup with a caller-supplied default.
    fn param_or<'a>(&'a self, name: &str, scope: ParamScope, default: &'a Value) -> &'a Value {
        self.param(name, scope).unwrap_or(default)
    }
}

/// In-memory [`Request`] implementation.
///
/// # Example
///
/// ```
/// use http::Method;
/// use waypoint::request::{MemoryRequest, ParamScope, Request};
///
/// let req = MemoryRequest::new(Method::GET, "/pets/12")
///     .with_query_string("debug=true&limit=10")
///     .with_param(ParamScope::Session, "user", "u-1");
/// assert_eq!(req.url_path(), "/pets/12");
/// assert!(req.param("debug", ParamScope::Get).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRequest {
    method: Method,
    path: String,
    template: Option<String>,
    scopes: HashMap<ParamScope, HashMap<String, Value>>,
}

impl MemoryRequest {
    /// Create a request with the given method and URL path.
    ///
    /// A query string on the path is split off and parsed into the
    /// `Get` scope.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let raw: String = path.into();
        let (path, query) = match raw.find('?') {
            Some(pos) => (raw[..pos].to_string(), Some(raw[pos + 1..].to_string())),
            None => (raw, None),
        };
        let mut req = MemoryRequest {
            method,
            path,
            template: None,
            scopes: HashMap::new(),
        };
        if let Some(q) = query {
            req = req.with_query_string(&q);
        }
        req
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Set the active template name.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Bind a parameter into a scope.
    #[must_use]
    pub fn with_param(
        mut self,
        scope: ParamScope,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    /// Parse a query string into the `Get` scope.
    ///
    /// Names and values are URL-decoded; duplicate names keep the last
    /// occurrence.
    #[must_use]
    pub fn with_query_string(mut self, query: &str) -> Self {
        let scope = self.scopes.entry(ParamScope::Get).or_default();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            scope.insert(k.to_string(), Value::String(v.to_string()));
        }
        self
    }
}

impl Request for MemoryRequest {
    fn url_path(&self) -> &str {
        &self.path
    }

    fn http_method(&self) -> &Method {
        &self.method
    }

    fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn param(&self, name: &str, scope: ParamScope) -> Option<&Value> {
        self.scopes.get(&scope).and_then(|m| m.get(name))
    }
}
