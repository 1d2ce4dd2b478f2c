//! Response sink boundary.
//!
//! The dispatch core never writes transport bytes; results are handed
//! to a [`Response`] implementation. [`BufferedResponse`] accumulates
//! everything in memory for embedders without a transport and for the
//! test suites.

use serde_json::Value;

/// Write access to the outbound response.
pub trait Response {
    /// Fold a result into the response, optionally under a key.
    ///
    /// Multi-action dispatch calls this once per executed action.
    fn add(&mut self, key: Option<&str>, value: Value);

    /// Append terminal output to the response body.
    fn send(&mut self, data: &str);

    /// Record an HTTP redirect to an absolute URL.
    fn redirect(&mut self, location: &str);

    /// Drain the accumulated output into its final string form.
    fn flush(&mut self) -> String;
}

/// In-memory [`Response`] implementation.
///
/// Body text accumulates in order; keyed parts are retained separately
/// and appended (stringified) on flush.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    parts: Vec<(Option<String>, Value)>,
    body: String,
    status: u16,
    location: Option<String>,
}

impl BufferedResponse {
    /// Create an empty response with status 200.
    #[must_use]
    pub fn new() -> Self {
        BufferedResponse {
            parts: Vec::new(),
            body: String::new(),
            status: 200,
            location: None,
        }
    }

    /// The response status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Redirect location, when one was recorded.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Parts accumulated through [`Response::add`].
    #[must_use]
    pub fn parts(&self) -> &[(Option<String>, Value)] {
        &self.parts
    }

    fn stringify(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Response for BufferedResponse {
    fn add(&mut self, key: Option<&str>, value: Value) {
        self.parts.push((key.map(|k| k.to_string()), value));
    }

    fn send(&mut self, data: &str) {
        self.body.push_str(data);
    }

    fn redirect(&mut self, location: &str) {
        self.status = 302;
        self.location = Some(location.to_string());
    }

    fn flush(&mut self) -> String {
        let mut out = std::mem::take(&mut self.body);
        for (_, value) in self.parts.drain(..) {
            out.push_str(&Self::stringify(&value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flush_drains_body_then_parts() {
        let mut res = BufferedResponse::new();
        res.send("head:");
        res.add(Some("a"), json!("one"));
        res.add(None, json!(2));
        assert_eq!(res.flush(), "head:one2");
        assert_eq!(res.flush(), "");
    }

    #[test]
    fn redirect_records_status_and_location() {
        let mut res = BufferedResponse::new();
        res.redirect("https://example.com/404");
        assert_eq!(res.status(), 302);
        assert_eq!(res.location(), Some("https://example.com/404"));
    }
}
