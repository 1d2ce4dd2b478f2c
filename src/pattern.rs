//! Wildcard pattern compilation.
//!
//! One shared compiler turns the SQL-LIKE matching DSL (`%foo%`, `%foo`,
//! `foo%`, plain text, or a full regex) into a predicate. The router,
//! the resolver's action lookup, and filter scoping all match through
//! this module so their semantics stay identical.
//!
//! Compilation happens once at declaration time; matching is a cheap
//! case-insensitive test. Patterns are data, never executed as code.

use regex::Regex;
use tracing::debug;

/// A compiled matching predicate.
///
/// Built with [`Pattern::compile`]; evaluated with [`Pattern::matches`].
/// All variants match case-insensitively.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches every candidate
    Any,
    /// Case-insensitive equality
    Exact(String),
    /// Candidate contains the fragment (`%x%`)
    Contains(String),
    /// Candidate starts with the fragment (`x%`)
    StartsWith(String),
    /// Candidate ends with the fragment (`%x` or `*x`)
    EndsWith(String),
    /// Anchored case-insensitive regex (plain text and full regex forms)
    Regex(Regex),
}

impl Pattern {
    /// Compile a wildcard expression into a predicate.
    ///
    /// Rules, in priority order:
    ///
    /// 1. An expression containing `%` is SQL-LIKE: `%x%` means
    ///    "contains x", `%x` "ends with x", `x%` "starts with x", and a
    ///    bare `%` matches everything. Any other placement of `%` falls
    ///    back to exact comparison.
    /// 2. An expression that is empty once the wildcard markers `*`, `.`
    ///    and `:` are trimmed matches everything.
    /// 3. A leading `*` means "ends with"; any other text compiles to an
    ///    anchored case-insensitive regex, so full regex expressions are
    ///    honored. Text that fails to compile as a regex degrades to an
    ///    exact comparison.
    #[must_use]
    pub fn compile(expr: &str) -> Self {
        if expr.contains('%') {
            let inner = expr.trim_matches('%');
            if inner.is_empty() {
                return Pattern::Any;
            }
            return match (expr.starts_with('%'), expr.ends_with('%')) {
                (true, true) => Pattern::Contains(inner.to_ascii_lowercase()),
                (true, false) => Pattern::EndsWith(inner.to_ascii_lowercase()),
                (false, true) => Pattern::StartsWith(inner.to_ascii_lowercase()),
                // Interior '%' has no LIKE reading; compare verbatim.
                (false, false) => Pattern::Exact(expr.to_ascii_lowercase()),
            };
        }

        if expr.trim_matches(|c| c == '*' || c == '.' || c == ':').is_empty() {
            return Pattern::Any;
        }

        if let Some(rest) = expr.strip_prefix('*') {
            return Pattern::EndsWith(rest.to_ascii_lowercase());
        }

        match Regex::new(&format!("(?i)^{}$", expr)) {
            Ok(re) => Pattern::Regex(re),
            Err(e) => {
                debug!(expr = %expr, error = %e, "pattern is not a valid regex, using exact match");
                Pattern::Exact(expr.to_ascii_lowercase())
            }
        }
    }

    /// Test a candidate string against the compiled pattern.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(s) => candidate.eq_ignore_ascii_case(s),
            Pattern::Contains(s) => candidate.to_ascii_lowercase().contains(s.as_str()),
            Pattern::StartsWith(s) => candidate.to_ascii_lowercase().starts_with(s.as_str()),
            Pattern::EndsWith(s) => candidate.to_ascii_lowercase().ends_with(s.as_str()),
            Pattern::Regex(re) => re.is_match(candidate),
        }
    }
}
