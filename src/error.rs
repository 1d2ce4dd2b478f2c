//! Error taxonomy for the dispatch core.
//!
//! Each component owns one error enum: construction-time errors
//! (`RouteError`, `FilterError`) are programming errors in route/filter
//! declarations and fail fast; dispatch-time errors (`RouterError`,
//! `ResolverError`) are recoverable through a fallback, otherwise they
//! propagate to the caller.

use std::fmt;

/// Boxed error produced by controller actions, filters, and bound
/// target handlers. The pipeline rethrows these unmodified.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Route declaration error
///
/// Returned by `Route::new` and `Target::classify` when a condition
/// string or target value cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Condition string lacks a recognized `<type>:` prefix
    ///
    /// Recognized prefixes are `url`, `tpl`, `template`, `post`, `get`
    /// and `session` (case-insensitive).
    BadCondition {
        /// The offending condition expression
        expr: String,
    },
    /// Target looks like a template file but does not exist on disk
    TemplateMissing {
        /// Path relative to the context's template root
        path: String,
    },
    /// Target value matched none of the recognized target shapes
    TargetNotResolvable {
        /// Textual form of the rejected target
        target: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::BadCondition { expr } => {
                write!(
                    f,
                    "route condition '{}' has no recognized type prefix. \
                    Expected one of url:, tpl:, template:, post:, get:, session:",
                    expr
                )
            }
            RouteError::TemplateMissing { path } => {
                write!(
                    f,
                    "route target '{}' names a template file that does not exist",
                    path
                )
            }
            RouteError::TargetNotResolvable { target } => {
                write!(
                    f,
                    "route target '{}' is not resolvable. Expected a template \
                    file, an absolute URL, a condition string, or a \
                    Controller::method reference",
                    target
                )
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Router input or dispatch error
#[derive(Debug)]
pub enum RouterError {
    /// A route definition inside `Router::add` could not be normalized
    BadRouteDef {
        /// Index of the offending definition within the supplied list
        index: usize,
        /// What was wrong with it
        reason: String,
    },
    /// A target kind with no built-in dispatch was executed without a binding
    UnboundTarget {
        /// Name of the target kind
        kind: &'static str,
    },
    /// A route-by-name redirect referenced a condition no route declares
    NoSuchRoute {
        /// The primary condition string that was searched for
        condition: String,
    },
    /// Route-to-route redirects exceeded the configured depth limit
    RedirectLoop {
        /// The depth limit that was hit
        limit: usize,
    },
    /// An `Error`-valued fallback was applied
    FallbackError {
        /// Message carried by the fallback
        message: String,
    },
    /// An include target failed to render
    Include {
        /// Path of the template file
        path: String,
        /// Render error text
        message: String,
    },
    /// Route construction failed while normalizing a definition
    Route(RouteError),
    /// A bound target handler, callable, or closure failed
    Dispatch(ActionError),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::BadRouteDef { index, reason } => {
                write!(f, "malformed route definition at index {}: {}", index, reason)
            }
            RouterError::UnboundTarget { kind } => {
                write!(
                    f,
                    "target kind '{}' is not supported by static dispatch; \
                    bind a handler for it",
                    kind
                )
            }
            RouterError::NoSuchRoute { condition } => {
                write!(f, "no route declares primary condition '{}'", condition)
            }
            RouterError::RedirectLoop { limit } => {
                write!(
                    f,
                    "route redirect depth exceeded the limit of {}",
                    limit
                )
            }
            RouterError::FallbackError { message } => write!(f, "{}", message),
            RouterError::Include { path, message } => {
                write!(f, "failed to render include '{}': {}", path, message)
            }
            RouterError::Route(e) => write!(f, "{}", e),
            RouterError::Dispatch(e) => write!(f, "target dispatch failed: {}", e),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Route(e) => Some(e),
            RouterError::Dispatch(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<RouteError> for RouterError {
    fn from(e: RouteError) -> Self {
        RouterError::Route(e)
    }
}

/// Filter declaration error
///
/// The filter value itself is typed (`Filterable` or a named closure),
/// so shape errors are caught at compile time; what remains is
/// construction-time misuse of the scoping options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A filter must carry a non-empty name for detach-by-identity
    EmptyName,
    /// An `on` entry is not a plausible HTTP method token
    InvalidMethod {
        /// The rejected token
        token: String,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::EmptyName => {
                write!(f, "filter name must not be empty")
            }
            FilterError::InvalidMethod { token } => {
                write!(
                    f,
                    "filter 'on' entry '{}' is not a valid HTTP method pattern",
                    token
                )
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Resolver registration or dispatch error
#[derive(Debug)]
pub enum ResolverError {
    /// Referenced controller key was never registered
    UnknownController {
        /// The unknown key
        key: String,
    },
    /// No registered action satisfied the lookup expression
    UnknownAction {
        /// The lookup expression
        expr: String,
    },
    /// An exact `controller::method` lookup matched more than one action
    Ambiguous {
        /// The lookup expression
        expr: String,
        /// Every action key that matched
        candidates: Vec<String>,
    },
    /// A controller declared an action name the registry cannot hold
    InvalidAction {
        /// Controller key
        controller: String,
        /// The rejected method name
        method: String,
    },
    /// A registration exclude pattern is not a valid regex
    BadExclude {
        /// The rejected pattern
        pattern: String,
    },
    /// An action returned a value the resolution policy cannot interpret
    Uninterpretable {
        /// Action key that produced the value
        action: String,
    },
    /// An action failed; the underlying error is rethrown unmodified
    ActionFailed {
        /// Action key that failed
        action: String,
        /// The action's own error
        source: ActionError,
    },
    /// A filter failed; filters are not error boundaries
    FilterFailed {
        /// Name of the failing filter unit
        filter: String,
        /// The filter's own error
        source: ActionError,
    },
    /// Router delegation failed
    Router(RouterError),
    /// Filter declaration failed during registration
    Filter(FilterError),
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverError::UnknownController { key } => {
                write!(f, "controller '{}' is not registered", key)
            }
            ResolverError::UnknownAction { expr } => {
                write!(f, "no registered action matches '{}'", expr)
            }
            ResolverError::Ambiguous { expr, candidates } => {
                write!(
                    f,
                    "lookup '{}' is ambiguous; it matches {} actions: {}",
                    expr,
                    candidates.len(),
                    candidates.join(", ")
                )
            }
            ResolverError::InvalidAction { controller, method } => {
                write!(
                    f,
                    "controller '{}' declares invalid action name '{}'",
                    controller, method
                )
            }
            ResolverError::BadExclude { pattern } => {
                write!(f, "exclude pattern '{}' is not a valid regex", pattern)
            }
            ResolverError::Uninterpretable { action } => {
                write!(
                    f,
                    "action '{}' returned a non-interpretable value",
                    action
                )
            }
            ResolverError::ActionFailed { action, source } => {
                write!(f, "action '{}' failed: {}", action, source)
            }
            ResolverError::FilterFailed { filter, source } => {
                write!(f, "filter '{}' failed: {}", filter, source)
            }
            ResolverError::Router(e) => write!(f, "{}", e),
            ResolverError::Filter(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ResolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolverError::ActionFailed { source, .. } => Some(source.as_ref()),
            ResolverError::FilterFailed { source, .. } => Some(source.as_ref()),
            ResolverError::Router(e) => Some(e),
            ResolverError::Filter(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RouterError> for ResolverError {
    fn from(e: RouterError) -> Self {
        ResolverError::Router(e)
    }
}

impl From<FilterError> for ResolverError {
    fn from(e: FilterError) -> Self {
        ResolverError::Filter(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_offending_input() {
        let e = RouteError::BadCondition {
            expr: "bogus:/x".to_string(),
        };
        assert!(e.to_string().contains("bogus:/x"));

        let e = ResolverError::Ambiguous {
            expr: "users::list".to_string(),
            candidates: vec!["admin.users::list".into(), "front.users::list".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("admin.users::list"));
        assert!(msg.contains("front.users::list"));
    }

    #[test]
    fn router_error_wraps_route_error() {
        let e: RouterError = RouteError::TemplateMissing {
            path: "missing.html".to_string(),
        }
        .into();
        assert!(matches!(e, RouterError::Route(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
