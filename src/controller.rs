//! Controller boundary.
//!
//! A controller is an object exposing a declared table of named actions
//! plus optional `before`/`after` filter lists. The table is explicit:
//! [`Controller::actions`] names the registrable methods and
//! [`Controller::invoke`] dispatches to them, returning a typed error
//! for unknown names instead of any magic fallthrough.
//!
//! Actions communicate their outcome through [`ActionReturn`]; the
//! resolver normalizes that into a [`Resolved`] value (see the
//! return-value resolution policy on `Resolver::execute`).

use crate::error::ActionError;
use crate::filter::FilterUnit;
use crate::request::Request;
use crate::response::Response;
use crate::Params;
use serde_json::Value;
use std::sync::Arc;

/// A renderable text producer (view/template object).
pub trait Renderable: Send + Sync {
    /// Render to text for the given request and bound params.
    fn render(&self, req: &dyn Request, params: &Params) -> String;
}

/// Deferred action result, invoked with no arguments during resolution.
pub type DeferredFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Raw return value of an action, closure, or callable target.
#[derive(Clone)]
pub enum ActionReturn {
    /// No output (the `false`/`null` case)
    None,
    /// Plain text output
    Text(String),
    /// A scalar value, stringified during resolution
    Scalar(Value),
    /// A view object, rendered during resolution
    View(Arc<dyn Renderable>),
    /// A deferred computation, invoked during resolution
    Deferred(DeferredFn),
    /// Output was written directly to the response sink
    Response,
}

impl std::fmt::Debug for ActionReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionReturn::None => write!(f, "None"),
            ActionReturn::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ActionReturn::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            ActionReturn::View(_) => write!(f, "View(..)"),
            ActionReturn::Deferred(_) => write!(f, "Deferred(..)"),
            ActionReturn::Response => write!(f, "Response"),
        }
    }
}

impl From<&str> for ActionReturn {
    fn from(s: &str) -> Self {
        ActionReturn::Text(s.to_string())
    }
}

impl From<String> for ActionReturn {
    fn from(s: String) -> Self {
        ActionReturn::Text(s)
    }
}

impl From<Value> for ActionReturn {
    fn from(v: Value) -> Self {
        ActionReturn::Scalar(v)
    }
}

/// Normalized, sendable result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// No output
    None,
    /// Rendered text
    Text(String),
    /// A redirect was emitted through the response sink
    Redirect(String),
    /// The response sink carries the output
    Response,
}

impl Resolved {
    /// Text form of the resolved value, empty for non-text outcomes.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Resolved::Text(s) => s,
            _ => "",
        }
    }
}

/// An object exposing registrable actions.
///
/// Implementations declare their action table up front and route
/// invocations through an explicit match; the resolver never inspects
/// the type beyond this surface.
///
/// # Example
///
/// ```rust,ignore
/// struct Hello;
///
/// impl Controller for Hello {
///     fn key(&self) -> &str {
///         "hello"
///     }
///     fn actions(&self) -> Vec<&'static str> {
///         vec!["hello"]
///     }
///     fn invoke(
///         &self,
///         action: &str,
///         _params: &Params,
///         _req: &dyn Request,
///         _resp: &mut dyn Response,
///     ) -> Result<ActionReturn, ActionError> {
///         match action {
///             "hello" => Ok(ActionReturn::from("hi")),
///             other => Err(format!("unknown action '{other}'").into()),
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Dotted, lowercase controller path used as the registry prefix
    /// (e.g. `admin.users`).
    fn key(&self) -> &str;

    /// Names of the actions this controller declares.
    fn actions(&self) -> Vec<&'static str>;

    /// Dispatch a declared action by name.
    ///
    /// Unknown names must return an error; the resolver only calls
    /// names taken from [`Controller::actions`], so hitting that arm
    /// indicates a table/dispatch mismatch in the implementation.
    fn invoke(
        &self,
        action: &str,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<ActionReturn, ActionError>;

    /// Filters to run before each of this controller's actions.
    fn before(&self) -> Vec<FilterUnit> {
        Vec::new()
    }

    /// Filters to run after each of this controller's actions.
    fn after(&self) -> Vec<FilterUnit> {
        Vec::new()
    }
}
