use crate::context::DispatchContext;
use crate::error::{ActionError, FilterError};
use crate::pattern::Pattern;
use crate::request::Request;
use crate::response::Response;
use crate::Params;
use http::Method;
use std::sync::Arc;
use tracing::trace;

/// Phase a filter runs in relative to the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    /// Runs before the action
    Before,
    /// Runs after the action
    After,
}

/// Scoping options for a [`FilterUnit`].
///
/// Explicit structured configuration: every field has a default and a
/// builder method. When neither phase is requested the unit defaults
/// to the before phase.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Run in the before phase
    pub before: bool,
    /// Run in the after phase
    pub after: bool,
    /// Action-name patterns that must ALL match (conjunctive)
    pub only: Vec<String>,
    /// Action-name patterns of which ANY match skips the filter
    pub except: Vec<String>,
    /// HTTP-method patterns of which one must match the request
    pub on: Vec<String>,
}

impl FilterOptions {
    /// Empty options; equivalent to `Default::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the before phase.
    #[must_use]
    pub fn before(mut self) -> Self {
        self.before = true;
        self
    }

    /// Request the after phase.
    #[must_use]
    pub fn after(mut self) -> Self {
        self.after = true;
        self
    }

    /// Restrict to action names matching every given pattern.
    #[must_use]
    pub fn only<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Skip action names matching any given pattern.
    #[must_use]
    pub fn except<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to requests whose HTTP method matches one pattern.
    #[must_use]
    pub fn on<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on = methods.into_iter().map(Into::into).collect();
        self
    }
}

/// A filter implementation attachable to a controller or the resolver.
///
/// `execute` errors propagate unmodified; filters are not error
/// boundaries.
pub trait Filterable: Send + Sync {
    /// Identity used for detach-by-name.
    fn name(&self) -> &str;

    /// Run the filter around an action execution.
    fn execute(
        &self,
        ctx: &DispatchContext,
        req: &dyn Request,
        resp: &mut dyn Response,
        params: &Params,
    ) -> Result<(), ActionError>;
}

/// Closure form of a filter body.
pub type FilterFn = Arc<
    dyn Fn(&DispatchContext, &dyn Request, &mut dyn Response, &Params) -> Result<(), ActionError>
        + Send
        + Sync,
>;

#[derive(Clone)]
enum FilterImpl {
    Object(Arc<dyn Filterable>),
    Closure(FilterFn),
}

/// A filter plus its compiled scoping.
///
/// Immutable once built; removal from a pipeline is by `name` identity.
#[derive(Clone)]
pub struct FilterUnit {
    name: String,
    filter: FilterImpl,
    before: bool,
    after: bool,
    only: Vec<Pattern>,
    except: Vec<Pattern>,
    on: Vec<Pattern>,
}

impl std::fmt::Debug for FilterUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterUnit")
            .field("name", &self.name)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

impl FilterUnit {
    /// Wrap a [`Filterable`] object; the unit takes the object's name.
    pub fn new(filter: Arc<dyn Filterable>, options: FilterOptions) -> Result<Self, FilterError> {
        let name = filter.name().to_string();
        Self::build(name, FilterImpl::Object(filter), options)
    }

    /// Wrap a closure under an explicit name.
    pub fn from_fn<F>(
        name: impl Into<String>,
        options: FilterOptions,
        f: F,
    ) -> Result<Self, FilterError>
    where
        F: Fn(&DispatchContext, &dyn Request, &mut dyn Response, &Params) -> Result<(), ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self::build(name.into(), FilterImpl::Closure(Arc::new(f)), options)
    }

    fn build(name: String, filter: FilterImpl, options: FilterOptions) -> Result<Self, FilterError> {
        if name.trim().is_empty() {
            return Err(FilterError::EmptyName);
        }
        for token in &options.on {
            let plausible = token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '%' | '*' | '|' | '(' | ')'));
            if token.is_empty() || !plausible {
                return Err(FilterError::InvalidMethod {
                    token: token.clone(),
                });
            }
        }

        // No phase requested means the before phase.
        let (before, after) = if !options.before && !options.after {
            (true, false)
        } else {
            (options.before, options.after)
        };

        Ok(FilterUnit {
            name,
            filter,
            before,
            after,
            only: options.only.iter().map(|p| Pattern::compile(p)).collect(),
            except: options.except.iter().map(|p| Pattern::compile(p)).collect(),
            on: options.on.iter().map(|p| Pattern::compile(p)).collect(),
        })
    }

    /// Identity used for detach-by-name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the unit participates in the given phase.
    #[must_use]
    pub fn in_phase(&self, phase: FilterPhase) -> bool {
        match phase {
            FilterPhase::Before => self.before,
            FilterPhase::After => self.after,
        }
    }

    /// Decide whether the filter applies to an action execution.
    ///
    /// `on` is checked against the request method first, then `only`
    /// (every pattern must match) and `except` (any match rejects).
    #[must_use]
    pub fn matches(&self, action: &str, method: Option<&Method>) -> bool {
        if !self.on.is_empty() {
            let hit = method
                .map(|m| self.on.iter().any(|p| p.matches(m.as_str())))
                .unwrap_or(false);
            if !hit {
                trace!(filter = %self.name, action = %action, "filter skipped: method not in 'on'");
                return false;
            }
        }

        if !self.only.is_empty() && !self.only.iter().all(|p| p.matches(action)) {
            trace!(filter = %self.name, action = %action, "filter skipped: 'only' not satisfied");
            return false;
        }

        if self.except.iter().any(|p| p.matches(action)) {
            trace!(filter = %self.name, action = %action, "filter skipped: 'except' matched");
            return false;
        }

        true
    }

    /// Run the wrapped filter.
    pub fn execute(
        &self,
        ctx: &DispatchContext,
        req: &dyn Request,
        resp: &mut dyn Response,
        params: &Params,
    ) -> Result<(), ActionError> {
        match &self.filter {
            FilterImpl::Object(obj) => obj.execute(ctx, req, resp, params),
            FilterImpl::Closure(f) => f(ctx, req, resp, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(options: FilterOptions) -> FilterUnit {
        FilterUnit::from_fn("t", options, |_, _, _, _| Ok(())).expect("valid filter")
    }

    #[test]
    fn default_phase_is_before() {
        let f = unit(FilterOptions::new());
        assert!(f.in_phase(FilterPhase::Before));
        assert!(!f.in_phase(FilterPhase::After));
    }

    #[test]
    fn both_phases_may_be_requested() {
        let f = unit(FilterOptions::new().before().after());
        assert!(f.in_phase(FilterPhase::Before));
        assert!(f.in_phase(FilterPhase::After));
    }

    #[test]
    fn except_rejects_on_any_match() {
        let f = unit(FilterOptions::new().except(["admin%"]));
        assert!(!f.matches("admin.users::list", None));
        assert!(f.matches("front.home::index", None));
    }

    #[test]
    fn only_is_conjunctive() {
        // Both patterns must match; mirrors the asymmetry with 'except'.
        let f = unit(FilterOptions::new().only(["%users%", "%list"]));
        assert!(f.matches("admin.users::list", None));
        assert!(!f.matches("admin.users::edit", None));
    }

    #[test]
    fn on_requires_a_method_match() {
        let f = unit(FilterOptions::new().on(["post"]));
        assert!(f.matches("a::b", Some(&Method::POST)));
        assert!(!f.matches("a::b", Some(&Method::GET)));
        assert!(!f.matches("a::b", None));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = FilterUnit::from_fn("  ", FilterOptions::new(), |_, _, _, _| Ok(()));
        assert!(matches!(err, Err(FilterError::EmptyName)));
    }

    #[test]
    fn bad_on_token_is_rejected() {
        let err = FilterUnit::from_fn("f", FilterOptions::new().on(["not a method!"]), |_, _, _, _| {
            Ok(())
        });
        assert!(matches!(err, Err(FilterError::InvalidMethod { .. })));
    }
}
