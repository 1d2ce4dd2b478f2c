use crate::context::DispatchContext;
use crate::controller::{ActionReturn, Renderable};
use crate::error::{ActionError, RouteError};
use crate::pattern::Pattern;
use crate::request::{ParamScope, Request};
use crate::Params;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shape of a `Controller::method` / `Controller.method` target string.
static ACTION_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*(?:::|\.)[A-Za-z_][A-Za-z0-9_]*$")
        .expect("action shape regex is valid")
});

/// Type of a route match condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// Matches the request URL path
    Url,
    /// Matches the active template name
    Template,
    /// Matches a POST-scope parameter
    Post,
    /// Matches a GET-scope parameter
    Get,
    /// Matches a session-scope parameter
    Session,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionKind::Url => "url",
            ConditionKind::Template => "template",
            ConditionKind::Post => "post",
            ConditionKind::Get => "get",
            ConditionKind::Session => "session",
        };
        write!(f, "{}", s)
    }
}

impl ConditionKind {
    /// Split `<type>:<pattern>` and recognize the type prefix.
    ///
    /// Returns the kind and the pattern remainder, or `None` when the
    /// prefix is absent or unrecognized.
    #[must_use]
    pub fn split_prefix(expr: &str) -> Option<(Self, &str)> {
        let (prefix, rest) = expr.split_once(':')?;
        let kind = match prefix.to_ascii_lowercase().as_str() {
            "url" => ConditionKind::Url,
            "tpl" | "template" => ConditionKind::Template,
            "post" => ConditionKind::Post,
            "get" => ConditionKind::Get,
            "session" => ConditionKind::Session,
            _ => return None,
        };
        Some((kind, rest))
    }
}

/// One typed match condition of a route.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    raw: String,
    /// Compiled pattern for url/template kinds
    pattern: Option<Pattern>,
    /// Parameter name for the scope-keyed kinds
    key: Option<String>,
    /// Optional value pattern for the scope-keyed kinds (`key=pattern`)
    value: Option<Pattern>,
}

impl Condition {
    /// Parse a `<type>:<pattern>` condition string.
    pub fn parse(expr: &str) -> Result<Self, RouteError> {
        let (kind, rest) = ConditionKind::split_prefix(expr).ok_or_else(|| {
            RouteError::BadCondition {
                expr: expr.to_string(),
            }
        })?;

        match kind {
            ConditionKind::Url | ConditionKind::Template => Ok(Condition {
                kind,
                raw: expr.to_string(),
                pattern: Some(Pattern::compile(rest)),
                key: None,
                value: None,
            }),
            _ => {
                let (key, value) = match rest.split_once('=') {
                    Some((k, v)) => (k.trim(), Some(Pattern::compile(v))),
                    None => (rest.trim(), None),
                };
                if key.is_empty() {
                    return Err(RouteError::BadCondition {
                        expr: expr.to_string(),
                    });
                }
                Ok(Condition {
                    kind,
                    raw: expr.to_string(),
                    pattern: None,
                    key: Some(key.to_string()),
                    value,
                })
            }
        }
    }

    /// The condition's type.
    #[must_use]
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// The original `<type>:<pattern>` string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Test the condition against a request facet.
    #[must_use]
    pub fn matches(&self, req: &dyn Request) -> bool {
        match self.kind {
            ConditionKind::Url => self
                .pattern
                .as_ref()
                .map(|p| p.matches(req.url_path()))
                .unwrap_or(false),
            ConditionKind::Template => match (self.pattern.as_ref(), req.template_name()) {
                (Some(p), Some(name)) => p.matches(name),
                _ => false,
            },
            ConditionKind::Post | ConditionKind::Get | ConditionKind::Session => {
                let scope = match self.kind {
                    ConditionKind::Post => ParamScope::Post,
                    ConditionKind::Get => ParamScope::Get,
                    _ => ParamScope::Session,
                };
                let key = match self.key.as_deref() {
                    Some(k) => k,
                    None => return false,
                };
                match req.param(key, scope) {
                    Some(value) => match &self.value {
                        Some(p) => {
                            let text = match value {
                                serde_json::Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            p.matches(&text)
                        }
                        // Bare key: presence is enough.
                        None => true,
                    },
                    None => false,
                }
            }
        }
    }
}

/// Classified type of a route's execution target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Render a template file with the bound params
    Include,
    /// Redirect to an absolute URL
    Url,
    /// Redirect to another route by its primary condition string
    Route,
    /// Dispatch a controller action through a binding
    Action,
    /// Invoke a callable object
    Callable,
    /// Invoke a closure
    Closure,
    /// Render a renderable object
    Renderable,
    /// No target
    None,
}

impl TargetKind {
    /// Stable name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TargetKind::Include => "include",
            TargetKind::Url => "url",
            TargetKind::Route => "route",
            TargetKind::Action => "action",
            TargetKind::Callable => "callable",
            TargetKind::Closure => "closure",
            TargetKind::Renderable => "renderable",
            TargetKind::None => "none",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A callable route target.
pub trait RouteHandler: Send + Sync {
    /// Execute the target for a matched request.
    fn call(&self, req: &dyn Request, params: &Params) -> Result<ActionReturn, ActionError>;
}

/// Closure form of a route target.
pub type RouteClosure =
    Arc<dyn Fn(&dyn Request, &Params) -> Result<ActionReturn, ActionError> + Send + Sync>;

/// A route's classified execution target.
///
/// The kind is fixed at construction by [`Target::classify`] and never
/// changes afterwards.
#[derive(Clone)]
pub enum Target {
    /// Template file to render, resolved against the context root
    Include(PathBuf),
    /// Absolute URL to redirect to
    Url(url::Url),
    /// Primary condition string of the route to redirect to
    Route(String),
    /// Normalized `controller::method` action key
    Action(String),
    /// Callable object
    Callable(Arc<dyn RouteHandler>),
    /// Closure
    Closure(RouteClosure),
    /// Renderable object
    Renderable(Arc<dyn Renderable>),
    /// No target
    None,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Include(p) => f.debug_tuple("Include").field(p).finish(),
            Target::Url(u) => f.debug_tuple("Url").field(&u.as_str()).finish(),
            Target::Route(c) => f.debug_tuple("Route").field(c).finish(),
            Target::Action(a) => f.debug_tuple("Action").field(a).finish(),
            Target::Callable(_) => write!(f, "Callable(..)"),
            Target::Closure(_) => write!(f, "Closure(..)"),
            Target::Renderable(_) => write!(f, "Renderable(..)"),
            Target::None => write!(f, "None"),
        }
    }
}

impl Target {
    /// The target's classified kind.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Include(_) => TargetKind::Include,
            Target::Url(_) => TargetKind::Url,
            Target::Route(_) => TargetKind::Route,
            Target::Action(_) => TargetKind::Action,
            Target::Callable(_) => TargetKind::Callable,
            Target::Closure(_) => TargetKind::Closure,
            Target::Renderable(_) => TargetKind::Renderable,
            Target::None => TargetKind::None,
        }
    }

    /// Classify a target specification into its fixed kind.
    ///
    /// Textual targets are inspected in order: template file (must
    /// exist under the context's template root), absolute URL,
    /// condition-prefixed route reference, `Controller::method` shape.
    /// Non-textual specifications keep the kind they were built with.
    pub fn classify(ctx: &DispatchContext, spec: TargetSpec) -> Result<Self, RouteError> {
        let text = match spec {
            TargetSpec::Text(t) => t,
            TargetSpec::Callable(h) => return Ok(Target::Callable(h)),
            TargetSpec::Closure(c) => return Ok(Target::Closure(c)),
            TargetSpec::Renderable(r) => return Ok(Target::Renderable(r)),
            TargetSpec::None => return Ok(Target::None),
        };

        if ctx.is_template_path(&text) {
            let path = ctx.template_path(&text);
            if path.exists() {
                debug!(target = %text, path = %path.display(), "target classified as include");
                return Ok(Target::Include(path));
            }
            return Err(RouteError::TemplateMissing { path: text });
        }

        if let Ok(parsed) = url::Url::parse(&text) {
            // A bare scheme prefix (e.g. "session:user") also parses;
            // only host-carrying URLs count as redirect targets.
            if parsed.host().is_some() {
                debug!(target = %text, "target classified as url");
                return Ok(Target::Url(parsed));
            }
        }

        if ConditionKind::split_prefix(&text).is_some() {
            debug!(target = %text, "target classified as route reference");
            return Ok(Target::Route(text));
        }

        if ACTION_SHAPE.is_match(&text) {
            let key = normalize_action_key(&text);
            debug!(target = %text, key = %key, "target classified as action");
            return Ok(Target::Action(key));
        }

        Err(RouteError::TargetNotResolvable { target: text })
    }
}

/// Normalize `Controller.method` / `Controller::method` into the
/// registry's lowercase `controller::method` key form.
fn normalize_action_key(text: &str) -> String {
    let (controller, method) = match text.rsplit_once("::") {
        Some(pair) => pair,
        // Dots may appear inside the controller path, so the method is
        // the segment after the last one.
        None => match text.rsplit_once('.') {
            Some(pair) => pair,
            None => (text, ""),
        },
    };
    format!(
        "{}::{}",
        controller.to_ascii_lowercase(),
        method.to_ascii_lowercase()
    )
}

/// Input specification for a route target, prior to classification.
#[derive(Clone)]
pub enum TargetSpec {
    /// Textual target, classified by shape
    Text(String),
    /// Callable object
    Callable(Arc<dyn RouteHandler>),
    /// Closure
    Closure(RouteClosure),
    /// Renderable object
    Renderable(Arc<dyn Renderable>),
    /// No target
    None,
}

impl TargetSpec {
    /// Wrap a closure target.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&dyn Request, &Params) -> Result<ActionReturn, ActionError> + Send + Sync + 'static,
    {
        TargetSpec::Closure(Arc::new(f))
    }

    /// Wrap a callable object target.
    pub fn callable(handler: Arc<dyn RouteHandler>) -> Self {
        TargetSpec::Callable(handler)
    }

    /// Wrap a renderable object target.
    pub fn renderable(r: Arc<dyn Renderable>) -> Self {
        TargetSpec::Renderable(r)
    }
}

impl From<&str> for TargetSpec {
    fn from(s: &str) -> Self {
        TargetSpec::Text(s.to_string())
    }
}

impl From<String> for TargetSpec {
    fn from(s: String) -> Self {
        TargetSpec::Text(s)
    }
}

/// Condition storage; routes rarely carry more than four conditions.
pub type ConditionVec = SmallVec<[Condition; 4]>;

/// An immutable routing rule: AND-ed conditions, one classified
/// target, and bound params.
#[derive(Debug, Clone)]
pub struct Route {
    conditions: ConditionVec,
    target: Target,
    params: Params,
}

impl Route {
    /// Build a route from condition strings and a target specification.
    ///
    /// Fails when a condition string lacks a recognized type prefix or
    /// the target value cannot be classified.
    pub fn new<I, S>(
        ctx: &DispatchContext,
        conditions: I,
        target: impl Into<TargetSpec>,
        params: Params,
    ) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed: ConditionVec = SmallVec::new();
        for expr in conditions {
            parsed.push(Condition::parse(expr.as_ref())?);
        }
        let target = Target::classify(ctx, target.into())?;
        Ok(Route {
            conditions: parsed,
            target,
            params,
        })
    }

    /// The route's conditions, in declaration order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The classified target.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The classified target kind.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        self.target.kind()
    }

    /// Params bound at construction.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The first condition's raw string; routes are referenced by it
    /// in route-to-route redirects.
    #[must_use]
    pub fn primary_condition(&self) -> Option<&str> {
        self.conditions.first().map(|c| c.raw())
    }

    /// True when every condition matches the request.
    #[must_use]
    pub fn matches(&self, req: &dyn Request) -> bool {
        self.conditions.iter().all(|c| c.matches(req))
    }

    /// Bound params overlaid with redirect-time extras.
    #[must_use]
    pub fn merged_params(&self, extra: &Params) -> Params {
        let mut merged = self.params.clone();
        for (k, v) in extra {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// Hooks invoked by the router immediately around target execution.
///
/// All methods default to no-ops; install an implementation on the
/// router for telemetry or bookkeeping side effects.
pub trait RouteObserver: Send + Sync {
    /// Called just before a matched route's target executes.
    fn before_execute(&self, _route: &Route, _req: &dyn Request) {}

    /// Called just after a matched route's target executed.
    fn after_execute(&self, _route: &Route, _req: &dyn Request) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MemoryRequest;

    fn ctx() -> DispatchContext {
        DispatchContext::default()
    }

    #[test]
    fn condition_prefix_parsing() {
        assert_eq!(
            ConditionKind::split_prefix("url:/a"),
            Some((ConditionKind::Url, "/a"))
        );
        assert_eq!(
            ConditionKind::split_prefix("TPL:home"),
            Some((ConditionKind::Template, "home"))
        );
        assert_eq!(
            ConditionKind::split_prefix("template:home"),
            Some((ConditionKind::Template, "home"))
        );
        assert!(ConditionKind::split_prefix("bogus:/a").is_none());
        assert!(ConditionKind::split_prefix("noprefix").is_none());
    }

    #[test]
    fn bad_condition_fails_route_construction() {
        let err = Route::new(&ctx(), ["bogus:/a"], "https://example.com", Params::new());
        assert!(matches!(err, Err(RouteError::BadCondition { .. })));
    }

    #[test]
    fn url_condition_matches_with_wildcards() {
        let c = Condition::parse("url:%.rss").expect("parse");
        assert!(c.matches(&MemoryRequest::get("/feed/news.rss")));
        assert!(!c.matches(&MemoryRequest::get("/feed/news.atom")));
    }

    #[test]
    fn session_condition_checks_presence_and_value() {
        use crate::request::ParamScope;
        let present = Condition::parse("session:user").expect("parse");
        let valued = Condition::parse("session:role=admin%").expect("parse");

        let anon = MemoryRequest::get("/");
        let admin = MemoryRequest::get("/")
            .with_param(ParamScope::Session, "user", "u-1")
            .with_param(ParamScope::Session, "role", "admin.super");

        assert!(!present.matches(&anon));
        assert!(present.matches(&admin));
        assert!(valued.matches(&admin));
        assert!(!valued.matches(&anon));
    }

    #[test]
    fn absolute_url_target() {
        let t = Target::classify(&ctx(), TargetSpec::from("https://example.com/404"))
            .expect("classify");
        assert_eq!(t.kind(), TargetKind::Url);
    }

    #[test]
    fn condition_string_target_is_a_route_reference() {
        let t = Target::classify(&ctx(), TargetSpec::from("url:/somewhere")).expect("classify");
        assert_eq!(t.kind(), TargetKind::Route);
    }

    #[test]
    fn action_shape_targets_normalize() {
        for spec in ["Admin.Users::List", "admin.users.list"] {
            let t = Target::classify(&ctx(), TargetSpec::from(spec)).expect("classify");
            match t {
                Target::Action(key) => assert_eq!(key, "admin.users::list"),
                other => panic!("expected action, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_template_is_an_error() {
        let err = Target::classify(&ctx(), TargetSpec::from("definitely_missing.html"));
        assert!(matches!(err, Err(RouteError::TemplateMissing { .. })));
    }

    #[test]
    fn garbage_target_is_not_resolvable() {
        let err = Target::classify(&ctx(), TargetSpec::from("!!!"));
        assert!(matches!(err, Err(RouteError::TargetNotResolvable { .. })));
    }

    #[test]
    fn conjunctive_conditions_cannot_both_hold() {
        let route = Route::new(
            &ctx(),
            ["url:/a", "url:/b"],
            "https://example.com",
            Params::new(),
        )
        .expect("route");
        assert!(!route.matches(&MemoryRequest::get("/a")));
        assert!(!route.matches(&MemoryRequest::get("/b")));
    }
}
