use crate::context::DispatchContext;
use crate::controller::Resolved;
use crate::error::RouterError;
use crate::request::Request;
use crate::resolver::resolve_return;
use crate::response::Response;
use crate::route::{Route, RouteObserver, Target, TargetKind, TargetSpec};
use crate::Params;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Override handler for a target kind.
///
/// When bound, the router hands every target of that kind to the
/// handler instead of its built-in dispatch. `depth` counts the
/// route-to-route redirects taken so far; pass it through to
/// [`Router::execute_redirect`] when re-entering the route table.
pub trait TargetHandler: Send + Sync {
    /// Execute a target on behalf of the router.
    fn call(
        &self,
        router: &Router,
        target: &Target,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
        depth: usize,
    ) -> Result<Resolved, RouterError>;
}

/// Closure form of a fallback handler.
pub type FallbackFn =
    Arc<dyn Fn(&dyn Request, &mut dyn Response) -> Result<Resolved, RouterError> + Send + Sync>;

/// What to do when no route matches (or dispatch fails recoverably).
#[derive(Clone)]
pub enum Fallback {
    /// Execute this route's target
    Route(Route),
    /// Raise an error carrying this message
    Error(String),
    /// Invoke a handler
    Handler(FallbackFn),
    /// Emit a redirect to this absolute URL
    Url(String),
    /// Return this text verbatim
    Text(String),
}

impl std::fmt::Debug for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::Route(r) => f.debug_tuple("Route").field(r).finish(),
            Fallback::Error(m) => f.debug_tuple("Error").field(m).finish(),
            Fallback::Handler(_) => write!(f, "Handler(..)"),
            Fallback::Url(u) => f.debug_tuple("Url").field(u).finish(),
            Fallback::Text(t) => f.debug_tuple("Text").field(t).finish(),
        }
    }
}

impl Fallback {
    /// Apply the fallback.
    ///
    /// `Route` fallbacks execute through the router when one is in
    /// scope (so bindings apply), otherwise through static dispatch.
    pub fn apply(
        &self,
        router: Option<&Router>,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, RouterError> {
        match self {
            Fallback::Route(route) => match router {
                Some(r) => r.execute(route, req, resp),
                None => dispatch_static(route.target(), route.params(), req, resp),
            },
            Fallback::Error(message) => Err(RouterError::FallbackError {
                message: message.clone(),
            }),
            Fallback::Handler(f) => f(req, resp),
            Fallback::Url(url) => {
                resp.redirect(url);
                Ok(Resolved::Redirect(url.clone()))
            }
            Fallback::Text(text) => Ok(Resolved::Text(text.clone())),
        }
    }
}

/// Outcome of [`Router::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A route matched and its target executed
    Executed(Resolved),
    /// No route matched; the fallback produced this value
    Fallback(Resolved),
    /// No route matched and no fallback was available
    Unmatched,
}

/// Unnormalized route definition accepted by [`Router::add`].
///
/// Built from `(conditions, target)` / `(conditions, target, params)`
/// tuples or assembled field by field.
#[derive(Clone)]
pub struct RouteDef {
    /// Condition strings (`<type>:<pattern>`)
    pub conditions: Vec<String>,
    /// Target specification, classified at add time
    pub target: TargetSpec,
    /// Params to bind on the route
    pub params: Params,
}

impl RouteDef {
    /// Definition with explicit conditions, target, and params.
    pub fn new<I, S>(conditions: I, target: impl Into<TargetSpec>, params: Params) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RouteDef {
            conditions: conditions.into_iter().map(Into::into).collect(),
            target: target.into(),
            params,
        }
    }
}

impl<C, T> From<(C, T)> for RouteDef
where
    C: Into<String>,
    T: Into<TargetSpec>,
{
    fn from((condition, target): (C, T)) -> Self {
        RouteDef::new([condition.into()], target, Params::new())
    }
}

impl<C, T> From<(C, T, Params)> for RouteDef
where
    C: Into<String>,
    T: Into<TargetSpec>,
{
    fn from((condition, target, params): (C, T, Params)) -> Self {
        RouteDef::new([condition.into()], target, params)
    }
}

/// Route table plus per-target-kind execution bindings and a fallback.
///
/// Routes execute in insertion order; the first full match wins.
pub struct Router {
    ctx: DispatchContext,
    routes: Vec<Route>,
    bindings: HashMap<TargetKind, Arc<dyn TargetHandler>>,
    fallback: Option<Fallback>,
    observers: Vec<Arc<dyn RouteObserver>>,
}

impl Router {
    /// Create an empty router over the given context.
    #[must_use]
    pub fn new(ctx: DispatchContext) -> Self {
        Router {
            ctx,
            routes: Vec::new(),
            bindings: HashMap::new(),
            fallback: None,
            observers: Vec::new(),
        }
    }

    /// The router's dispatch context.
    #[must_use]
    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    /// Append an already-built route.
    pub fn add_route(&mut self, route: Route) -> &mut Self {
        debug!(
            condition = route.primary_condition().unwrap_or("<none>"),
            kind = %route.kind(),
            position = self.routes.len(),
            "Route added"
        );
        self.routes.push(route);
        self
    }

    /// Normalize a definition and append the resulting route.
    pub fn add(&mut self, def: impl Into<RouteDef>) -> Result<&mut Self, RouterError> {
        let def = def.into();
        let route = Route::new(&self.ctx, &def.conditions, def.target, def.params)?;
        Ok(self.add_route(route))
    }

    /// Normalize a list of definitions, appending each in order.
    ///
    /// A malformed definition fails with the offending index; routes
    /// normalized before it stay added.
    pub fn add_many<I>(&mut self, defs: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = RouteDef>,
    {
        for (index, def) in defs.into_iter().enumerate() {
            let route = Route::new(&self.ctx, &def.conditions, def.target, def.params).map_err(
                |e| RouterError::BadRouteDef {
                    index,
                    reason: e.to_string(),
                },
            )?;
            self.add_route(route);
        }
        Ok(self)
    }

    /// Replace the entire route table.
    pub fn set(&mut self, routes: Vec<Route>) -> &mut Self {
        info!(count = routes.len(), "Route table replaced");
        self.routes = routes;
        self
    }

    /// Route at the given table position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// Whether any route declares this primary condition string.
    #[must_use]
    pub fn has(&self, condition: &str) -> bool {
        self.find_by_condition(condition).is_some()
    }

    /// Remove every route declaring this primary condition string.
    ///
    /// Returns how many routes were removed.
    pub fn remove(&mut self, condition: &str) -> usize {
        let before = self.routes.len();
        self.routes
            .retain(|r| r.primary_condition() != Some(condition));
        before - self.routes.len()
    }

    /// The route table, in priority order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Print the route table to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for route in &self.routes {
            println!(
                "[route] {} -> {}",
                route.primary_condition().unwrap_or("<none>"),
                route.kind()
            );
        }
    }

    /// Register an override handler for a target kind.
    ///
    /// The handler replaces built-in dispatch for every target of that
    /// kind; this is how the resolver takes over `action` and `route`
    /// targets.
    pub fn bind(&mut self, kind: TargetKind, handler: Arc<dyn TargetHandler>) -> &mut Self {
        debug!(kind = %kind, "Target kind bound");
        self.bindings.insert(kind, handler);
        self
    }

    /// Preset the fallback applied when `run` finds no match.
    pub fn set_fallback(&mut self, fallback: Fallback) -> &mut Self {
        self.fallback = Some(fallback);
        self
    }

    /// Install execution hooks called around each matched route.
    pub fn add_observer(&mut self, observer: Arc<dyn RouteObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// First route fully matching the request, in insertion order.
    #[must_use]
    pub fn find(&self, req: &dyn Request) -> Option<&Route> {
        debug!(
            method = %req.http_method(),
            path = req.url_path(),
            routes = self.routes.len(),
            "Route match attempt"
        );
        let hit = self.routes.iter().find(|r| r.matches(req));
        match hit {
            Some(route) => {
                info!(
                    path = req.url_path(),
                    condition = route.primary_condition().unwrap_or("<none>"),
                    kind = %route.kind(),
                    "Route matched"
                );
            }
            None => {
                warn!(path = req.url_path(), "No route matched");
            }
        }
        hit
    }

    /// Route whose primary condition string equals `condition`.
    #[must_use]
    pub fn find_by_condition(&self, condition: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.primary_condition() == Some(condition))
    }

    /// Match and dispatch the request.
    ///
    /// The first fully-matching route executes and the scan stops. On
    /// no match, the per-call fallback (or the preset one) is applied;
    /// absent both, the outcome is [`RunOutcome::Unmatched`].
    pub fn run(
        &self,
        fallback: Option<&Fallback>,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<RunOutcome, RouterError> {
        if let Some(route) = self.find(req) {
            for obs in &self.observers {
                obs.before_execute(route, req);
            }
            let out = self.execute(route, req, resp)?;
            for obs in &self.observers {
                obs.after_execute(route, req);
            }
            return Ok(RunOutcome::Executed(out));
        }

        match fallback.or(self.fallback.as_ref()) {
            Some(fb) => {
                info!(path = req.url_path(), fallback = ?fb, "Applying fallback");
                let out = fb.apply(Some(self), req, resp)?;
                Ok(RunOutcome::Fallback(out))
            }
            None => Ok(RunOutcome::Unmatched),
        }
    }

    /// Execute a route's target with its bound params.
    pub fn execute(
        &self,
        route: &Route,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, RouterError> {
        self.execute_at(route.target(), route.params(), req, resp, 0)
    }

    /// Re-enter the route table for a route-to-route redirect.
    ///
    /// Finds the route declaring `condition`, overlays `extra` onto its
    /// bound params, and executes it. `depth` carries the redirect
    /// count; chains past the configured limit fail instead of looping.
    pub fn execute_redirect(
        &self,
        condition: &str,
        extra: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
        depth: usize,
    ) -> Result<Resolved, RouterError> {
        let limit = self.ctx.config().max_redirects;
        if depth > limit {
            return Err(RouterError::RedirectLoop { limit });
        }
        let route = self
            .find_by_condition(condition)
            .ok_or_else(|| RouterError::NoSuchRoute {
                condition: condition.to_string(),
            })?;
        debug!(condition = condition, depth = depth, "Route redirect");
        let params = route.merged_params(extra);
        self.execute_at(route.target(), &params, req, resp, depth)
    }

    fn execute_at(
        &self,
        target: &Target,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
        depth: usize,
    ) -> Result<Resolved, RouterError> {
        let kind = target.kind();
        if let Some(handler) = self.bindings.get(&kind) {
            debug!(kind = %kind, "Dispatching target through binding");
            return handler.call(self, target, params, req, resp, depth + 1);
        }
        dispatch_static(target, params, req, resp)
    }
}

/// Built-in dispatch for targets that need no binding.
///
/// `Action` and `Route` targets are not supported here and fail with
/// [`RouterError::UnboundTarget`].
pub(crate) fn dispatch_static(
    target: &Target,
    params: &Params,
    req: &dyn Request,
    resp: &mut dyn Response,
) -> Result<Resolved, RouterError> {
    match target {
        Target::Include(path) => {
            let rendered = render_include(path, params)?;
            Ok(Resolved::Text(rendered))
        }
        Target::Url(url) => {
            info!(url = %url, "Redirecting");
            resp.redirect(url.as_str());
            Ok(Resolved::Redirect(url.to_string()))
        }
        Target::Closure(f) => {
            let ret = f(req, params).map_err(RouterError::Dispatch)?;
            resolve_return(ret, "closure target", req, params)
                .map_err(|e| RouterError::Dispatch(Box::new(e)))
        }
        Target::Callable(h) => {
            let ret = h.call(req, params).map_err(RouterError::Dispatch)?;
            resolve_return(ret, "callable target", req, params)
                .map_err(|e| RouterError::Dispatch(Box::new(e)))
        }
        Target::Renderable(r) => Ok(Resolved::Text(r.render(req, params))),
        Target::Action(_) | Target::Route(_) => Err(RouterError::UnboundTarget {
            kind: target.kind().name(),
        }),
        Target::None => Ok(Resolved::None),
    }
}

/// Render an include target with the bound params as template context.
fn render_include(path: &Path, params: &Params) -> Result<String, RouterError> {
    let display = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| RouterError::Include {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let mut env = minijinja::Environment::new();
    env.add_template("include", &source)
        .map_err(|e| RouterError::Include {
            path: display.clone(),
            message: e.to_string(),
        })?;
    let template = env.get_template("include").map_err(|e| RouterError::Include {
        path: display.clone(),
        message: e.to_string(),
    })?;
    template.render(params).map_err(|e| RouterError::Include {
        path: display,
        message: e.to_string(),
    })
}
