use crate::context::DispatchContext;
use crate::controller::{ActionReturn, Controller, Resolved};
use crate::error::{ActionError, ResolverError, RouterError};
use crate::filter::{FilterPhase, FilterUnit};
use crate::pattern::Pattern;
use crate::request::Request;
use crate::response::Response;
use crate::route::{Target, TargetKind};
use crate::router::{Router, RunOutcome, TargetHandler};
use crate::Params;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registration options for [`Resolver::register`].
#[derive(Default, Clone)]
pub struct RegisterOptions {
    /// Regexes tested against declared method names; the first match
    /// stops registration of that method
    pub exclude: Vec<String>,
    /// Extra before filters scoped to this controller
    pub before: Vec<FilterUnit>,
    /// Extra after filters scoped to this controller
    pub after: Vec<FilterUnit>,
}

impl RegisterOptions {
    /// Empty options; equivalent to `Default::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude declared methods matching any of these regexes.
    #[must_use]
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an extra before filter to the controller.
    #[must_use]
    pub fn before_filter(mut self, filter: FilterUnit) -> Self {
        self.before.push(filter);
        self
    }

    /// Attach an extra after filter to the controller.
    #[must_use]
    pub fn after_filter(mut self, filter: FilterUnit) -> Self {
        self.after.push(filter);
        self
    }
}

/// Closure form of a directly-dispatched action.
pub type DispatchFn = Arc<
    dyn Fn(&Params, &dyn Request, &mut dyn Response) -> Result<ActionReturn, ActionError>
        + Send
        + Sync,
>;

/// Post-processing hook applied to the resolved value before return.
pub type HandleCallback = Arc<dyn Fn(Resolved) -> Resolved + Send + Sync>;

/// What [`Resolver::handle`] should dispatch.
pub enum HandleTarget<'a> {
    /// Delegate to a router's own matching and fallback logic
    Router(&'a Router),
    /// Invoke a closure with `(params, request, response)`
    Closure(DispatchFn),
    /// Broadcast over every registered action
    All,
    /// Expand one lookup expression
    Name(&'a str),
    /// Expand several lookup expressions
    Names(&'a [&'a str]),
}

impl HandleTarget<'_> {
    /// Wrap a dispatch closure.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Params, &dyn Request, &mut dyn Response) -> Result<ActionReturn, ActionError>
            + Send
            + Sync
            + 'static,
    {
        HandleTarget::Closure(Arc::new(f))
    }
}

/// Options for [`Resolver::handle`].
#[derive(Default, Clone)]
pub struct HandleOptions {
    /// Params handed to actions and filters
    pub params: Params,
    /// Recovery applied when resolution or execution fails
    pub fallback: Option<crate::router::Fallback>,
    /// Post-processing hook for the resolved value
    pub callback: Option<HandleCallback>,
}

impl HandleOptions {
    /// Empty options; equivalent to `Default::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch params.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the dispatch fallback.
    #[must_use]
    pub fn fallback(mut self, fallback: crate::router::Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Set the post-processing callback.
    #[must_use]
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(Resolved) -> Resolved + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }
}

struct ControllerEntry {
    instance: Arc<dyn Controller>,
    before: Vec<FilterUnit>,
    after: Vec<FilterUnit>,
}

/// Action registry plus the filter pipeline around action execution.
///
/// One resolver per request-handling session; all state lives on the
/// instance.
pub struct Resolver {
    ctx: DispatchContext,
    controllers: HashMap<String, ControllerEntry>,
    actions: HashMap<String, (String, String)>,
    global_filters: Vec<FilterUnit>,
}

impl Resolver {
    /// Create an empty resolver over the given context.
    #[must_use]
    pub fn new(ctx: DispatchContext) -> Self {
        Resolver {
            ctx,
            controllers: HashMap::new(),
            actions: HashMap::new(),
            global_filters: Vec::new(),
        }
    }

    /// The resolver's dispatch context.
    #[must_use]
    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    /// Register a controller's declared actions.
    ///
    /// Every name from [`Controller::actions`] becomes a
    /// `controller::method` registry key unless an exclude regex
    /// matches it first. Re-registering a controller key overwrites
    /// its prior entries. The controller's `before`/`after` filters
    /// (plus any option-supplied extras) are snapshotted here.
    pub fn register(
        &mut self,
        controller: Arc<dyn Controller>,
        options: RegisterOptions,
    ) -> Result<(), ResolverError> {
        let key = controller.key().to_ascii_lowercase();

        let mut excludes = Vec::with_capacity(options.exclude.len());
        for pattern in &options.exclude {
            let re = Regex::new(pattern).map_err(|_| ResolverError::BadExclude {
                pattern: pattern.clone(),
            })?;
            excludes.push(re);
        }

        if self.controllers.contains_key(&key) {
            warn!(controller = %key, "Re-registering controller, prior entries replaced");
            self.actions.retain(|_, (ck, _)| *ck != key);
        }

        let mut count = 0usize;
        'methods: for method in controller.actions() {
            let m = method.to_ascii_lowercase();
            if m.is_empty() || m.contains("::") {
                return Err(ResolverError::InvalidAction {
                    controller: key,
                    method: method.to_string(),
                });
            }
            for re in &excludes {
                if re.is_match(&m) {
                    debug!(controller = %key, method = %m, "Method excluded from registration");
                    continue 'methods;
                }
            }
            self.actions
                .insert(format!("{}::{}", key, m), (key.clone(), m));
            count += 1;
        }

        let mut before = controller.before();
        before.extend(options.before);
        let mut after = controller.after();
        after.extend(options.after);

        info!(
            controller = %key,
            actions = count,
            total_actions = self.actions.len(),
            "Controller registered"
        );
        self.controllers.insert(
            key,
            ControllerEntry {
                instance: controller,
                before,
                after,
            },
        );
        Ok(())
    }

    /// Remove one controller's entries, or everything when `None`.
    pub fn unregister(&mut self, controller: Option<&str>) {
        match controller {
            Some(key) => {
                let key = key.to_ascii_lowercase();
                self.controllers.remove(&key);
                self.actions.retain(|_, (ck, _)| *ck != key);
                debug!(controller = %key, "Controller unregistered");
            }
            None => self.reset(),
        }
    }

    /// Clear controllers, actions, and global filters.
    pub fn reset(&mut self) {
        self.controllers.clear();
        self.actions.clear();
        self.global_filters.clear();
        debug!("Resolver reset");
    }

    /// Membership test for `controller` or `controller::method` queries.
    #[must_use]
    pub fn registered(&self, query: &str) -> bool {
        let q = query.to_ascii_lowercase();
        if q.contains("::") {
            self.actions.contains_key(&q)
        } else {
            self.controllers.contains_key(&q)
        }
    }

    /// Registered action keys, sorted.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.actions.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Append a global filter.
    pub fn attach_filter(&mut self, filter: FilterUnit) -> &mut Self {
        debug!(filter = filter.name(), "Global filter attached");
        self.global_filters.push(filter);
        self
    }

    /// Remove global filters by name identity.
    ///
    /// Returns whether anything was removed.
    pub fn detach_filter(&mut self, name: &str) -> bool {
        let before = self.global_filters.len();
        self.global_filters.retain(|f| f.name() != name);
        before != self.global_filters.len()
    }

    /// Global filters, optionally restricted to one phase.
    #[must_use]
    pub fn filters(&self, phase: Option<FilterPhase>) -> Vec<&FilterUnit> {
        self.global_filters
            .iter()
            .filter(|f| phase.map(|p| f.in_phase(p)).unwrap_or(true))
            .collect()
    }

    /// Expand a lookup expression into `(controller, method)` pairs.
    ///
    /// Exact `controller::method` queries match the full key or a
    /// dotted-path suffix and fail with
    /// [`ResolverError::Ambiguous`] on more than one hit. Wildcard
    /// forms (`%`, leading `*`, bare name) may legitimately return
    /// many pairs; results come back in sorted key order.
    pub fn lookup(&self, expr: &str) -> Result<Vec<(String, String)>, ResolverError> {
        let q = expr.to_ascii_lowercase();

        let mut keys: Vec<&String> = if q.contains('%') {
            let p = Pattern::compile(&q);
            self.actions.keys().filter(|k| p.matches(k)).collect()
        } else if q.starts_with('*') {
            let p = Pattern::compile(&q);
            self.actions.keys().filter(|k| p.matches(k)).collect()
        } else if q.contains("::") {
            let suffix = format!(".{}", q);
            let hits: Vec<&String> = self
                .actions
                .keys()
                .filter(|k| **k == q || k.ends_with(&suffix))
                .collect();
            if hits.len() > 1 {
                let mut candidates: Vec<String> = hits.iter().map(|k| (*k).clone()).collect();
                candidates.sort();
                return Err(ResolverError::Ambiguous {
                    expr: expr.to_string(),
                    candidates,
                });
            }
            hits
        } else {
            // Bare name: the method segment, the controller path, or
            // the controller leaf may carry it.
            let leaf_suffix = format!(".{}", q);
            self.actions
                .keys()
                .filter(|k| match k.split_once("::") {
                    Some((controller, method)) => {
                        method == q || controller == q || controller.ends_with(&leaf_suffix)
                    }
                    None => false,
                })
                .collect()
        };

        keys.sort();
        debug!(expr = %expr, matches = keys.len(), "Action lookup");
        Ok(keys
            .into_iter()
            .filter_map(|k| self.actions.get(k).cloned())
            .collect())
    }

    /// Top-level dispatch entry.
    ///
    /// Expands the target, executes through the filter pipeline, folds
    /// multi-action results, applies the fallback on failure and the
    /// callback on success.
    pub fn handle(
        &self,
        target: HandleTarget<'_>,
        opts: &HandleOptions,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, ResolverError> {
        let resolved = match self.dispatch(target, opts, req, resp) {
            Ok(r) => r,
            Err(e) => match &opts.fallback {
                Some(fb) => {
                    warn!(error = %e, "Dispatch failed, applying fallback");
                    fb.apply(None, req, resp)?
                }
                None => return Err(e),
            },
        };
        Ok(match &opts.callback {
            Some(cb) => cb(resolved),
            None => resolved,
        })
    }

    /// Buffered variant of [`Resolver::handle`].
    ///
    /// Appends the stringified result to `buf` instead of returning
    /// it; output accumulates for a later flush by the caller.
    pub fn handle_into(
        &self,
        target: HandleTarget<'_>,
        opts: &HandleOptions,
        req: &dyn Request,
        resp: &mut dyn Response,
        buf: &mut String,
    ) -> Result<(), ResolverError> {
        let resolved = self.handle(target, opts, req, resp)?;
        buf.push_str(resolved.as_text());
        Ok(())
    }

    fn dispatch(
        &self,
        target: HandleTarget<'_>,
        opts: &HandleOptions,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, ResolverError> {
        match target {
            HandleTarget::Router(router) => {
                match router.run(opts.fallback.as_ref(), req, resp)? {
                    RunOutcome::Executed(r) | RunOutcome::Fallback(r) => Ok(r),
                    RunOutcome::Unmatched => Err(ResolverError::UnknownAction {
                        expr: req.url_path().to_string(),
                    }),
                }
            }
            HandleTarget::Closure(f) => {
                let ret = f(&opts.params, req, resp).map_err(|e| ResolverError::ActionFailed {
                    action: "closure".to_string(),
                    source: e,
                })?;
                resolve_return(ret, "closure", req, &opts.params)
            }
            HandleTarget::All => {
                let pairs: Vec<(String, String)> = self
                    .actions()
                    .iter()
                    .filter_map(|k| self.actions.get(k).cloned())
                    .collect();
                self.run_actions(pairs, opts, req, resp)
            }
            HandleTarget::Name(expr) => {
                let pairs = self.lookup(expr)?;
                if pairs.is_empty() {
                    return Err(ResolverError::UnknownAction {
                        expr: expr.to_string(),
                    });
                }
                self.run_actions(pairs, opts, req, resp)
            }
            HandleTarget::Names(exprs) => {
                let mut pairs = Vec::new();
                for expr in exprs {
                    for pair in self.lookup(expr)? {
                        if !pairs.contains(&pair) {
                            pairs.push(pair);
                        }
                    }
                }
                if pairs.is_empty() {
                    return Err(ResolverError::UnknownAction {
                        expr: exprs.join(", "),
                    });
                }
                self.run_actions(pairs, opts, req, resp)
            }
        }
    }

    fn run_actions(
        &self,
        pairs: Vec<(String, String)>,
        opts: &HandleOptions,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, ResolverError> {
        let multi = pairs.len() > 1;
        let mut acc = Resolved::None;
        for (controller, method) in pairs {
            let out = self.execute(&controller, &method, &opts.params, req, resp)?;
            acc = merge_resolved(acc, out, resp, multi);
        }
        Ok(acc)
    }

    /// Execute one action through the filter pipeline.
    ///
    /// Order: global before filters, controller before filters, the
    /// action itself, return-value resolution, global after filters,
    /// controller after filters. Each filter is gated by its scoping
    /// against `controller::method` and the request method.
    pub fn execute(
        &self,
        controller_key: &str,
        method: &str,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<Resolved, ResolverError> {
        let key = controller_key.to_ascii_lowercase();
        let method = method.to_ascii_lowercase();
        let entry = self
            .controllers
            .get(&key)
            .ok_or_else(|| ResolverError::UnknownController { key: key.clone() })?;

        let action_name = format!("{}::{}", key, method);
        if !self.actions.contains_key(&action_name) {
            return Err(ResolverError::UnknownAction { expr: action_name });
        }

        info!(action = %action_name, "Action execution start");

        self.run_filters(FilterPhase::Before, &entry.before, &action_name, params, req, resp)?;

        let ret = entry
            .instance
            .invoke(&method, params, req, resp)
            .map_err(|e| ResolverError::ActionFailed {
                action: action_name.clone(),
                source: e,
            })?;
        let resolved = resolve_return(ret, &action_name, req, params)?;

        self.run_filters(FilterPhase::After, &entry.after, &action_name, params, req, resp)?;

        info!(action = %action_name, "Action execution complete");
        Ok(resolved)
    }

    fn run_filters(
        &self,
        phase: FilterPhase,
        controller_filters: &[FilterUnit],
        action: &str,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
    ) -> Result<(), ResolverError> {
        for filter in self.global_filters.iter().chain(controller_filters) {
            if !filter.in_phase(phase) {
                continue;
            }
            if !filter.matches(action, Some(req.http_method())) {
                continue;
            }
            debug!(filter = filter.name(), action = %action, phase = ?phase, "Filter executing");
            filter
                .execute(&self.ctx, req, resp, params)
                .map_err(|e| ResolverError::FilterFailed {
                    filter: filter.name().to_string(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Bind this resolver to a router's `action` and `route` target
    /// kinds, taking over their dispatch.
    pub fn bind_to(self: &Arc<Self>, router: &mut Router) {
        router.bind(TargetKind::Action, Arc::clone(self) as Arc<dyn TargetHandler>);
        router.bind(TargetKind::Route, Arc::clone(self) as Arc<dyn TargetHandler>);
    }
}

impl TargetHandler for Resolver {
    fn call(
        &self,
        router: &Router,
        target: &Target,
        params: &Params,
        req: &dyn Request,
        resp: &mut dyn Response,
        depth: usize,
    ) -> Result<Resolved, RouterError> {
        match target {
            Target::Action(key) => {
                let opts = HandleOptions::new().params(params.clone());
                self.handle(HandleTarget::Name(key), &opts, req, resp)
                    .map_err(|e| RouterError::Dispatch(Box::new(e)))
            }
            Target::Route(condition) => {
                router.execute_redirect(condition, params, req, resp, depth)
            }
            other => crate::router::dispatch_static(other, params, req, resp),
        }
    }
}

/// Fold one action result into the running accumulator.
///
/// Text concatenates; during multi-action dispatch each text result is
/// also added to the response sink. A response-typed result supersedes
/// whatever accumulated before it.
fn merge_resolved(acc: Resolved, next: Resolved, resp: &mut dyn Response, multi: bool) -> Resolved {
    if multi {
        if let Resolved::Text(t) = &next {
            resp.add(None, Value::String(t.clone()));
        }
    }
    match (acc, next) {
        (_, Resolved::Response) => Resolved::Response,
        (Resolved::Text(a), Resolved::Text(b)) => Resolved::Text(a + &b),
        (acc, Resolved::None) => acc,
        (_, other) => other,
    }
}

/// Normalize an action's raw return value into a sendable result.
///
/// Views render, deferred closures are invoked with no arguments,
/// scalars stringify (`null`/`false` mean "no output"), and compound
/// values are rejected as non-interpretable.
pub fn resolve_return(
    ret: ActionReturn,
    action: &str,
    req: &dyn Request,
    params: &Params,
) -> Result<Resolved, ResolverError> {
    match ret {
        ActionReturn::None => Ok(Resolved::None),
        ActionReturn::Text(s) => Ok(Resolved::Text(s)),
        ActionReturn::Scalar(v) => resolve_scalar(v, action),
        ActionReturn::View(view) => Ok(Resolved::Text(view.render(req, params))),
        ActionReturn::Deferred(f) => resolve_scalar(f(), action),
        ActionReturn::Response => Ok(Resolved::Response),
    }
}

fn resolve_scalar(value: Value, action: &str) -> Result<Resolved, ResolverError> {
    match value {
        Value::Null | Value::Bool(false) => Ok(Resolved::None),
        Value::Bool(true) => Ok(Resolved::Text("true".to_string())),
        Value::Number(n) => Ok(Resolved::Text(n.to_string())),
        Value::String(s) => Ok(Resolved::Text(s)),
        Value::Array(_) | Value::Object(_) => Err(ResolverError::Uninterpretable {
            action: action.to_string(),
        }),
    }
}
