//! # Route Module
//!
//! Declarative routing rules: a [`Route`] pairs an AND-ed set of typed
//! match conditions with one classified execution target and a map of
//! bound params.
//!
//! ## Conditions
//!
//! Conditions are declared as `<type>:<pattern>` strings. Recognized
//! types are `url`, `tpl`/`template`, `post`, `get` and `session`
//! (case-insensitive). The pattern side goes through the shared
//! wildcard DSL of [`crate::pattern`], so `url:%.rss` matches every
//! request path ending in `.rss`. A route fires only when **every**
//! condition matches the request.
//!
//! The `post`/`get`/`session` types match against the request's
//! scope-keyed parameters: `session:user` requires the `user` session
//! param to be present, `get:format=json%` additionally matches its
//! value against a wildcard pattern.
//!
//! ## Targets
//!
//! The target is classified once, at construction, by inspecting its
//! shape: an existing template file becomes [`Target::Include`], an
//! absolute URL a redirect, a condition string a redirect to another
//! route, a `Controller::method` reference an action, and callables,
//! closures and renderable objects keep their own kinds. A value that
//! fits no shape fails construction with
//! [`RouteError`](crate::error::RouteError).

mod core;

pub use core::{
    Condition, ConditionKind, ConditionVec, Route, RouteClosure, RouteHandler, RouteObserver,
    Target, TargetKind, TargetSpec,
};
