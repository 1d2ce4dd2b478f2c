//! # Waypoint
//!
//! **Waypoint** is a request-dispatch core for building pluggable
//! web-request handlers: it matches inbound requests against declared
//! routes, resolves a matching request to a controller action, runs a
//! before/after filter pipeline around the action, and normalizes the
//! action's return value into a sendable response.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`pattern`]** - SQL-LIKE wildcard compilation shared by every
//!   matching site
//! - **[`route`]** - Declarative routes: AND-ed typed conditions plus
//!   one classified execution target
//! - **[`filter`]** - Scoped before/after interceptors
//!   (`only`/`except`/`on`)
//! - **[`router`]** - Ordered route table, per-target-kind execution
//!   bindings, fallback semantics
//! - **[`resolver`]** - Controller/action registry, wildcard lookup
//!   with ambiguity detection, the filter pipeline, and return-value
//!   resolution
//! - **[`request`]** / **[`response`]** - The narrow boundary traits
//!   the core consumes, with in-memory implementations
//! - **[`context`]** - Per-session dependency context and env-var
//!   configuration
//!
//! Dispatch is single-threaded and synchronous: one router/resolver
//! pair handles one request at a time, routes execute in insertion
//! order, and filters run sequentially in attachment order so a
//! failing filter deterministically short-circuits the rest. Sessions
//! sharing a process each build their own instances; there is no
//! process-wide mutable state.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use waypoint::context::DispatchContext;
//! use waypoint::controller::{ActionReturn, Controller};
//! use waypoint::error::ActionError;
//! use waypoint::request::MemoryRequest;
//! use waypoint::resolver::{HandleOptions, HandleTarget, RegisterOptions, Resolver};
//! use waypoint::response::BufferedResponse;
//! use waypoint::Params;
//!
//! struct Hello;
//!
//! impl Controller for Hello {
//!     fn key(&self) -> &str {
//!         "hello"
//!     }
//!     fn actions(&self) -> Vec<&'static str> {
//!         vec!["hello"]
//!     }
//!     fn invoke(
//!         &self,
//!         action: &str,
//!         _params: &Params,
//!         _req: &dyn waypoint::request::Request,
//!         _resp: &mut dyn waypoint::response::Response,
//!     ) -> Result<ActionReturn, ActionError> {
//!         match action {
//!             "hello" => Ok(ActionReturn::from("hi")),
//!             other => Err(format!("unknown action '{other}'").into()),
//!         }
//!     }
//! }
//!
//! let mut resolver = Resolver::new(DispatchContext::default());
//! resolver.register(Arc::new(Hello), RegisterOptions::default())?;
//!
//! let req = MemoryRequest::get("/hello");
//! let mut resp = BufferedResponse::new();
//! let out = resolver.handle(
//!     HandleTarget::Name("hello::hello"),
//!     &HandleOptions::default(),
//!     &req,
//!     &mut resp,
//! )?;
//! assert_eq!(out.as_text(), "hi");
//! # Ok::<(), waypoint::error::ResolverError>(())
//! ```
//!
//! ## Routing
//!
//! Routes pair `<type>:<pattern>` condition strings with a target
//! whose kind is classified once, at construction: an existing
//! template file renders as an include, an absolute URL redirects, a
//! condition string redirects to another route, a
//! `Controller::method` reference dispatches an action through the
//! resolver, and closures/callables/renderables execute directly.
//! Insertion order is priority; the first route whose conditions all
//! match wins.
//!
//! ```rust,ignore
//! let mut router = Router::new(ctx);
//! router.add(("url:/pets", "Pets::list"))?;
//! router.add(("url:/legacy%", "https://example.com/new-home"))?;
//! resolver.bind_to(&mut router);
//! router.run(Some(&Fallback::Url("https://example.com/404".into())), &req, &mut resp)?;
//! ```

pub mod context;
pub mod controller;
pub mod error;
pub mod filter;
pub mod pattern;
pub mod request;
pub mod resolver;
pub mod response;
pub mod route;
pub mod router;

use serde_json::Value;
use std::collections::HashMap;

/// Opaque params bound to routes and handed to actions and filters.
pub type Params = HashMap<String, Value>;

pub use context::{DispatchConfig, DispatchContext};
pub use controller::{ActionReturn, Controller, Renderable, Resolved};
pub use error::{ActionError, FilterError, ResolverError, RouteError, RouterError};
pub use filter::{FilterOptions, FilterPhase, FilterUnit, Filterable};
pub use pattern::Pattern;
pub use request::{MemoryRequest, ParamScope, Request};
pub use resolver::{HandleOptions, HandleTarget, RegisterOptions, Resolver};
pub use response::{BufferedResponse, Response};
pub use route::{Route, RouteObserver, Target, TargetKind, TargetSpec};
pub use router::{Fallback, RouteDef, RunOutcome, Router};
