//! # Resolver Module
//!
//! Controller registry, action lookup, and the filter pipeline.
//!
//! ## Overview
//!
//! The resolver owns everything between "a request names an action"
//! and "that action's output is in the response sink":
//!
//! - controllers register their **declared action tables** into a flat
//!   registry of `controller::method` keys
//! - [`Resolver::lookup`] expands an expression (exact key, SQL-LIKE
//!   wildcard, `*` fragment, or bare name) into one or more actions,
//!   with ambiguity detection on exact queries
//! - [`Resolver::execute`] runs each action inside the before/after
//!   filter pipeline (global filters first, then the controller's own,
//!   each gated by its scoping options)
//! - the action's raw return value is normalized by the return-value
//!   resolution policy into a sendable [`Resolved`] value
//!
//! ## Entry point
//!
//! [`Resolver::handle`] is the top-level dispatch: it accepts a router
//! (delegating to the router's matching and fallback logic), a bare
//! closure, an action-name expression, a list of them, or the
//! broadcast target covering every registered action. Results of
//! multi-action dispatch are folded through an explicit reducer: text
//! concatenates and is added to the response sink, a response-typed
//! result supersedes the accumulator.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut resolver = Resolver::new(ctx);
//! resolver.register(Arc::new(HelloController), RegisterOptions::default())?;
//!
//! let out = resolver.handle(
//!     HandleTarget::Name("hello::hello"),
//!     &HandleOptions::default(),
//!     &req,
//!     &mut resp,
//! )?;
//! assert_eq!(out.as_text(), "hi");
//! ```
//!
//! The resolver also implements the router's
//! [`TargetHandler`](crate::router::TargetHandler) seam; binding it
//! for the `action` and `route` target kinds hands those dispatches
//! over (see [`Resolver::bind_to`]).

mod core;


pub use core::{
    resolve_return, DispatchFn, HandleCallback, HandleOptions, HandleTarget, RegisterOptions,
    Resolver,
};
