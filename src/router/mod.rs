//! # Router Module
//!
//! Ordered route matching and per-target-kind execution.
//!
//! ## Overview
//!
//! The router holds routes in insertion order, and insertion order
//! *is* priority. `run` scans for the first route whose conditions all
//! match the request and executes its target; there is no scoring and
//! no backtracking. When nothing matches, a fallback (supplied per
//! call or preset on the router) decides the outcome.
//!
//! ## Target execution
//!
//! Built-in dispatch covers include files (rendered with the bound
//! params), URL redirects, closures, callables and renderable objects.
//! `Action` and `Route` targets have no static dispatch: they must go
//! through a binding registered with [`Router::bind`]. The resolver
//! binds itself for both kinds and takes over dispatch. Bindings
//! always win over built-in dispatch for their kind.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut router = Router::new(ctx);
//! router.add(("url:/old-feed", "https://example.com/feed"))?;
//! router.add(("url:/greet", TargetSpec::closure(|_req, _params| {
//!     Ok(ActionReturn::from("hello"))
//! })))?;
//!
//! match router.run(None, &req, &mut resp)? {
//!     RunOutcome::Executed(out) => println!("{}", out.as_text()),
//!     RunOutcome::Fallback(_) | RunOutcome::Unmatched => {}
//! }
//! ```

mod core;

#[cfg(test)]
mod tests;

pub use core::{Fallback, FallbackFn, RouteDef, RunOutcome, Router, TargetHandler};

pub(crate) use core::dispatch_static;
