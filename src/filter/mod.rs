//! # Filter Module
//!
//! Scoped before/after interceptors around action execution.
//!
//! ## Overview
//!
//! A [`FilterUnit`] wraps a filter (a [`Filterable`] implementation or
//! a named closure) together with its scoping options:
//!
//! - `before` / `after` decide the phase it runs in (default: before)
//! - `only` restricts it to actions matching **every** given pattern
//! - `except` skips actions matching **any** given pattern
//! - `on` restricts it to matching HTTP methods
//!
//! Patterns use the shared wildcard DSL from [`crate::pattern`], so a
//! filter scoped with `except: ["admin%"]` skips every action key that
//! starts with `admin`.
//!
//! Filters run strictly in attachment order and are not error
//! boundaries: a failing filter aborts the pipeline and its error
//! propagates unmodified.
//!
//! ## Example
//!
//! ```rust,ignore
//! let audit = FilterUnit::from_fn(
//!     "audit",
//!     FilterOptions::new().before().except(["admin%"]),
//!     |_ctx, req, _resp, _params| {
//!         tracing::info!(path = req.url_path(), "audited");
//!         Ok(())
//!     },
//! )?;
//! resolver.attach_filter(audit);
//! ```

mod core;

pub use core::{FilterFn, FilterOptions, FilterPhase, FilterUnit, Filterable};
