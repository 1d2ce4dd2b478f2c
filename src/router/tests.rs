use super::*;
use crate::context::DispatchContext;
use crate::controller::{ActionReturn, Resolved};
use crate::error::RouterError;
use crate::request::MemoryRequest;
use crate::response::BufferedResponse;
use crate::route::{Route, RouteObserver, TargetSpec};
use crate::Params;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn ctx() -> DispatchContext {
    DispatchContext::default()
}

fn text_route(ctx: &DispatchContext, condition: &str, text: &'static str) -> Route {
    Route::new(
        ctx,
        [condition],
        TargetSpec::closure(move |_req, _params| Ok(ActionReturn::from(text))),
        Params::new(),
    )
    .expect("route")
}

#[test]
fn insertion_order_is_priority() {
    let ctx = ctx();
    let mut router = Router::new(ctx.clone());
    router.add_route(text_route(&ctx, "url:/a", "first"));
    router.add_route(text_route(&ctx, "url:/a", "second"));

    let req = MemoryRequest::get("/a");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("first".to_string())));
}

#[test]
fn unmatched_without_fallback() {
    let router = Router::new(ctx());
    let req = MemoryRequest::get("/nowhere");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Unmatched);
}

#[test]
fn url_fallback_redirects() {
    let router = Router::new(ctx());
    let req = MemoryRequest::get("/nowhere");
    let mut resp = BufferedResponse::new();
    let fallback = Fallback::Url("https://example.com/404".to_string());
    let out = router.run(Some(&fallback), &req, &mut resp).expect("run");
    assert_eq!(
        out,
        RunOutcome::Fallback(Resolved::Redirect("https://example.com/404".to_string()))
    );
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.location(), Some("https://example.com/404"));
}

#[test]
fn error_fallback_raises() {
    let router = Router::new(ctx());
    let req = MemoryRequest::get("/nowhere");
    let mut resp = BufferedResponse::new();
    let fallback = Fallback::Error("nothing handled this".to_string());
    let err = router.run(Some(&fallback), &req, &mut resp);
    assert!(matches!(err, Err(RouterError::FallbackError { .. })));
}

#[test]
fn preset_fallback_is_used_when_no_override_given() {
    let mut router = Router::new(ctx());
    router.set_fallback(Fallback::Text("nothing here".to_string()));
    let req = MemoryRequest::get("/nowhere");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(
        out,
        RunOutcome::Fallback(Resolved::Text("nothing here".to_string()))
    );
}

#[test]
fn action_target_without_binding_is_rejected() {
    let mut router = Router::new(ctx());
    router.add(("url:/pets", "Pets::list")).expect("add");
    let req = MemoryRequest::get("/pets");
    let mut resp = BufferedResponse::new();
    let err = router.run(None, &req, &mut resp);
    assert!(matches!(err, Err(RouterError::UnboundTarget { kind: "action" })));
}

#[test]
fn add_many_reports_the_offending_index() {
    let mut router = Router::new(ctx());
    let err = router.add_many([
        RouteDef::from(("url:/ok", "https://example.com")),
        RouteDef::from(("bogus:/broken", "https://example.com")),
    ]);
    match err {
        Err(RouterError::BadRouteDef { index, .. }) => assert_eq!(index, 1),
        Err(other) => panic!("expected BadRouteDef, got {other:?}"),
        Ok(_) => panic!("expected BadRouteDef, got Ok"),
    }
    // The definition before the bad one stays added.
    assert!(router.has("url:/ok"));
}

#[test]
fn table_management() {
    let ctx = ctx();
    let mut router = Router::new(ctx.clone());
    router.add_route(text_route(&ctx, "url:/a", "a"));
    router.add_route(text_route(&ctx, "url:/b", "b"));

    assert!(router.has("url:/a"));
    assert!(router.get(1).is_some());
    assert_eq!(router.remove("url:/a"), 1);
    assert!(!router.has("url:/a"));
    assert_eq!(router.routes().len(), 1);

    router.set(Vec::new());
    assert!(router.routes().is_empty());
}

#[test]
fn observers_fire_around_execution() {
    struct Counter(AtomicUsize, AtomicUsize);
    impl RouteObserver for Counter {
        fn before_execute(&self, _route: &Route, _req: &dyn crate::request::Request) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn after_execute(&self, _route: &Route, _req: &dyn crate::request::Request) {
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    let ctx = ctx();
    let counter = Arc::new(Counter(AtomicUsize::new(0), AtomicUsize::new(0)));
    let mut router = Router::new(ctx.clone());
    router.add_route(text_route(&ctx, "url:/a", "a"));
    router.add_observer(Arc::<Counter>::clone(&counter));

    let req = MemoryRequest::get("/a");
    let mut resp = BufferedResponse::new();
    let _ = router.run(None, &req, &mut resp).expect("run");

    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert_eq!(counter.1.load(Ordering::SeqCst), 1);
}
