//! Scenario tests for route matching and target execution.
//!
//! Covers the built-in target dispatchers (include rendering, URL
//! redirects, closures, renderables), route-to-route redirects through
//! the resolver binding, condition matching against request facets,
//! and the full set of fallback behaviors.

mod common;

use common::{TestTracing, TextController};
use serde_json::json;
use std::sync::Arc;
use waypoint::context::DispatchContext;
use waypoint::controller::{ActionReturn, Renderable, Resolved};
use waypoint::error::RouterError;
use waypoint::request::{MemoryRequest, ParamScope, Request};
use waypoint::resolver::{RegisterOptions, Resolver};
use waypoint::response::BufferedResponse;
use waypoint::route::{Route, TargetSpec};
use waypoint::router::{Fallback, RouteDef, RunOutcome, Router};
use waypoint::Params;

fn text_target(text: &'static str) -> TargetSpec {
    TargetSpec::closure(move |_req, _params| Ok(ActionReturn::from(text)))
}

#[test]
fn include_target_renders_bound_params() {
    let _tracing = TestTracing::init();
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("greet.html"), "Hello {{ name }}!").expect("write template");

    let ctx = DispatchContext::new(dir.path());
    let mut params = Params::new();
    params.insert("name".to_string(), json!("World"));

    let mut router = Router::new(ctx);
    router
        .add(("url:/greet", "greet.html", params))
        .expect("add");

    let req = MemoryRequest::get("/greet");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("Hello World!".to_string())));
}

#[test]
fn url_target_emits_a_redirect() {
    let _tracing = TestTracing::init();
    let mut router = Router::new(DispatchContext::default());
    router
        .add(("url:/old-feed", "https://example.com/feed"))
        .expect("add");

    let req = MemoryRequest::get("/old-feed");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(
        out,
        RunOutcome::Executed(Resolved::Redirect("https://example.com/feed".to_string()))
    );
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.location(), Some("https://example.com/feed"));
}

#[test]
fn renderable_target_renders_with_request_and_params() {
    struct Banner;
    impl Renderable for Banner {
        fn render(&self, req: &dyn Request, params: &Params) -> String {
            let who = params
                .get("who")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous");
            format!("{} via {}", who, req.url_path())
        }
    }

    let _tracing = TestTracing::init();
    let mut params = Params::new();
    params.insert("who".to_string(), json!("bert"));

    let mut router = Router::new(DispatchContext::default());
    router
        .add(("url:/banner", TargetSpec::renderable(Arc::new(Banner)), params))
        .expect("add");

    let req = MemoryRequest::get("/banner");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(
        out,
        RunOutcome::Executed(Resolved::Text("bert via /banner".to_string()))
    );
}

#[test]
fn template_condition_matches_the_active_template() {
    let _tracing = TestTracing::init();
    let mut router = Router::new(DispatchContext::default());
    router
        .add(("tpl:admin%", text_target("admin area")))
        .expect("add");

    let mut resp = BufferedResponse::new();

    let admin = MemoryRequest::get("/x").with_template("admin.dashboard");
    let out = router.run(None, &admin, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("admin area".to_string())));

    let front = MemoryRequest::get("/x").with_template("front.home");
    let out = router.run(None, &front, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Unmatched);

    // No active template at all: the condition fails closed.
    let bare = MemoryRequest::get("/x");
    let out = router.run(None, &bare, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Unmatched);
}

#[test]
fn scope_conditions_join_the_conjunction() {
    let _tracing = TestTracing::init();
    let mut router = Router::new(DispatchContext::default());
    router
        .add_many([RouteDef::new(
            ["url:/export", "get:format=json%", "session:user"],
            text_target("export"),
            Params::new(),
        )])
        .expect("add");

    let mut resp = BufferedResponse::new();

    let full = MemoryRequest::get("/export?format=json-v2")
        .with_param(ParamScope::Session, "user", "u-1");
    let out = router.run(None, &full, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("export".to_string())));

    // Wrong value pattern for the get param.
    let wrong_format = MemoryRequest::get("/export?format=xml")
        .with_param(ParamScope::Session, "user", "u-1");
    let out = router.run(None, &wrong_format, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Unmatched);

    // Missing session param.
    let anon = MemoryRequest::get("/export?format=json");
    let out = router.run(None, &anon, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Unmatched);
}

#[test]
fn route_target_redirects_with_merged_params() {
    let _tracing = TestTracing::init();
    let ctx = DispatchContext::default();
    let mut router = Router::new(ctx.clone());

    let mut alias_params = Params::new();
    alias_params.insert("who".to_string(), json!("alias"));
    router
        .add(("url:/alias", "url:/real", alias_params))
        .expect("add alias");

    let mut real_params = Params::new();
    real_params.insert("who".to_string(), json!("real"));
    real_params.insert("base".to_string(), json!("kept"));
    router
        .add((
            "url:/real",
            TargetSpec::closure(|_req, params: &Params| {
                let who = params.get("who").and_then(|v| v.as_str()).unwrap_or("?");
                let base = params.get("base").and_then(|v| v.as_str()).unwrap_or("?");
                Ok(ActionReturn::Text(format!("{who}/{base}")))
            }),
            real_params,
        ))
        .expect("add real");

    let resolver = Arc::new(Resolver::new(ctx));
    resolver.bind_to(&mut router);

    let req = MemoryRequest::get("/alias");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    // The redirecting route's params override the target route's own.
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("alias/kept".to_string())));
}

#[test]
fn self_referential_route_target_hits_the_redirect_limit() {
    let _tracing = TestTracing::init();
    let ctx = DispatchContext::default();
    let mut router = Router::new(ctx.clone());
    router.add(("url:/loop", "url:/loop")).expect("add");

    let resolver = Arc::new(Resolver::new(ctx));
    resolver.bind_to(&mut router);

    let req = MemoryRequest::get("/loop");
    let mut resp = BufferedResponse::new();
    let err = router.run(None, &req, &mut resp);
    assert!(matches!(err, Err(RouterError::RedirectLoop { .. })));
}

#[test]
fn action_target_dispatches_through_the_bound_resolver() {
    let _tracing = TestTracing::init();
    let ctx = DispatchContext::default();

    let mut resolver = Resolver::new(ctx.clone());
    resolver
        .register(
            TextController::new("hello", vec![("hello", "hi")]),
            RegisterOptions::default(),
        )
        .expect("register");
    let resolver = Arc::new(resolver);

    let mut router = Router::new(ctx);
    router.add(("url:/hello", "Hello::hello")).expect("add");
    resolver.bind_to(&mut router);

    let req = MemoryRequest::get("/hello");
    let mut resp = BufferedResponse::new();
    let out = router.run(None, &req, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Executed(Resolved::Text("hi".to_string())));
}

#[test]
fn route_fallback_executes_its_target() {
    let _tracing = TestTracing::init();
    let ctx = DispatchContext::default();
    let router = Router::new(ctx.clone());

    let not_found = Route::new(&ctx, ["url:/404"], text_target("not found"), Params::new())
        .expect("route");

    let req = MemoryRequest::get("/nowhere");
    let mut resp = BufferedResponse::new();
    let out = router
        .run(Some(&Fallback::Route(not_found)), &req, &mut resp)
        .expect("run");
    assert_eq!(out, RunOutcome::Fallback(Resolved::Text("not found".to_string())));
}

#[test]
fn handler_fallback_is_invoked() {
    let _tracing = TestTracing::init();
    let router = Router::new(DispatchContext::default());
    let fallback = Fallback::Handler(Arc::new(|req, _resp| {
        Ok(Resolved::Text(format!("missed {}", req.url_path())))
    }));

    let req = MemoryRequest::get("/ghost");
    let mut resp = BufferedResponse::new();
    let out = router.run(Some(&fallback), &req, &mut resp).expect("run");
    assert_eq!(out, RunOutcome::Fallback(Resolved::Text("missed /ghost".to_string())));
}
