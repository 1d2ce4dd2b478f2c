//! Shared test fixtures: tracing setup and a stock controller.

use std::sync::Arc;
use waypoint::controller::{ActionReturn, Controller};
use waypoint::error::ActionError;
use waypoint::request::Request;
use waypoint::response::Response;
use waypoint::Params;

/// Install a per-test tracing subscriber; keep the guard alive for the
/// duration of the test.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        Self { _guard: guard }
    }
}

/// Controller returning a fixed text from each declared action.
pub struct TextController {
    pub key: &'static str,
    pub actions: Vec<(&'static str, &'static str)>,
}

impl TextController {
    pub fn new(key: &'static str, actions: Vec<(&'static str, &'static str)>) -> Arc<Self> {
        Arc::new(TextController { key, actions })
    }
}

impl Controller for TextController {
    fn key(&self) -> &str {
        self.key
    }

    fn actions(&self) -> Vec<&'static str> {
        self.actions.iter().map(|(name, _)| *name).collect()
    }

    fn invoke(
        &self,
        action: &str,
        _params: &Params,
        _req: &dyn Request,
        _resp: &mut dyn Response,
    ) -> Result<ActionReturn, ActionError> {
        match self.actions.iter().find(|(name, _)| *name == action) {
            Some((_, text)) => Ok(ActionReturn::from(*text)),
            None => Err(format!("unknown action '{action}'").into()),
        }
    }
}
