//! # Dispatch Context Module
//!
//! Per-session dependency context for the dispatch core.
//!
//! ## Overview
//!
//! Everything that used to be ambient process state lives here instead:
//! the template root used to classify and render include targets, the
//! set of file extensions recognized as templates, and the runtime
//! knobs loaded from environment variables. One `DispatchContext` is
//! built per request-handling session and threaded through `Route`,
//! `Router`, and `Resolver` constructors; nothing in this crate reads
//! shared mutable globals.
//!
//! ## Environment Variables
//!
//! ### `WAYPOINT_MAX_REDIRECTS`
//!
//! Depth limit for route-to-route redirect chains. A route whose target
//! points at another route can chain; past this depth the router fails
//! with a redirect-loop error instead of spinning.
//!
//! Default: `8`
//!
//! ### `WAYPOINT_TEMPLATE_EXT`
//!
//! Comma-separated list of file extensions treated as template files
//! when classifying route targets.
//!
//! Default: `html,tpl`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_MAX_REDIRECTS: usize = 8;
const DEFAULT_TEMPLATE_EXTS: &[&str] = &["html", "tpl"];

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Depth limit for route-to-route redirect chains (default: 8)
    pub max_redirects: usize,
    /// File extensions recognized as template files (default: html, tpl)
    pub template_exts: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            template_exts: DEFAULT_TEMPLATE_EXTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults rather than failing;
    /// these are tuning knobs, not correctness switches.
    #[must_use]
    pub fn from_env() -> Self {
        let max_redirects = match env::var("WAYPOINT_MAX_REDIRECTS") {
            Ok(val) => val.parse().unwrap_or(DEFAULT_MAX_REDIRECTS),
            Err(_) => DEFAULT_MAX_REDIRECTS,
        };

        let template_exts = match env::var("WAYPOINT_TEMPLATE_EXT") {
            Ok(val) => {
                let exts: Vec<String> = val
                    .split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if exts.is_empty() {
                    DEFAULT_TEMPLATE_EXTS.iter().map(|s| s.to_string()).collect()
                } else {
                    exts
                }
            }
            Err(_) => DEFAULT_TEMPLATE_EXTS.iter().map(|s| s.to_string()).collect(),
        };

        let config = DispatchConfig {
            max_redirects,
            template_exts,
        };
        debug!(
            max_redirects = config.max_redirects,
            template_exts = ?config.template_exts,
            "Dispatch config loaded"
        );
        config
    }
}

/// Per-session dependency context threaded through the dispatch core.
///
/// Owns the template root for include-target classification/rendering
/// and the runtime configuration. Build one per request-handling
/// session; instances are cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    template_root: PathBuf,
    config: DispatchConfig,
}

impl Default for DispatchContext {
    fn default() -> Self {
        DispatchContext {
            template_root: PathBuf::from("."),
            config: DispatchConfig::default(),
        }
    }
}

impl DispatchContext {
    /// Create a context rooted at the given template directory.
    pub fn new(template_root: impl Into<PathBuf>) -> Self {
        DispatchContext {
            template_root: template_root.into(),
            config: DispatchConfig::from_env(),
        }
    }

    /// Replace the runtime configuration.
    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The directory include targets are resolved against.
    #[must_use]
    pub fn template_root(&self) -> &Path {
        &self.template_root
    }

    /// Whether a path carries one of the recognized template extensions.
    #[must_use]
    pub fn is_template_path(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.config.template_exts.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }

    /// Resolve a template path against the template root.
    #[must_use]
    pub fn template_path(&self, rel: &str) -> PathBuf {
        self.template_root.join(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DispatchConfig::default();
        assert_eq!(c.max_redirects, 8);
        assert!(c.template_exts.iter().any(|e| e == "html"));
    }

    #[test]
    fn template_path_classification() {
        let ctx = DispatchContext::default();
        assert!(ctx.is_template_path("pages/home.html"));
        assert!(ctx.is_template_path("error.TPL"));
        assert!(!ctx.is_template_path("https://example.com"));
        assert!(!ctx.is_template_path("no_extension"));
    }
}
