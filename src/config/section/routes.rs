//! `[[routes]]` and `[not_found]` configuration.
//!
//! # Example
//!
//! ```toml
//! [[routes]]
//! pattern = "/main.js"
//! fingerprint = true
//! handler = { kind = "command", command = ["esbuild", "--bundle", "--minify", "{path}"], fallback_ext = "ts" }
//!
//! [[routes]]
//! pattern = "/old/:slug"
//! handler = { kind = "redirect", location = "/blog/", permanent = true }
//! cache = false
//!
//! [[routes]]
//! pattern = "/**"
//! fingerprint = true
//! handler = { kind = "file" }
//!
//! [not_found]
//! kind = "file"
//! source = "public/404.html"
//! ```
//!
//! `cache` is `true` (default source), `false` (never pre-built) or an
//! explicit list of pathnames.

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::handlers::HandlerConfig;
use crate::route::PathPattern;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,

    #[serde(default)]
    pub fingerprint: bool,

    #[serde(default)]
    pub handler: HandlerConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheConfig {
    /// `true` = default source for the route kind, `false` = none.
    Default(bool),
    Paths(Vec<String>),
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::Default(true)
    }
}

/// Validate every route, collecting all problems.
pub fn validate_routes(routes: &[RouteConfig], diag: &mut ConfigDiagnostics) {
    for (i, route) in routes.iter().enumerate() {
        if let Err(e) = PathPattern::parse(&route.pattern) {
            diag.pattern(FieldPath::indexed("routes", i, "pattern"), &e);
        }
        route
            .handler
            .validate(FieldPath::indexed("routes", i, "handler"), diag);
        if let CacheConfig::Paths(paths) = &route.cache {
            for path in paths.iter().filter(|p| !p.starts_with('/')) {
                diag.error(
                    FieldPath::indexed("routes", i, "cache"),
                    format!("cache path `{path}` must start with `/`"),
                );
            }
        }
    }
}
