//! Ordered route table.
//!
//! # Module Structure
//!
//! ```text
//! route/
//! ├── pattern   # PathPattern, Params, PatternError
//! ├── cache     # CacheSource expansion
//! ├── http      # Request / Response values
//! └── mod.rs    # Route, RouteTable, Handler, Context (this file)
//! ```
//!
//! Matching is a single pass in registration order: the first route whose
//! pattern matches wins, with no specificity-based reordering.

pub mod cache;
pub mod http;
pub mod pattern;

pub use cache::CacheSource;
pub use http::{Method, Request, Response};
pub use pattern::{Params, PathPattern, PatternError};

use crate::fingerprint::FingerprintTable;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Route handler: renders one pathname.
pub type Handler = Arc<dyn Fn(&Context<'_>) -> anyhow::Result<Output> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F, O>(f: F) -> Handler
where
    F: Fn(&Context<'_>) -> anyhow::Result<O> + Send + Sync + 'static,
    O: Into<Output>,
{
    Arc::new(move |cx| f(cx).map(Into::into))
}

// ============================================================================
// Output
// ============================================================================

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Artifact bytes: fingerprinted or etagged, then written.
    Body(Vec<u8>),
    /// Returned as-is when serving, ignored when building.
    Passthrough(Response),
}

impl From<Vec<u8>> for Output {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Body(bytes)
    }
}

impl From<&[u8]> for Output {
    fn from(bytes: &[u8]) -> Self {
        Self::Body(bytes.to_vec())
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Self::Body(text.into_bytes())
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Self::Body(text.as_bytes().to_vec())
    }
}

impl From<Response> for Output {
    fn from(response: Response) -> Self {
        Self::Passthrough(response)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Everything a handler may look at while rendering a pathname.
pub struct Context<'a> {
    pub request: &'a Request,
    pub params: &'a Params,
    /// Logical pathname being rendered.
    pub pathname: &'a str,
    /// Source root.
    pub input: &'a Path,
    /// Output root.
    pub output: &'a Path,
    urls: &'a FingerprintTable,
}

impl<'a> Context<'a> {
    pub fn new(
        request: &'a Request,
        params: &'a Params,
        pathname: &'a str,
        input: &'a Path,
        output: &'a Path,
        urls: &'a FingerprintTable,
    ) -> Self {
        Self {
            request,
            params,
            pathname,
            input,
            output,
            urls,
        }
    }

    /// Fingerprinted path for `path`, or `path` itself when it has none.
    pub fn resolve(&self, path: &str) -> String {
        self.urls.resolve(path)
    }

    /// Shorthand for `params.get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

// ============================================================================
// Route / RouteTable
// ============================================================================

#[derive(Clone)]
pub struct Route {
    pub index: usize,
    pub pattern: PathPattern,
    pub fingerprint: bool,
    pub handler: Handler,
    pub cache: Option<CacheSource>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("index", &self.index)
            .field("pattern", &self.pattern)
            .field("fingerprint", &self.fingerprint)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Append-only list of routes, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; its index is its registration position.
    pub fn push(
        &mut self,
        pattern: PathPattern,
        fingerprint: bool,
        handler: Handler,
        cache: Option<CacheSource>,
    ) -> usize {
        let index = self.routes.len();
        self.routes.push(Route {
            index,
            pattern,
            fingerprint,
            handler,
            cache,
        });
        index
    }

    /// First route matching `path`, with its captures.
    pub fn find(&self, path: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build order: fingerprinting routes first, registration order otherwise.
    pub fn build_order(&self) -> Vec<&Route> {
        let mut order: Vec<&Route> = self.routes.iter().collect();
        order.sort_by_key(|route| !route.fingerprint);
        order
    }
}
