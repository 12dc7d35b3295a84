//! Cache sources: which concrete paths a route is pre-built for.

use super::{PathPattern, RouteTable};
use crate::debug;
use anyhow::{Context, Result};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Callback returning the pathnames to pre-build.
pub type CacheCallback = Arc<dyn Fn() -> Result<Vec<String>> + Send + Sync>;

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Declared cache source of a route, resolved once at registration.
#[derive(Clone)]
pub enum CacheSource {
    /// Explicit pathnames.
    Paths(Vec<String>),
    /// Computed pathnames.
    Callback(CacheCallback),
    /// Every file under the input root that the route's own pattern matches.
    Glob,
}

impl CacheSource {
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Paths(paths.into_iter().map(Into::into).collect())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<String>> + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Expand into concrete pathnames.
    pub fn expand(&self, pattern: &PathPattern, input: &Path) -> Result<Vec<String>> {
        match self {
            Self::Paths(paths) => Ok(paths.clone()),
            Self::Callback(f) => {
                f().with_context(|| format!("cache callback for `{pattern}` failed"))
            }
            Self::Glob => Ok(glob(pattern, input)),
        }
    }
}

impl fmt::Debug for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paths(paths) => f.debug_tuple("Paths").field(paths).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Glob => f.write_str("Glob"),
        }
    }
}

/// Walk `input` and keep the files `pattern` matches, as sorted `/`-rooted paths.
///
/// A missing input root yields no paths.
pub fn glob(pattern: &PathPattern, input: &Path) -> Vec<String> {
    if !input.is_dir() {
        debug!("build"; "input root {} missing, `{}` caches nothing", input.display(), pattern);
        return Vec::new();
    }

    let mut paths: Vec<String> = WalkDir::new(input)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .filter_map(|e| url_path(&e.path(), input))
        .filter(|path| pattern.is_match(path))
        .collect();
    paths.sort();
    paths
}

/// `<input>/css/site.css` → `/css/site.css`
fn url_path(path: &Path, input: &Path) -> Option<String> {
    let rel = path.strip_prefix(input).ok()?;
    let segments: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(format!("/{}", segments.join("/")))
}

/// Expand every route's cache source, in parallel across routes.
///
/// Result `i` belongs to route index `i`; routes without a source get an
/// empty list. The first failing expansion aborts the whole build.
pub fn expand_all(table: &RouteTable, input: &Path) -> Result<Vec<Vec<String>>> {
    table
        .routes()
        .par_iter()
        .map(|route| match &route.cache {
            Some(source) => source.expand(&route.pattern, input),
            None => Ok(Vec::new()),
        })
        .collect()
}
