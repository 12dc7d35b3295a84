//! Serve source files as-is.

use crate::route::{Context, Output};
use crate::utils::url;
use anyhow::{Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Read `<input>/<pathname>`.
pub fn file() -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
    |cx: &Context<'_>| read(&source_path(cx.input, cx.pathname))
}

/// Always read `source`; relative paths resolve against the input root.
pub fn file_from(
    source: impl Into<PathBuf>,
) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
    let source = source.into();
    move |cx: &Context<'_>| {
        if source.is_absolute() {
            read(&source)
        } else {
            read(&cx.input.join(&source))
        }
    }
}

/// `<input>` joined with a normalized pathname; `..` cannot climb out.
pub fn source_path(input: &Path, pathname: &str) -> PathBuf {
    let normalized = url::normalize(pathname);
    input.join(url::strip_leading_slash(&normalized))
}

fn read(path: &Path) -> Result<Output> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Output::Body(bytes))
}
