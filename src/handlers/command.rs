//! External transforms: `transform(sourcePath) -> bytes`.
//!
//! The command runs once per artifact with `{path}` replaced by the source
//! file (or the path appended when no argument mentions it). Its stdout is the
//! artifact.

use super::file::source_path;
use crate::route::{Context, Output};
use crate::utils::exec::Cmd;
use crate::utils::url;
use anyhow::{Result, bail};
use std::path::PathBuf;

/// Placeholder substituted with the source path.
pub const PATH_PLACEHOLDER: &str = "{path}";

#[derive(Debug, Clone)]
pub struct CommandHandler {
    argv: Vec<String>,
    /// Source extension tried when `<input>/<pathname>` does not exist
    /// (`/main.js` built from `main.ts`).
    fallback_ext: Option<String>,
}

impl CommandHandler {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            fallback_ext: None,
        }
    }

    pub fn fallback_ext(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.fallback_ext = Some(ext.trim_start_matches('.').to_string());
        self
    }

    /// Source file for a pathname, honoring the fallback extension.
    pub fn source(&self, cx: &Context<'_>) -> Result<PathBuf> {
        let primary = source_path(cx.input, cx.pathname);
        if primary.is_file() {
            return Ok(primary);
        }
        if let Some(ext) = &self.fallback_ext {
            let fallback = source_path(cx.input, &url::with_extension(cx.pathname, ext));
            if fallback.is_file() {
                return Ok(fallback);
            }
        }
        bail!("no source for {} under {}", cx.pathname, cx.input.display())
    }

    /// Argument list with the source path substituted in.
    fn argv(&self, source: &str) -> Vec<String> {
        let mut argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, source))
            .collect();
        if !self.argv.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)) {
            argv.push(source.to_string());
        }
        argv
    }

    pub fn call(&self, cx: &Context<'_>) -> Result<Output> {
        let source = self.source(cx)?;
        let argv = self.argv(&source.to_string_lossy());
        let stdout = Cmd::from_slice(&argv).cwd(cx.input).stdout()?;
        Ok(Output::Body(stdout))
    }

    pub fn into_fn(self) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
        move |cx: &Context<'_>| self.call(cx)
    }
}

/// Shorthand for `CommandHandler::new(argv).into_fn()`.
pub fn command<I, S>(argv: I) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandHandler::new(argv).into_fn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintTable;
    use crate::route::{Params, Request};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn with_cx<T>(input: &Path, pathname: &str, f: impl FnOnce(&Context<'_>) -> T) -> T {
        let request = Request::get(pathname);
        let params = Params::new();
        let urls = FingerprintTable::new();
        f(&Context::new(&request, &params, pathname, input, input, &urls))
    }

    #[test]
    fn test_argv_substitution() {
        let h = CommandHandler::new(["esbuild", "--entry={path}", "--minify"]);
        assert_eq!(h.argv("/a.ts"), vec!["esbuild", "--entry=/a.ts", "--minify"]);

        let appended = CommandHandler::new(["cat"]);
        assert_eq!(appended.argv("/a.ts"), vec!["cat", "/a.ts"]);
    }

    #[test]
    fn test_fallback_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.ts"), "let x: number = 1;").unwrap();
        let h = CommandHandler::new(["cat"]).fallback_ext(".ts");
        let source = with_cx(dir.path(), "/main.js", |cx| h.source(cx)).unwrap();
        assert_eq!(source, dir.path().join("main.ts"));

        let plain = CommandHandler::new(["cat"]);
        assert!(with_cx(dir.path(), "/main.js", |cx| plain.source(cx)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_artifact() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.css"), "body { color: red; }").unwrap();
        let h = CommandHandler::new(["cat", "{path}"]);
        let out = with_cx(dir.path(), "/a.css", |cx| h.call(cx)).unwrap();
        assert_eq!(out, Output::from("body { color: red; }"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        let h = CommandHandler::new(["sh", "-c", "echo 'syntax error' >&2; exit 1", "sh"]);
        let err = with_cx(dir.path(), "/a.css", |cx| h.call(cx)).unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }
}
