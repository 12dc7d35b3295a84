//! One artifact: render, rewrite, hash, write.

use super::pool::Job;
use crate::app::Site;
use crate::fingerprint::{self, FingerprintTable};
use crate::rewrite;
use crate::route::{Context as RouteContext, Handler, Output, Params, Request};
use crate::utils::{mime, url};
use anyhow::{Context, Result, anyhow, bail};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Outcome of one job, sent back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Written under a fingerprinted name.
    Fingerprinted { original: String, path: String },
    /// Written under its own name with a weak validator.
    Tagged { path: String, etag: String },
    /// Handler returned a response; nothing written.
    Passthrough { pathname: String },
    /// The cached pathname does not match the route's pattern.
    Unmatched { pathname: String },
    /// Handler or write failed; nothing written.
    Failed { pathname: String, error: String },
}

/// Render and write one cached pathname of one route.
pub fn process(site: &Site, job: &Job) -> Result<Reply> {
    let route = site
        .routes
        .get(job.route_index)
        .ok_or_else(|| anyhow!("no route with index {}", job.route_index))?;

    let Some(params) = route.pattern.matches(&job.pathname) else {
        return Ok(Reply::Unmatched {
            pathname: job.pathname.clone(),
        });
    };

    let Some(bytes) = render(site, &route.handler, &job.pathname, &params, &job.urls)? else {
        return Ok(Reply::Passthrough {
            pathname: job.pathname.clone(),
        });
    };

    let logical = fingerprint::normalize_index(&job.pathname);
    let bytes = finalize(site, &logical, bytes, &job.urls);
    let token = fingerprint::token(&bytes);

    if route.fingerprint {
        let path = fingerprint::fingerprinted_path(&logical, &token);
        write(&site.files_dir(), &path, &bytes)?;
        Ok(Reply::Fingerprinted {
            original: logical,
            path,
        })
    } else {
        write(&site.files_dir(), &logical, &bytes)?;
        Ok(Reply::Tagged {
            path: logical,
            etag: fingerprint::weak_etag(&token),
        })
    }
}

/// Run a handler with a simulated `GET`. `None` for passthrough responses.
pub fn render(
    site: &Site,
    handler: &Handler,
    pathname: &str,
    params: &Params,
    urls: &FingerprintTable,
) -> Result<Option<Vec<u8>>> {
    let request = Request::get(pathname);
    let cx = RouteContext::new(&request, params, pathname, &site.input, &site.output, urls);
    match handler(&cx).with_context(|| format!("handler failed for {pathname}"))? {
        Output::Body(bytes) => Ok(Some(bytes)),
        Output::Passthrough(_) => Ok(None),
    }
}

/// HTML artifacts go through the URL rewriter; everything else is untouched.
pub fn finalize(site: &Site, path: &str, bytes: Vec<u8>, urls: &FingerprintTable) -> Vec<u8> {
    if !mime::is_html(mime::from_url_path(path)) {
        return bytes;
    }
    match String::from_utf8(bytes) {
        Ok(html) => rewrite::rewrite(&html, path, urls, &site.files_dir(), site.inline).into_bytes(),
        // not text; write as-is
        Err(e) => e.into_bytes(),
    }
}

/// Render the not-found handler once and write `<output>/404.html`.
///
/// Returns `false` when there is no handler or it produced a passthrough.
pub fn write_not_found(site: &Site, urls: &FingerprintTable) -> Result<bool> {
    const PATHNAME: &str = "/404.html";

    let Some(handler) = &site.not_found else {
        return Ok(false);
    };
    let Some(bytes) = render(site, handler, PATHNAME, &Params::new(), urls)? else {
        return Ok(false);
    };

    let bytes = finalize(site, PATHNAME, bytes, urls);
    let path = site.output.join("404.html");
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Write `bytes` at URL path `path` under `root`, creating parent directories.
pub fn write(root: &Path, path: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = safe_join(root, path)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&target, bytes).with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}

/// Join a URL path onto `root`, refusing anything that would leave it.
fn safe_join(root: &Path, path: &str) -> Result<PathBuf> {
    let rel = Path::new(url::strip_leading_slash(path));
    if rel.as_os_str().is_empty() {
        bail!("empty artifact path `{path}`");
    }
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        bail!("artifact path `{path}` escapes the output directory");
    }
    Ok(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_join() {
        let root = Path::new("/out/files");
        assert_eq!(
            safe_join(root, "/css/site.css").unwrap(),
            PathBuf::from("/out/files/css/site.css")
        );
        assert!(safe_join(root, "/../etc/passwd").is_err());
        assert!(safe_join(root, "/a/../../b").is_err());
        assert!(safe_join(root, "/").is_err());
    }

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "/a/b/c.txt", b"hi").unwrap();
        assert_eq!(fs::read(target).unwrap(), b"hi");
    }
}
