//! URL to filesystem path resolution for written artifacts.

use std::path::{Path, PathBuf};

/// A file under the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    /// `/`-rooted URL path of the file itself (`/docs/index.html` for `/docs/`).
    pub url: String,
}

/// Resolve a decoded request path under `root`, handling index.html for directories.
pub fn resolve(root: &Path, request_path: &str) -> Option<StaticFile> {
    let clean = request_path.trim_matches('/');

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    // Canonicalize to resolve symlinks and verify path is under root
    let root = root.canonicalize().ok()?;
    let canonical = root.join(clean).canonicalize().ok()?;
    if !canonical.starts_with(&root) {
        return None;
    }

    let file = if canonical.is_dir() {
        let index = canonical.join("index.html");
        index.is_file().then_some(index)?
    } else if canonical.is_file() {
        canonical
    } else {
        return None;
    };

    let url = url_path(&file, &root)?;
    Some(StaticFile { path: file, url })
}

fn url_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(format!("/{}", segments.join("/")))
}
