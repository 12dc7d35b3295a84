//! Which filesystem events count as a site change.

use std::path::{Path, PathBuf};

use crate::route::PathPattern;

pub struct EventFilter {
    root: PathBuf,
    output: PathBuf,
    ignore: Vec<PathPattern>,
}

impl EventFilter {
    /// `root` and `output` must be absolute, like the paths notify reports.
    pub fn new(root: PathBuf, output: PathBuf, ignore: Vec<PathPattern>) -> Self {
        Self {
            root,
            output,
            ignore,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if path.starts_with(&self.output) || is_temp_file(path) {
            return false;
        }
        match url_path(path, &self.root) {
            Some(rel) => !self.ignore.iter().any(|p| p.is_match(&rel)),
            // outside the root: a watched symlink target, keep it
            None => true,
        }
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}

/// `<root>/src/a.css` → `/src/a.css`
fn url_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", segments.join("/")))
}
