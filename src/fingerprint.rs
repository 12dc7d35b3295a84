//! Content fingerprints for cache busting.
//!
//! Every built artifact is hashed with SHA-256; the first [`TOKEN_LEN`] hex
//! characters form its token. The same token drives both outputs:
//!
//! - fingerprinting routes: `/style.css` is written as `/style-<token>.css`
//!   and recorded in the [`FingerprintTable`]
//! - other routes: the file keeps its path and gets the weak validator
//!   `W/"<token>"` in the [`ETagTable`]
//!
//! Identical bytes always yield identical tokens, so rebuilding unchanged
//! sources reproduces the same file names and validators.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Token length in hex characters.
pub const TOKEN_LEN: usize = 8;

/// Matches a file name carrying a token: `name-0123abcd.ext` or `name-0123abcd`.
static FINGERPRINT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"-[0-9a-f]{{{TOKEN_LEN}}}(\.[^/.]+)?$")).expect("valid fingerprint regex")
});

/// Compute the content token for a byte payload.
pub fn token(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LEN);
    token
}

/// Splice a token into the file name, before the last extension.
///
/// `/css/site.css` + `0123abcd` → `/css/site-0123abcd.css`
pub fn fingerprinted_path(path: &str, token: &str) -> String {
    let dir_end = path.rfind('/').map_or(0, |p| p + 1);
    let (dir, name) = path.split_at(dir_end);
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{dir}{}-{token}{}", &name[..dot], &name[dot..]),
        _ => format!("{dir}{name}-{token}"),
    }
}

/// Wrap a token as a weak HTTP validator.
pub fn weak_etag(token: &str) -> String {
    format!("W/\"{token}\"")
}

/// Whether a request path has the fingerprinted file name shape.
pub fn is_fingerprinted(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    FINGERPRINT_SHAPE.is_match(name)
}

/// Trailing-slash paths are pages: `/` → `/index.html`, `/blog/` → `/blog/index.html`.
pub fn normalize_index(path: &str) -> String {
    if path.is_empty() {
        return "/index.html".to_string();
    }
    if path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path.to_string()
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Logical path → fingerprinted path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintTable(BTreeMap<String, String>);

impl FingerprintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprinted path for `path`, or `path` itself when unknown.
    pub fn resolve(&self, path: &str) -> String {
        self.get(path).unwrap_or(path).to_string()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, original: impl Into<String>, fingerprinted: impl Into<String>) {
        self.0.insert(original.into(), fingerprinted.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every fingerprinted output path, for reverse lookups.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }
}

/// Path → weak validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETagTable(BTreeMap<String, String>);

impl ETagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, etag: impl Into<String>) {
        self.0.insert(path.into(), etag.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Both tables, as produced by a build and embedded into the server entry.
///
/// A path lives in exactly one table: recording it in one removes it from
/// the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub urls: FingerprintTable,
    #[serde(default)]
    pub etags: ETagTable,
}

impl Manifest {
    /// Build from the static slices emitted into a generated server entry.
    pub fn from_static(urls: &[(&str, &str)], etags: &[(&str, &str)]) -> Self {
        let mut manifest = Self::default();
        for (original, fingerprinted) in urls {
            manifest.record_fingerprint(*original, *fingerprinted);
        }
        for (path, etag) in etags {
            manifest.record_etag(*path, *etag);
        }
        manifest
    }

    pub fn record_fingerprint(&mut self, original: impl Into<String>, path: impl Into<String>) {
        let original = original.into();
        if self.etags.remove(&original).is_some() {
            crate::debug!("build"; "{} moved from etag table to fingerprint table", original);
        }
        self.urls.insert(original, path);
    }

    pub fn record_etag(&mut self, path: impl Into<String>, etag: impl Into<String>) {
        let path = path.into();
        if self.urls.remove(&path).is_some() {
            crate::debug!("build"; "{} moved from fingerprint table to etag table", path);
        }
        self.etags.insert(path, etag);
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.etags.is_empty()
    }
}
