//! Content types for served and built artifacts.
//!
//! Lookup is by the last extension of a logical URL path, case-insensitive.
//! Anything unrecognized is `application/octet-stream`.

use std::path::Path;

/// Content types referenced by name elsewhere in the crate.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Extension groups and their content type.
const BY_EXTENSION: &[(&[&str], &str)] = &[
    (&["html", "htm"], types::HTML),
    (&["css"], types::CSS),
    (&["js", "mjs", "cjs"], types::JAVASCRIPT),
    (&["json", "map", "webmanifest"], types::JSON),
    (&["txt"], types::PLAIN),
    (&["xml"], "application/xml"),
    (&["rss"], "application/rss+xml"),
    (&["atom"], "application/atom+xml"),
    (&["md"], "text/markdown; charset=utf-8"),
    (&["csv"], "text/csv; charset=utf-8"),
    (&["svg"], "image/svg+xml"),
    (&["png"], "image/png"),
    (&["jpg", "jpeg"], "image/jpeg"),
    (&["gif"], "image/gif"),
    (&["webp"], "image/webp"),
    (&["avif"], "image/avif"),
    (&["ico"], "image/x-icon"),
    (&["woff"], "font/woff"),
    (&["woff2"], "font/woff2"),
    (&["ttf"], "font/ttf"),
    (&["otf"], "font/otf"),
    (&["mp3"], "audio/mpeg"),
    (&["ogg", "oga"], "audio/ogg"),
    (&["wav"], "audio/wav"),
    (&["mp4", "m4v"], "video/mp4"),
    (&["webm"], "video/webm"),
    (&["pdf"], "application/pdf"),
    (&["wasm"], "application/wasm"),
    (&["zip"], "application/zip"),
];

/// Content type for an extension without its dot.
pub fn from_extension(ext: &str) -> &'static str {
    BY_EXTENSION
        .iter()
        .find(|(exts, _)| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .map_or(types::OCTET_STREAM, |(_, mime)| mime)
}

pub fn is_html(mime: &str) -> bool {
    mime.starts_with("text/html")
}

/// Content type for a logical URL path.
///
/// Directory-style paths (trailing `/`) are pages and resolve to HTML;
/// extensionless paths are plain text.
pub fn from_url_path(path: &str) -> &'static str {
    if path.is_empty() || path.ends_with('/') {
        return types::HTML;
    }
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => from_extension(ext),
        None => types::PLAIN,
    }
}
