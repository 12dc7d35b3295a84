//! URL path utilities.
//!
//! All functions work on `/`-rooted URL paths (not filesystem paths):
//! - Link type detection (`is_external_link`)
//! - Request URL normalization (`decode_request_path`, `split_query`)
//! - Path arithmetic for import maps (`dirname`, `join`, `relative`)
//! - Extension rewriting (`with_extension`)

use percent_encoding::percent_decode_str;

/// Strip leading slash from a URL path
///
/// # Examples
/// ```
/// use hallmark::utils::url::strip_leading_slash;
/// assert_eq!(strip_leading_slash("/blog/post"), "blog/post");
/// assert_eq!(strip_leading_slash("/"), "");
/// ```
#[inline]
pub fn strip_leading_slash(url: &str) -> &str {
    url.trim_start_matches('/')
}

/// Check if a link is external (has a URL scheme like http:, mailto:, etc.)
///
/// Protocol-relative links (`//cdn.example.com/x.js`) are external too.
///
/// # Examples
/// ```
/// use hallmark::utils::url::is_external_link;
/// assert!(is_external_link("https://example.com"));
/// assert!(is_external_link("//cdn.example.com/lib.js"));
/// assert!(!is_external_link("/about"));
/// ```
#[inline]
pub fn is_external_link(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Split a URL into path and query parts (fragment dropped).
#[inline]
pub fn split_query(url: &str) -> (&str, Option<&str>) {
    let url = url.split_once('#').map_or(url, |(u, _)| u);
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Check whether a query string carries a parameter (with or without value).
pub fn query_has(query: Option<&str>, name: &str) -> bool {
    query.is_some_and(|q| {
        q.split('&')
            .any(|pair| pair.split_once('=').map_or(pair, |(k, _)| k) == name)
    })
}

/// The query with every `name` parameter removed; `None` when nothing is left.
pub fn query_without(query: Option<&str>, name: &str) -> Option<String> {
    let kept: Vec<&str> = query?
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split_once('=').map_or(*pair, |(k, _)| k) != name)
        .collect();
    (!kept.is_empty()).then(|| kept.join("&"))
}

/// Normalize a raw request URL into a decoded, `/`-rooted path.
///
/// Strips the query string and fragment; invalid UTF-8 escapes fall back to
/// the raw path.
pub fn decode_request_path(url: &str) -> String {
    let (path, _) = split_query(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| path.to_string());

    if decoded.starts_with('/') {
        decoded
    } else {
        format!("/{decoded}")
    }
}

/// Directory part of a URL path (always ends without a trailing slash,
/// root is `/`).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

/// Join a relative URL onto a base directory, resolving `.` and `..`.
pub fn join(base_dir: &str, relative: &str) -> String {
    let combined = if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), relative)
    };
    normalize(&combined)
}

/// Resolve `.` and `..` segments. `..` above the root is dropped.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if path.ends_with('/') && out.len() > 1 {
        out.push('/');
    }
    out
}

/// Relative URL from directory `from_dir` to path `to`, always starting with
/// `./` or `../` so it can be used as a module specifier.
pub fn relative(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    // Last target segment is the file name, never shared with a directory.
    let dirs = target.len().saturating_sub(1);
    let common = from
        .iter()
        .zip(target.iter().take(dirs))
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from.len() - common;
    let mut parts: Vec<&str> = Vec::with_capacity(ups + target.len() - common);
    parts.extend(std::iter::repeat_n("..", ups));
    parts.extend(&target[common..]);

    if ups == 0 {
        format!("./{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

/// Replace the extension of the final path segment (adds one if missing).
pub fn with_extension(path: &str, ext: &str) -> String {
    let dir_end = path.rfind('/').map_or(0, |p| p + 1);
    let name = &path[dir_end..];
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    if stem.is_empty() {
        return path.to_string();
    }
    format!("{}{}.{}", &path[..dir_end], stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without() {
        assert_eq!(query_without(Some("inline"), "inline"), None);
        assert_eq!(query_without(Some("v=2&inline&w=3"), "inline").as_deref(), Some("v=2&w=3"));
        assert_eq!(query_without(Some("inline=1&v=2"), "inline").as_deref(), Some("v=2"));
        assert_eq!(query_without(None, "inline"), None);
    }

    #[test]
    fn test_is_external_link() {
        assert!(is_external_link("https://example.com"));
        assert!(is_external_link("http://example.com"));
        assert!(is_external_link("mailto:user@example.com"));
        assert!(is_external_link("//fonts.example.com/a.css"));
        assert!(!is_external_link("/about"));
        assert!(!is_external_link("./file.txt"));
        assert!(!is_external_link("#section"));
    }

    #[test]
    fn test_split_query() {
        assert_eq!(split_query("/a.css?inline"), ("/a.css", Some("inline")));
        assert_eq!(split_query("/a.css#x"), ("/a.css", None));
        assert_eq!(split_query("/a.css"), ("/a.css", None));
    }

    #[test]
    fn test_query_has() {
        assert!(query_has(Some("inline"), "inline"));
        assert!(query_has(Some("v=1&inline="), "inline"));
        assert!(!query_has(Some("inlined=1"), "inline"));
        assert!(!query_has(None, "inline"));
    }

    #[test]
    fn test_decode_request_path() {
        assert_eq!(decode_request_path("/blog/hello%20world?x=1"), "/blog/hello world");
        assert_eq!(decode_request_path("/"), "/");
        assert_eq!(decode_request_path("style.css"), "/style.css");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/index.html"), "/");
        assert_eq!(dirname("/blog/post/index.html"), "/blog/post");
        assert_eq!(dirname("/"), "/");
    }

    #[test]
    fn test_join_and_normalize() {
        assert_eq!(join("/blog", "./app.js"), "/blog/app.js");
        assert_eq!(join("/blog/post", "../lib/util.js"), "/blog/lib/util.js");
        assert_eq!(join("/", "../../x.js"), "/x.js");
        assert_eq!(join("/blog", "/abs.js"), "/abs.js");
        assert_eq!(normalize("/a/./b/../c/"), "/a/c/");
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative("/js", "/js/util.js"), "./util.js");
        assert_eq!(relative("/js", "/lib/dep.js"), "../lib/dep.js");
        assert_eq!(relative("/", "/app.js"), "./app.js");
        assert_eq!(relative("/a/b", "/a/c/d.js"), "../c/d.js");
    }

    #[test]
    fn test_relative_roundtrip_through_join() {
        let rel = relative("/js/app", "/vendor/x.js");
        assert_eq!(join("/js/app", &rel), "/vendor/x.js");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("/main.ts", "js"), "/main.js");
        assert_eq!(with_extension("/styles/site.scss", "css"), "/styles/site.css");
        assert_eq!(with_extension("/styles/site", "css"), "/styles/site.css");
        assert_eq!(with_extension("/a.b/c", "js"), "/a.b/c.js");
    }
}
