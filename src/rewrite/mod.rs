//! HTML reference rewriting.
//!
//! Replaces internal asset references with their fingerprinted paths:
//!
//! | Element                              | Attribute | Coerced to |
//! |--------------------------------------|-----------|------------|
//! | `link[rel~=stylesheet]`              | `href`    | `.css`     |
//! | `link[rel~=preload\|modulepreload]`  | `href`    |            |
//! | `script`                             | `src`     | `.js`      |
//! | `img`                                | `src`     |            |
//! | `img`, `source`                      | `srcset`  |            |
//!
//! References missing from the table are left as written, except that the
//! coerced extension still applies.
//!
//! A `?inline` marker on a stylesheet or script (when inlining is allowed)
//! replaces the reference with the artifact already written under
//! `<output>/files`. Inlined scripts get an import map so relative module
//! imports keep resolving from the page.

use crate::fingerprint::FingerprintTable;
use crate::log;
use crate::utils::html::StartTag;
use crate::utils::url;
use anyhow::{Context, Result};
use jwalk::WalkDir;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Comments, or a start tag of an element we care about.
static SCANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<!--.*?-->|<(link|script|img|source|style)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("valid scanner regex")
});

static SCRIPT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</script\s*>").expect("valid regex"));

static STYLE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</style\s*>").expect("valid regex"));

/// Rewrite `html` rendered for `page` against the fingerprint table.
///
/// `files` is `<output>/files`, used for inlining.
pub fn rewrite(
    html: &str,
    page: &str,
    urls: &FingerprintTable,
    files: &Path,
    inline: bool,
) -> String {
    Rewriter {
        page,
        urls,
        files,
        inline,
    }
    .run(html)
}

struct Rewriter<'a> {
    page: &'a str,
    urls: &'a FingerprintTable,
    files: &'a Path,
    inline: bool,
}

/// A reference after lookup.
struct Resolved {
    /// Attribute value to emit. Equals the original on a table miss, apart
    /// from extension coercion.
    value: String,
    /// Logical or fingerprinted path of the artifact, for inlining.
    target: String,
    inline: bool,
}

impl Rewriter<'_> {
    fn run(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut pos = 0;

        while let Some(caps) = SCANNER.captures_at(html, pos) {
            let Some(whole) = caps.get(0) else { break };
            out.push_str(&html[pos..whole.start()]);
            pos = whole.end();

            let Some(name) = caps.get(1) else {
                // comment
                out.push_str(whole.as_str());
                continue;
            };
            let raw = caps.get(2).map_or("", |m| m.as_str());
            let mut tag = StartTag::parse(name.as_str(), raw);

            match tag.name.as_str() {
                "style" => {
                    out.push_str(whole.as_str());
                    pos = copy_through(html, pos, &STYLE_END, &mut out);
                }
                "script" => pos = self.script(html, whole.as_str(), tag, pos, &mut out),
                "link" => out.push_str(&self.link(whole.as_str(), &mut tag)),
                _ => {
                    if self.media(&mut tag) {
                        out.push_str(&tag.render());
                    } else {
                        out.push_str(whole.as_str());
                    }
                }
            }
        }

        out.push_str(&html[pos..]);
        out
    }

    /// Look up one reference. `None` for external or empty references.
    ///
    /// A hit swaps in the fingerprinted path and keeps every query parameter
    /// but `inline`. A miss keeps the reference as written, only coercing the
    /// extension when `coerce` is set.
    fn resolve(&self, raw: &str, coerce: Option<&str>) -> Option<Resolved> {
        let value = raw.trim();
        if value.is_empty() || url::is_external_link(value) || value.starts_with('#') {
            return None;
        }
        let (path, query) = url::split_query(value);
        if path.is_empty() {
            return None;
        }
        let fragment = value.find('#').map_or("", |i| &value[i..]);

        let absolute = url::join(url::dirname(self.page), path);
        let logical = match coerce {
            Some(ext) => url::with_extension(&absolute, ext),
            None => absolute,
        };
        let inline = self.inline && url::query_has(query, "inline");

        if let Some(hashed) = self.urls.get(&logical) {
            let mut emitted = hashed.to_string();
            if let Some(rest) = url::query_without(query, "inline") {
                emitted.push('?');
                emitted.push_str(&rest);
            }
            emitted.push_str(fragment);
            return Some(Resolved {
                value: emitted,
                target: hashed.to_string(),
                inline,
            });
        }

        let emitted = match coerce.map(|ext| url::with_extension(path, ext)) {
            Some(coerced) if coerced != path => format!("{coerced}{}", &value[path.len()..]),
            _ => raw.to_string(),
        };
        Some(Resolved {
            value: emitted,
            target: logical,
            inline,
        })
    }

    /// Set `attr` to the resolved value, or keep the original markup when
    /// nothing changed.
    fn emit(original: &str, tag: &mut StartTag, attr: &str, raw: &str, resolved: Resolved) -> String {
        if resolved.value == raw {
            return original.to_string();
        }
        tag.set(attr, resolved.value);
        tag.render()
    }

    fn link(&self, original: &str, tag: &mut StartTag) -> String {
        let Some(href) = tag.get("href").map(str::to_string) else {
            return original.to_string();
        };

        if tag.has_token("rel", "stylesheet") {
            let Some(resolved) = self.resolve(&href, Some("css")) else {
                return original.to_string();
            };
            if resolved.inline {
                match self.read(&resolved.target) {
                    Ok(css) => return format!("<style>{css}</style>"),
                    Err(e) => log!("warning"; "{}: cannot inline {}: {:#}", self.page, href, e),
                }
            }
            return Self::emit(original, tag, "href", &href, resolved);
        }

        let coerce = if tag.has_token("rel", "modulepreload") {
            Some("js")
        } else if tag.has_token("rel", "preload") {
            match tag.get("as") {
                Some("style") => Some("css"),
                Some("script") => Some("js"),
                _ => None,
            }
        } else {
            return original.to_string();
        };

        match self.resolve(&href, coerce) {
            Some(resolved) => Self::emit(original, tag, "href", &href, resolved),
            None => original.to_string(),
        }
    }

    /// Returns the position after the element.
    fn script(
        &self,
        html: &str,
        original: &str,
        mut tag: StartTag,
        pos: usize,
        out: &mut String,
    ) -> usize {
        let resolved = tag
            .get("src")
            .map(str::to_string)
            .and_then(|src| self.resolve(&src, Some("js")).map(|r| (src, r)));

        let Some((src, resolved)) = resolved else {
            out.push_str(original);
            return copy_through(html, pos, &SCRIPT_END, out);
        };

        if resolved.inline {
            match self.read(&resolved.target) {
                Ok(code) => {
                    match self.import_map(&resolved.target) {
                        Ok(map) => out.push_str(&map),
                        Err(e) => log!("warning"; "{}: import map skipped: {:#}", self.page, e),
                    }
                    tag.remove("src");
                    tag.self_closing = false;
                    out.push_str(&tag.render());
                    out.push_str(&code);
                    out.push_str("</script>");
                    // drop the original body and closing tag
                    let mut discard = String::new();
                    return copy_through(html, pos, &SCRIPT_END, &mut discard);
                }
                Err(e) => log!("warning"; "{}: cannot inline {}: {:#}", self.page, src, e),
            }
        }

        out.push_str(&Self::emit(original, &mut tag, "src", &src, resolved));
        copy_through(html, pos, &SCRIPT_END, out)
    }

    /// `img[src]`, `img[srcset]`, `source[srcset]`. Returns whether anything changed.
    fn media(&self, tag: &mut StartTag) -> bool {
        let mut changed = false;

        if tag.name == "img"
            && let Some(src) = tag.get("src").map(str::to_string)
            && let Some(resolved) = self.resolve(&src, None)
            && resolved.value != src
        {
            tag.set("src", resolved.value);
            changed = true;
        }

        if let Some(rewritten) = tag.get("srcset").and_then(|srcset| self.srcset(srcset)) {
            tag.set("srcset", rewritten);
            changed = true;
        }

        changed
    }

    /// `a.png 1x, b.png 2x` → each candidate URL resolved, descriptors kept.
    /// `None` when no candidate is in the table.
    fn srcset(&self, value: &str) -> Option<String> {
        let mut any_hit = false;
        let candidates: Vec<String> = value
            .split(',')
            .map(|candidate| {
                let candidate = candidate.trim();
                let mut parts = candidate.split_whitespace();
                let Some(path) = parts.next() else {
                    return candidate.to_string();
                };
                let path = match self.resolve(path, None) {
                    Some(r) if r.value != path => {
                        any_hit = true;
                        r.value
                    }
                    _ => path.to_string(),
                };
                std::iter::once(path.as_str())
                    .chain(parts)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        any_hit.then(|| candidates.join(","))
    }

    fn read(&self, path: &str) -> Result<String> {
        let file = self.files.join(url::strip_leading_slash(path));
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))
    }

    /// `<script type="importmap">` mapping every built `.js` file, keyed by the
    /// specifier a module at `script` would use, joined onto the page directory.
    fn import_map(&self, script: &str) -> Result<String> {
        let script_dir = url::dirname(script);
        let page_dir = url::dirname(self.page);

        let imports: BTreeMap<String, String> = built_scripts(self.files)
            .into_iter()
            .map(|u| {
                let specifier = url::join(page_dir, &url::relative(script_dir, &u));
                (specifier, u)
            })
            .collect();

        let json = serde_json::to_string(&serde_json::json!({ "imports": imports }))
            .context("failed to encode import map")?;
        Ok(format!(r#"<script type="importmap">{json}</script>"#))
    }
}

/// Every `.js` file under `files`, as `/`-rooted URL paths.
fn built_scripts(files: &Path) -> Vec<String> {
    let mut scripts: Vec<String> = WalkDir::new(files)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "js"))
        .filter_map(|e| {
            let path = e.path();
            let rel = path.strip_prefix(files).ok()?;
            let parts: Vec<&str> = rel
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<_>>()?;
            Some(format!("/{}", parts.join("/")))
        })
        .collect();
    scripts.sort();
    scripts
}

/// Copy `html[pos..]` up to and including the first `end` match into `out`.
fn copy_through(html: &str, pos: usize, end: &Regex, out: &mut String) -> usize {
    match end.find_at(html, pos) {
        Some(m) => {
            out.push_str(&html[pos..m.end()]);
            m.end()
        }
        None => {
            out.push_str(&html[pos..]);
            html.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> FingerprintTable {
        let mut urls = FingerprintTable::new();
        urls.insert("/style.css", "/style-0123abcd.css");
        urls.insert("/main.js", "/main-89abcdef.js");
        urls.insert("/img/logo.png", "/img/logo-11111111.png");
        urls.insert("/img/logo@2x.png", "/img/logo@2x-22222222.png");
        urls
    }

    fn run(html: &str) -> String {
        rewrite(html, "/index.html", &table(), Path::new("/nonexistent"), true)
    }

    #[test]
    fn test_stylesheet_href() {
        let out = run(r#"<link rel="stylesheet" href="/style.css">"#);
        assert_eq!(out, r#"<link rel="stylesheet" href="/style-0123abcd.css">"#);
    }

    #[test]
    fn test_stylesheet_coerced_from_source_extension() {
        let out = run(r#"<link href="/style.scss" rel="stylesheet">"#);
        assert!(out.contains(r#"href="/style-0123abcd.css""#));
    }

    #[test]
    fn test_relative_reference_from_nested_page() {
        let out = rewrite(
            r#"<img src="../img/logo.png">"#,
            "/blog/post.html",
            &table(),
            Path::new("/nonexistent"),
            true,
        );
        assert_eq!(out, r#"<img src="/img/logo-11111111.png">"#);
    }

    #[test]
    fn test_script_src_coerced_to_js() {
        let out = run(r#"<script type="module" src="/main.ts"></script>"#);
        assert_eq!(
            out,
            r#"<script type="module" src="/main-89abcdef.js"></script>"#
        );
    }

    #[test]
    fn test_unknown_and_external_untouched() {
        let html = concat!(
            r#"<link rel="stylesheet" href="https://cdn.example.com/x.css">"#,
            r#"<img src="/unknown.png">"#,
            r#"<script src="//cdn.example.com/lib.js"></script>"#,
            r#"<a href="/style.css">x</a>"#,
        );
        assert_eq!(run(html), html);
    }

    #[test]
    fn test_misses_keep_relative_paths_and_queries() {
        let html = concat!(
            r#"<img src="/thumb.png?w=200">"#,
            r#"<img src="logo.png">"#,
            r#"<link rel="preload" as="image" href="/hero.png?v=3">"#,
            r#"<img srcset="a.png 1x, b.png 2x">"#,
            r#"<link rel="stylesheet" href="theme.css?v=2">"#,
            r#"<script src="app.js"></script>"#,
        );
        let out = rewrite(html, "/blog/post.html", &table(), Path::new("/nonexistent"), true);
        assert_eq!(out, html);
    }

    #[test]
    fn test_hits_keep_other_query_parameters() {
        let out = run(r#"<img src="/img/logo.png?w=200&inline#top">"#);
        assert_eq!(out, r#"<img src="/img/logo-11111111.png?w=200#top">"#);
        let out = run(r#"<link rel="stylesheet" href="/style.css?v=2&inline">"#);
        assert!(out.contains(r#"href="/style-0123abcd.css?v=2""#));
    }

    #[test]
    fn test_miss_still_coerces_source_extensions() {
        let empty = FingerprintTable::new();
        let out = rewrite(
            r#"<link rel="stylesheet" href="theme.scss?v=2"><script src="/main.ts"></script>"#,
            "/index.html",
            &empty,
            Path::new("/nonexistent"),
            false,
        );
        assert_eq!(
            out,
            r#"<link rel="stylesheet" href="theme.css?v=2"><script src="/main.js"></script>"#
        );
    }

    #[test]
    fn test_srcset() {
        let out = run(r#"<img srcset="/img/logo.png 1x, /img/logo@2x.png 2x">"#);
        assert_eq!(
            out,
            r#"<img srcset="/img/logo-11111111.png 1x,/img/logo@2x-22222222.png 2x">"#
        );
        let out = run(r#"<picture><source srcset="/img/logo.png"></picture>"#);
        assert!(out.contains(r#"<source srcset="/img/logo-11111111.png">"#));
    }

    #[test]
    fn test_preload() {
        let out = run(r#"<link rel="preload" as="style" href="/style.css">"#);
        assert!(out.contains("/style-0123abcd.css"));
        let out = run(r#"<link rel="modulepreload" href="/main.js">"#);
        assert!(out.contains("/main-89abcdef.js"));
    }

    #[test]
    fn test_comments_style_and_script_bodies_are_verbatim() {
        let html = concat!(
            r#"<!-- <img src="/img/logo.png"> -->"#,
            r#"<style>/* <img src="/img/logo.png"> */</style>"#,
            r#"<script>document.write('<img src="/img/logo.png">')</script>"#,
        );
        assert_eq!(run(html), html);
    }

    #[test]
    fn test_inline_stylesheet() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style-0123abcd.css"), "body{color:red}").unwrap();
        let out = rewrite(
            r#"<head><link rel="stylesheet" href="/style.css?inline"></head>"#,
            "/index.html",
            &table(),
            dir.path(),
            true,
        );
        assert_eq!(out, "<head><style>body{color:red}</style></head>");
    }

    #[test]
    fn test_inline_disabled_keeps_reference() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style-0123abcd.css"), "body{color:red}").unwrap();
        let out = rewrite(
            r#"<link rel="stylesheet" href="/style.css?inline">"#,
            "/index.html",
            &table(),
            dir.path(),
            false,
        );
        assert_eq!(out, r#"<link rel="stylesheet" href="/style-0123abcd.css">"#);
    }

    #[test]
    fn test_inline_missing_file_falls_back() {
        let out = run(r#"<link rel="stylesheet" href="/style.css?inline">"#);
        assert_eq!(out, r#"<link rel="stylesheet" href="/style-0123abcd.css">"#);
    }

    #[test]
    fn test_inline_script_with_import_map() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main-89abcdef.js"), "import './util.js';").unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/util.js"), "export {}").unwrap();

        let out = rewrite(
            r#"<body><script type="module" src="/main.js?inline"></script></body>"#,
            "/index.html",
            &table(),
            dir.path(),
            true,
        );

        assert!(out.starts_with(r#"<body><script type="importmap">"#));
        assert!(out.contains(r#""/lib/util.js":"/lib/util.js""#));
        assert!(out.contains(r#""/main-89abcdef.js":"/main-89abcdef.js""#));
        assert!(out.contains(r#"<script type="module">import './util.js';</script></body>"#));
        assert!(!out.contains("src="));
    }
}
