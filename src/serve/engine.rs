//! Request resolution, independent of the HTTP transport.
//!
//! Production precedence:
//! 1. a written file under `<output>/files` (fingerprinted names get an
//!    immutable cache header, others their build ETag and `304` support)
//! 2. the route table, with handlers invoked live (skipped for
//!    fingerprint-shaped paths: those only ever exist as files)
//! 3. `<output>/404.html`, then the not-found handler, then a bare `404`
//!
//! Development resolves routes live against an empty fingerprint table,
//! prefers the live not-found handler over a stale `404.html`, marks every
//! response `no-store` and injects the reload client into HTML.

use super::path;
use crate::app::Site;
use crate::fingerprint::{self, FingerprintTable, Manifest};
use crate::reload;
use crate::rewrite;
use crate::route::{Context, Handler, Method, Output, Params, Request, Response};
use crate::utils::{html, mime};
use crate::{debug, log};
use anyhow::{Context as _, Result};
use std::fs;
use std::sync::Arc;

pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";
pub const NO_STORE: &str = "no-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Development,
}

pub struct Engine {
    site: Arc<Site>,
    mode: Mode,
    manifest: Manifest,
}

impl Engine {
    /// Serve a finished build described by `manifest`.
    pub fn production(site: Arc<Site>, manifest: Manifest) -> Self {
        Self {
            site,
            mode: Mode::Production,
            manifest,
        }
    }

    /// Serve live, without a prior build.
    pub fn development(site: Arc<Site>) -> Self {
        Self {
            site,
            mode: Mode::Development,
            manifest: Manifest::default(),
        }
    }

    pub fn site(&self) -> &Arc<Site> {
        &self.site
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether `path` is the live-reload event stream.
    pub fn is_reload_stream(&self, path: &str) -> bool {
        self.mode == Mode::Development && self.site.dev.reload && path == reload::ENDPOINT
    }

    pub fn handle(&self, req: &Request) -> Response {
        let mut response = match self.mode {
            Mode::Production => self.handle_production(req),
            Mode::Development => self.handle_development(req),
        };

        if self.mode == Mode::Development {
            response.set_header("Cache-Control", NO_STORE);
            if self.site.dev.reload && response.is_html() {
                response.body = reload::inject_client(&response.body);
            }
        }
        if req.method == Method::Head {
            response.body.clear();
        }
        response
    }

    fn handle_production(&self, req: &Request) -> Response {
        if req.method.is_read() {
            match self.static_file(req) {
                Ok(Some(response)) => return response,
                Ok(None) => {}
                Err(e) => {
                    log!("error"; "{}: {:#}", req.path, e);
                    return error_response(&e);
                }
            }
            if fingerprint::is_fingerprinted(&req.path) {
                debug!("serve"; "{} looks fingerprinted but was not built", req.path);
                return self.not_found_production(req);
            }
        }

        self.routed(req)
            .unwrap_or_else(|| self.not_found_production(req))
    }

    fn handle_development(&self, req: &Request) -> Response {
        if let Some(response) = self.routed(req) {
            return response;
        }
        self.not_found_handler(req)
            .or_else(|| self.not_found_page())
            .unwrap_or_else(Response::not_found)
    }

    /// Written artifact for the request path, with caching headers.
    fn static_file(&self, req: &Request) -> Result<Option<Response>> {
        let Some(file) = path::resolve(&self.site.files_dir(), &req.path) else {
            return Ok(None);
        };

        let etag = self.manifest.etags.get(&file.url);
        if let Some(etag) = etag
            && req.header("If-None-Match").is_some_and(|v| etag_matches(v, etag))
        {
            return Ok(Some(Response::not_modified().with_header("ETag", etag)));
        }

        let bytes = fs::read(&file.path)
            .with_context(|| format!("failed to read {}", file.path.display()))?;
        let mut response = Response::ok(mime::from_url_path(&file.url), bytes);

        if fingerprint::is_fingerprinted(&file.url) {
            response.set_header("Cache-Control", IMMUTABLE);
        } else if let Some(etag) = etag {
            response.set_header("ETag", etag);
        }
        Ok(Some(response))
    }

    /// First matching route, invoked live. `None` when nothing matches.
    fn routed(&self, req: &Request) -> Option<Response> {
        let (route, params) = self.site.routes.find(&req.path)?;
        debug!("serve"; "{} {} -> `{}`", req.method, req.path, route.pattern);
        Some(self.invoke(&route.handler, req, &params, 200))
    }

    fn invoke(&self, handler: &Handler, req: &Request, params: &Params, status: u16) -> Response {
        let urls = &self.manifest.urls;
        let cx = Context::new(
            req,
            params,
            &req.path,
            &self.site.input,
            &self.site.output,
            urls,
        );

        match handler(&cx) {
            Ok(Output::Passthrough(response)) => response,
            Ok(Output::Body(bytes)) => {
                let logical = if status == 404 {
                    "/404.html".to_string()
                } else {
                    fingerprint::normalize_index(&req.path)
                };
                let content_type = mime::from_url_path(&logical);
                let bytes = if mime::is_html(content_type) {
                    self.rewrite_html(&logical, bytes, urls)
                } else {
                    bytes
                };
                Response::ok(content_type, bytes).with_status(status)
            }
            Err(e) => {
                log!("error"; "{}: {:#}", req.path, e);
                error_response(&e)
            }
        }
    }

    /// Live HTML gets the same reference rewriting as built pages; inlining
    /// needs written artifacts, so it only happens in production.
    fn rewrite_html(&self, page: &str, bytes: Vec<u8>, urls: &FingerprintTable) -> Vec<u8> {
        let inline = self.site.inline && self.mode == Mode::Production;
        match String::from_utf8(bytes) {
            Ok(text) => {
                rewrite::rewrite(&text, page, urls, &self.site.files_dir(), inline).into_bytes()
            }
            Err(e) => e.into_bytes(),
        }
    }

    fn not_found_production(&self, req: &Request) -> Response {
        self.not_found_page()
            .or_else(|| self.not_found_handler(req))
            .unwrap_or_else(Response::not_found)
    }

    /// `<output>/404.html`, if written.
    fn not_found_page(&self) -> Option<Response> {
        let bytes = fs::read(self.site.not_found_page()).ok()?;
        Some(Response::html(404, bytes))
    }

    fn not_found_handler(&self, req: &Request) -> Option<Response> {
        let handler = self.site.not_found.as_ref()?;
        Some(self.invoke(handler, req, &Params::new(), 404))
    }
}

/// `If-None-Match` is a list of tags or `*`; weak comparison.
fn etag_matches(header: &str, etag: &str) -> bool {
    let opaque = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let etag = opaque(etag);
    header
        .split(',')
        .any(|tag| tag.trim() == "*" || opaque(tag) == etag)
}

fn error_response(error: &anyhow::Error) -> Response {
    let message = format!("{error:#}");
    let body = format!(
        "<html><body><h1>Internal Server Error</h1><pre>{}</pre></body></html>",
        html::escape(&message)
    );
    Response::html(500, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::build;
    use crate::handlers;
    use crate::route::CacheSource;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        input: PathBuf,
        output: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("public");
        let output = dir.path().join("dist");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("style.css"), "body{color:red}").unwrap();
        Fixture {
            _dir: dir,
            input,
            output,
        }
    }

    fn app(fx: &Fixture) -> App {
        App::new()
            .input(&fx.input)
            .output(&fx.output)
            .workers(1)
            .file("/style.css", handlers::file())
            .route("/", |_| {
                Ok(r#"<html><head><link rel="stylesheet" href="/style.css"></head><body>home</body></html>"#)
            })
            .route_with(
                "/api/:name",
                |cx| Ok(format!("hello {}", cx.param("name").unwrap_or("?"))),
                CacheSource::paths(Vec::<String>::new()),
            )
            .not_found(|_| Ok("<html><body>missing</body></html>"))
    }

    fn production(fx: &Fixture) -> (Engine, Manifest) {
        let site = app(fx).freeze().unwrap();
        let manifest = build::build(&site, true).unwrap();
        (Engine::production(site, manifest.clone()), manifest)
    }

    #[test]
    fn test_embedded_tables_drive_production_serve() {
        let fx = fixture();
        let built = build::build(&app(&fx).freeze().unwrap(), true).unwrap();

        // the same rows the generated entry embeds as statics
        let urls: Vec<(&str, &str)> = built.urls.iter().collect();
        let etags: Vec<(&str, &str)> = built.etags.iter().collect();
        let site = app(&fx)
            .with_manifest(Manifest::from_static(&urls, &etags))
            .freeze()
            .unwrap();
        let manifest = site.manifest.clone().unwrap();
        assert_eq!(manifest, built);
        let engine = Engine::production(site, manifest);

        let css = built.urls.get("/style.css").unwrap();
        let res = engine.handle(&Request::get(css));
        assert_eq!(res.header("Cache-Control"), Some(IMMUTABLE));

        let etag = built.etags.get("/index.html").unwrap();
        let res = engine.handle(&Request::get("/").with_header("If-None-Match", etag));
        assert_eq!(res.status, 304);
    }

    #[test]
    fn test_fingerprinted_file_is_immutable() {
        let fx = fixture();
        let (engine, manifest) = production(&fx);
        let css = manifest.urls.get("/style.css").unwrap();

        let res = engine.handle(&Request::get(css));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, b"body{color:red}");
        assert_eq!(res.header("Cache-Control"), Some(IMMUTABLE));
        assert_eq!(res.content_type(), Some(mime::types::CSS));
    }

    #[test]
    fn test_page_rewritten_with_etag_and_304() {
        let fx = fixture();
        let (engine, manifest) = production(&fx);
        let css = manifest.urls.get("/style.css").unwrap();

        let res = engine.handle(&Request::get("/"));
        assert_eq!(res.status, 200);
        assert!(String::from_utf8_lossy(&res.body).contains(css));
        let etag = res.header("ETag").unwrap().to_string();
        assert_eq!(Some(etag.as_str()), manifest.etags.get("/index.html"));

        let res = engine.handle(&Request::get("/").with_header("if-none-match", &etag));
        assert_eq!(res.status, 304);
        assert!(res.body.is_empty());

        let res = engine.handle(&Request::get("/").with_header("If-None-Match", "W/\"00000000\""));
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_etag_stable_across_builds() {
        let fx = fixture();
        let (_, first) = production(&fx);
        let (_, second) = production(&fx);
        assert_eq!(first.etags.get("/index.html"), second.etags.get("/index.html"));
    }

    #[test]
    fn test_missing_path_serves_not_found_page() {
        let fx = fixture();
        let (engine, _) = production(&fx);

        let res = engine.handle(&Request::get("/missing"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body, b"<html><body>missing</body></html>");
        assert!(res.is_html());
    }

    #[test]
    fn test_not_found_handler_without_page() {
        let fx = fixture();
        let site = app(&fx).freeze().unwrap();
        let engine = Engine::production(site, Manifest::default());

        let res = engine.handle(&Request::get("/missing"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body, b"<html><body>missing</body></html>");

        let bare = App::new().output(&fx.output).freeze().unwrap();
        let res = Engine::production(bare, Manifest::default()).handle(&Request::get("/x"));
        assert_eq!(res, Response::not_found());
    }

    #[test]
    fn test_fingerprint_shaped_miss_skips_handlers() {
        let fx = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let site = App::new()
            .input(&fx.input)
            .output(&fx.output)
            .route("/**", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("dynamic")
            })
            .freeze()
            .unwrap();
        let engine = Engine::production(site, Manifest::default());

        let res = engine.handle(&Request::get("/app-0123abcd.js"));
        assert_eq!(res.status, 404);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let res = engine.handle(&Request::get("/about"));
        assert_eq!(res.body, b"dynamic");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_live_route_and_handler_error() {
        let fx = fixture();
        let (engine, _) = production(&fx);

        let res = engine.handle(&Request::get("/api/world"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, b"hello world");
        assert_eq!(res.content_type(), Some(mime::types::PLAIN));

        let site = App::new()
            .output(&fx.output)
            .route("/boom", |_| -> Result<String> { anyhow::bail!("<bad> input") })
            .freeze()
            .unwrap();
        let res = Engine::production(site, Manifest::default()).handle(&Request::get("/boom"));
        assert_eq!(res.status, 500);
        assert!(String::from_utf8_lossy(&res.body).contains("&lt;bad&gt; input"));
    }

    #[test]
    fn test_passthrough_and_head() {
        let fx = fixture();
        let site = App::new()
            .output(&fx.output)
            .route("/old", handlers::redirect::permanent("/new"))
            .route("/page", |_| Ok("<html><body>p</body></html>"))
            .freeze()
            .unwrap();
        let engine = Engine::production(site, Manifest::default());

        let res = engine.handle(&Request::get("/old"));
        assert_eq!(res.status, 308);
        assert_eq!(res.header("Location"), Some("/new"));

        let res = engine.handle(&Request::new(Method::Head, "/page"));
        assert_eq!(res.status, 200);
        assert!(res.body.is_empty());
        assert!(res.is_html());
    }

    #[test]
    fn test_development_is_live_and_uncached() {
        let fx = fixture();
        let engine = Engine::development(app(&fx).freeze().unwrap());

        let res = engine.handle(&Request::get("/"));
        assert_eq!(res.header("Cache-Control"), Some(NO_STORE));
        let body = String::from_utf8(res.body).unwrap();
        // identity resolve: nothing was built
        assert!(body.contains(r#"href="/style.css""#));
        assert!(body.contains(reload::ENDPOINT));

        let res = engine.handle(&Request::get("/style.css"));
        assert_eq!(res.body, b"body{color:red}");
        assert_eq!(res.header("Cache-Control"), Some(NO_STORE));
        assert!(!String::from_utf8_lossy(&res.body).contains(reload::ENDPOINT));

        let res = engine.handle(&Request::get("/missing"));
        assert_eq!(res.status, 404);
        assert!(String::from_utf8_lossy(&res.body).contains("missing"));

        assert!(engine.is_reload_stream(reload::ENDPOINT));
        assert!(!engine.is_reload_stream("/"));
    }

    #[test]
    fn test_etag_matching() {
        assert!(etag_matches("W/\"abc\"", "W/\"abc\""));
        assert!(etag_matches("\"x\", W/\"abc\"", "W/\"abc\""));
        assert!(etag_matches("\"abc\"", "W/\"abc\""));
        assert!(etag_matches("*", "W/\"abc\""));
        assert!(!etag_matches("W/\"abd\"", "W/\"abc\""));
    }
}
