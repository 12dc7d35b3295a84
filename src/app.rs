//! Application builder and the frozen site it produces.
//!
//! ```ignore
//! use hallmark::{App, handlers};
//!
//! fn main() -> anyhow::Result<()> {
//!     App::new()
//!         .file("/style.css", handlers::file())
//!         .file("/main.js", handlers::command(["esbuild", "--bundle", "{path}"]))
//!         .route("/", |cx| Ok(format!(r#"<link rel="stylesheet" href="/style.css">"#)))
//!         .not_found(|_| Ok("<h1>Not Found</h1>"))
//!         .run()
//! }
//! ```
//!
//! Registration is append-only; [`App::freeze`] compiles every pattern,
//! reports all invalid ones at once, and yields the immutable [`Site`] that
//! the build orchestrator and the serve engine share.

use crate::build;
use crate::cli::{Cli, Commands};
use crate::config::{
    CacheConfig, ConfigDiagnostics, ConfigError, DevConfig, FieldPath, ServeConfig, SiteConfig,
};
use crate::fingerprint::Manifest;
use crate::handlers::HandlerConfig;
use crate::route::{
    CacheSource, Context, Handler, Output, PathPattern, RouteTable, handler as wrap,
};
use crate::{core, log, serve};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Site
// ============================================================================

/// Frozen route configuration plus the settings every stage reads.
pub struct Site {
    /// Project root; the dev watcher observes it.
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub routes: RouteTable,
    pub not_found: Option<Handler>,
    pub workers: usize,
    pub inline: bool,
    /// File name of the generated server entry.
    pub entry: String,
    /// Tables embedded by a generated entry, if any.
    pub manifest: Option<Manifest>,
    pub serve: ServeConfig,
    pub dev: DevConfig,
}

impl Site {
    /// `<output>/files`, where artifacts are written.
    pub fn files_dir(&self) -> PathBuf {
        self.output.join("files")
    }

    /// `<output>/404.html`.
    pub fn not_found_page(&self) -> PathBuf {
        self.output.join("404.html")
    }
}

// ============================================================================
// App
// ============================================================================

/// Which paths a route is pre-built for when nothing explicit was given.
enum CacheChoice {
    /// The pattern itself when it is a literal path.
    Literal,
    /// The literal path, otherwise every matching input file.
    LiteralOrGlob,
    Source(CacheSource),
    Never,
}

struct PendingRoute {
    pattern: String,
    fingerprint: bool,
    handler: Handler,
    cache: CacheChoice,
}

pub struct App {
    config: SiteConfig,
    /// Loaded from a file: CLI overrides were already applied.
    configured: bool,
    routes: Vec<PendingRoute>,
    not_found: Option<Handler>,
    manifest: Option<Manifest>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Empty app on default settings (`public` → `dist`).
    pub fn new() -> Self {
        Self {
            config: SiteConfig::default(),
            configured: false,
            routes: Vec::new(),
            not_found: None,
            manifest: None,
        }
    }

    /// App with the settings, routes and not-found handler of a loaded config.
    pub fn from_config(config: SiteConfig) -> Self {
        let mut app = Self::new();
        for route in config.routes.clone() {
            let cache = match route.cache {
                CacheConfig::Default(false) => CacheChoice::Never,
                CacheConfig::Default(true) if matches!(route.handler, HandlerConfig::File { .. }) => {
                    CacheChoice::LiteralOrGlob
                }
                CacheConfig::Default(true) => CacheChoice::Literal,
                CacheConfig::Paths(paths) => CacheChoice::Source(CacheSource::Paths(paths)),
            };
            app.push(
                route.pattern,
                route.fingerprint,
                route.handler.into_handler(&config.root),
                cache,
            );
        }
        app.not_found = config
            .not_found
            .clone()
            .map(|h| h.into_handler(&config.root));
        app.config = config;
        app.configured = true;
        app
    }

    pub fn input(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.build.input = dir.as_ref().to_path_buf();
        self
    }

    pub fn output(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.build.output = dir.as_ref().to_path_buf();
        self
    }

    /// Build workers; `0` uses the available parallelism, `1` builds serially.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.build.workers = workers;
        self
    }

    /// Allow or forbid `?inline` asset inlining.
    pub fn inline(mut self, inline: bool) -> Self {
        self.config.build.inline = inline;
        self
    }

    // ------------------------------------------------------------------------
    // routes
    // ------------------------------------------------------------------------

    /// Non-fingerprinting route, pre-built when `pattern` is a literal path.
    pub fn route<F, O>(self, pattern: &str, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
        O: Into<Output>,
    {
        self.route_handler(pattern, wrap(f))
    }

    pub fn route_handler(mut self, pattern: &str, handler: Handler) -> Self {
        self.push(pattern.to_string(), false, handler, CacheChoice::Literal);
        self
    }

    /// Non-fingerprinting route pre-built for the paths `cache` yields.
    pub fn route_with<F, O>(mut self, pattern: &str, f: F, cache: CacheSource) -> Self
    where
        F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
        O: Into<Output>,
    {
        self.push(pattern.to_string(), false, wrap(f), CacheChoice::Source(cache));
        self
    }

    /// Fingerprinting route, pre-built for its literal path or, for
    /// patterns, every matching file under the input root.
    pub fn file<F, O>(self, pattern: &str, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
        O: Into<Output>,
    {
        self.file_handler(pattern, wrap(f))
    }

    pub fn file_handler(mut self, pattern: &str, handler: Handler) -> Self {
        self.push(pattern.to_string(), true, handler, CacheChoice::LiteralOrGlob);
        self
    }

    pub fn file_with<F, O>(mut self, pattern: &str, f: F, cache: CacheSource) -> Self
    where
        F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
        O: Into<Output>,
    {
        self.push(pattern.to_string(), true, wrap(f), CacheChoice::Source(cache));
        self
    }

    /// Rendered into `404.html` at build time and for misses when serving.
    pub fn not_found<F, O>(self, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
        O: Into<Output>,
    {
        self.not_found_handler(wrap(f))
    }

    pub fn not_found_handler(mut self, handler: Handler) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Tables from a generated server entry; `serve` then skips `manifest.json`.
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    fn push(&mut self, pattern: String, fingerprint: bool, handler: Handler, cache: CacheChoice) {
        self.routes.push(PendingRoute {
            pattern,
            fingerprint,
            handler,
            cache,
        });
    }

    // ------------------------------------------------------------------------
    // freeze / run
    // ------------------------------------------------------------------------

    /// Compile the route table. Every invalid pattern is reported.
    pub fn freeze(self) -> Result<Arc<Site>, ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        let mut routes = RouteTable::new();

        for (i, route) in self.routes.into_iter().enumerate() {
            let pattern = match PathPattern::parse(&route.pattern) {
                Ok(pattern) => pattern,
                Err(e) => {
                    diag.pattern(FieldPath::indexed("routes", i, "pattern"), &e);
                    continue;
                }
            };
            let cache = match route.cache {
                CacheChoice::Source(source) => Some(source),
                CacheChoice::Never => None,
                CacheChoice::Literal => pattern.literal().map(|p| CacheSource::paths([p])),
                CacheChoice::LiteralOrGlob => Some(
                    pattern
                        .literal()
                        .map_or(CacheSource::Glob, |p| CacheSource::paths([p])),
                ),
            };
            routes.push(pattern, route.fingerprint, route.handler, cache);
        }
        diag.into_result().map_err(ConfigError::Diagnostics)?;

        let SiteConfig {
            root,
            build,
            serve,
            dev,
            ..
        } = self.config;

        Ok(Arc::new(Site {
            root,
            input: build.input,
            output: build.output,
            routes,
            not_found: self.not_found,
            workers: build.workers,
            inline: build.inline,
            entry: build.entry,
            manifest: self.manifest,
            serve,
            dev,
        }))
    }

    /// Parse the process arguments and run the selected command.
    pub fn run(self) -> Result<()> {
        let cli = Cli::parse();
        self.run_with(&cli)
    }

    pub fn run_with(mut self, cli: &Cli) -> Result<()> {
        cli.apply_color();
        core::setup_shutdown_handler()?;

        if !self.configured {
            self.config.apply_cli(cli);
        }
        let site = self.freeze()?;

        match &cli.command {
            Commands::Build { .. } => build::build(&site, false).map(|_| ()),
            Commands::Dev(_) => serve::dev(site),
            Commands::Serve(_) => serve_production(site),
        }
    }

    /// Production serve without parsing arguments, on the configured address.
    ///
    /// This is what the generated `serve.rs` entry calls after attaching its
    /// embedded tables through [`App::with_manifest`].
    pub fn serve(self) -> Result<()> {
        core::setup_shutdown_handler()?;
        serve_production(self.freeze()?)
    }
}

/// Serve `site` with its attached manifest, or the one in `<output>`.
fn serve_production(site: Arc<Site>) -> Result<()> {
    let manifest = match &site.manifest {
        Some(manifest) => manifest.clone(),
        None => build::entry::load_manifest(&site.output)?,
    };
    if manifest.is_empty() {
        log!("serve"; "manifest is empty, every request runs a handler");
    }
    serve::production(site, manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_freeze_reports_every_bad_pattern() {
        let result = App::new()
            .route("no-slash", |_| Ok("a"))
            .route("/ok", |_| Ok("b"))
            .file("/(x|y)", |_| Ok("c"))
            .freeze();
        let Err(ConfigError::Diagnostics(diag)) = result else {
            panic!("expected diagnostics");
        };
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_default_cache_sources() {
        let site = App::new()
            .route("/", |_| Ok("home"))
            .route("/blog/:slug", |_| Ok("post"))
            .file("/style.css", |_| Ok("css"))
            .file("/img/*.png", |_| Ok("png"))
            .freeze()
            .unwrap();

        let caches: Vec<_> = site
            .routes
            .routes()
            .iter()
            .map(|r| format!("{:?}", r.cache))
            .collect();
        assert_eq!(
            caches,
            [
                r#"Some(Paths(["/"]))"#,
                "None",
                r#"Some(Paths(["/style.css"]))"#,
                "Some(Glob)",
            ]
        );
        assert!(site.routes.get(2).unwrap().fingerprint);
        assert!(!site.routes.get(0).unwrap().fingerprint);
    }

    #[test]
    fn test_from_config_routes() {
        let mut config = test_parse_config(
            r#"
[build]
workers = 1

[[routes]]
pattern = "/assets/**"
fingerprint = true

[[routes]]
pattern = "/old"
handler = { kind = "redirect", location = "/new" }

[[routes]]
pattern = "/feed/:name"
handler = { kind = "command", command = ["cat"] }
cache = ["/feed/a"]

[not_found]
kind = "file"
"#,
        );
        config.root = PathBuf::from("/project");

        let site = App::from_config(config).freeze().unwrap();
        let routes = site.routes.routes();
        assert_eq!(routes.len(), 3);
        assert!(routes[0].fingerprint);
        assert!(matches!(routes[0].cache, Some(CacheSource::Glob)));
        assert!(matches!(&routes[1].cache, Some(CacheSource::Paths(p)) if p == &["/old"]));
        assert!(matches!(&routes[2].cache, Some(CacheSource::Paths(p)) if p == &["/feed/a"]));
        assert!(site.not_found.is_some());
        assert_eq!(site.workers, 1);
    }

    #[test]
    fn test_files_dir() {
        let site = App::new().output("/tmp/out").freeze().unwrap();
        assert_eq!(site.files_dir(), PathBuf::from("/tmp/out/files"));
        assert_eq!(site.not_found_page(), PathBuf::from("/tmp/out/404.html"));
    }
}
