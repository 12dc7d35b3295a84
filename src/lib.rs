//! Hallmark - a content-addressed static site build and serve engine.
//!
//! Routes are registered in order on an [`App`]. `hallmark build` pre-renders
//! every cached path, fingerprints assets (`/style.css` → `/style-1a2b3c4d.css`),
//! rewrites HTML references to the fingerprinted names and emits a
//! `manifest.json` plus a generated server entry. `hallmark serve` answers
//! from those artifacts; `hallmark dev` runs every handler live and reloads
//! connected browsers on change.
//!
//! ```ignore
//! use hallmark::{App, handlers};
//!
//! fn main() -> anyhow::Result<()> {
//!     App::new()
//!         .file("/style.css", handlers::file())
//!         .route("/", |cx| Ok(format!("<link rel=stylesheet href={}>", cx.resolve("/style.css"))))
//!         .run()
//! }
//! ```
//!
//! # Module Structure
//!
//! ```text
//! route/        # patterns, route table, cache sources, request/response
//! fingerprint   # content tokens, fingerprint and ETag tables
//! rewrite/      # HTML reference rewriting and inlining
//! build/        # orchestrator, worker pool, generated entry
//! serve/        # serve engine and HTTP transport
//! reload/       # live-reload event stream
//! handlers/     # stock handlers (file, command, redirect, json, method)
//! config/       # hallmark.toml
//! ```

pub mod app;
pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod fingerprint;
pub mod handlers;
pub mod logger;
pub mod reload;
pub mod rewrite;
pub mod route;
pub mod serve;
pub mod utils;

pub use app::{App, Site};
pub use config::{ConfigError, SiteConfig};
pub use fingerprint::{ETagTable, FingerprintTable, Manifest};
pub use route::{
    CacheSource, Context, Handler, Method, Output, Params, PathPattern, PatternError, Request,
    Response, handler,
};
