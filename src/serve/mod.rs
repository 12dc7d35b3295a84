//! HTTP serving for `hallmark serve` and `hallmark dev`.
//!
//! [`Engine`] answers transport-neutral requests; this module binds
//! `tiny_http`, runs the request loop on a small thread pool and hands
//! live-reload streams their own threads (they block until the client leaves).

mod engine;
mod lifecycle;
mod path;
mod transport;

pub use engine::{Engine, IMMUTABLE, Mode, NO_STORE};
pub use lifecycle::bind_with_retry;

use crate::app::Site;
use crate::fingerprint::Manifest;
use crate::utils::url;
use crate::{core, debug, log, reload};
use anyhow::{Context, Result};
use std::sync::Arc;
use tiny_http::Request;

/// Request handler threads.
const POOL_SIZE: usize = 4;

/// Serve a finished build.
pub fn production(site: Arc<Site>, manifest: Manifest) -> Result<()> {
    debug!("serve"; "{} fingerprinted, {} etagged", manifest.urls.len(), manifest.etags.len());
    run(Engine::production(site, manifest))
}

/// Serve live with reload notifications.
pub fn dev(site: Arc<Site>) -> Result<()> {
    log!("dev"; "serving {} live", site.input.display());
    run(Engine::development(site))
}

/// Bind and run the request loop until shutdown (blocking).
pub fn run(engine: Engine) -> Result<()> {
    let site = Arc::clone(engine.site());
    let (server, addr) = bind_with_retry(site.serve.addr())?;
    let server = Arc::new(server);
    core::register_server(Arc::clone(&server));
    log!("serve"; "http://{}", addr);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(POOL_SIZE)
        .thread_name(|i| format!("hallmark-serve-{i}"))
        .build()
        .context("failed to create request thread pool")?;
    let engine = Arc::new(engine);

    for request in server.incoming_requests() {
        if core::is_shutdown() {
            break;
        }

        let (path, _) = url::split_query(request.url());
        if engine.is_reload_stream(path) {
            spawn_stream(request, Arc::clone(&site));
            continue;
        }

        let engine = Arc::clone(&engine);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &engine) {
                log!("serve"; "request error: {e}");
            }
        });
    }

    Ok(())
}

fn handle_request(request: Request, engine: &Engine) -> Result<()> {
    if core::is_shutdown() {
        return transport::respond(
            request,
            crate::route::Response::text(503, "Service Unavailable"),
        );
    }

    let req = transport::to_request(&request);
    let response = engine.handle(&req);
    debug!("serve"; "{} {} {}", req.method, req.path, response.status);
    transport::respond(request, response)
}

fn spawn_stream(request: Request, site: Arc<Site>) {
    let spawned = std::thread::Builder::new()
        .name("hallmark-reload".into())
        .spawn(move || {
            if let Err(e) = reload::stream(request, &site) {
                debug!("reload"; "stream closed: {e:#}");
            }
        });
    if let Err(e) = spawned {
        log!("error"; "failed to start reload stream: {e}");
    }
}
