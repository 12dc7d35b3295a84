//! Build-once orchestration.
//!
//! Build phases:
//! - **Clean** - remove and recreate the output directory
//! - **Expand** - every route's cache source, in parallel across routes
//! - **Render** - routes in fingerprint-first order; each route's jobs run on
//!   the worker pool against a snapshot of the fingerprint table
//! - **Not found** - render the not-found handler into `404.html`
//! - **Emit** - `manifest.json` and the generated server entry
//!
//! A failing artifact is logged and skipped; its siblings keep building. A
//! failing cache source aborts the build.

pub mod artifact;
pub mod entry;
pub mod pool;

pub use artifact::Reply;
pub use pool::{Job, WorkerPool};

use crate::app::Site;
use crate::fingerprint::Manifest;
use crate::logger::ProgressLine;
use crate::route::cache;
use crate::utils::plural_count;
use crate::{debug, log};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run a full build and return the resulting tables.
pub fn build(site: &Arc<Site>, quiet: bool) -> Result<Manifest> {
    build_with_stats(site, quiet).map(|(manifest, _)| manifest)
}

pub fn build_with_stats(site: &Arc<Site>, quiet: bool) -> Result<(Manifest, BuildStats)> {
    clean_output(&site.output)?;

    let expanded = cache::expand_all(&site.routes, &site.input)?;
    let pool = WorkerPool::new(site.workers)?;
    debug!("build"; "{} on {}", plural_count(site.routes.len(), "route"), plural_count(pool.size(), "worker"));

    let progress = (!quiet).then(|| {
        let count = |fingerprint: bool| -> usize {
            site.routes
                .routes()
                .iter()
                .filter(|r| r.fingerprint == fingerprint)
                .map(|r| expanded[r.index].len())
                .sum()
        };
        ProgressLine::new(&[("assets", count(true)), ("pages", count(false))])
    });

    let mut manifest = Manifest::default();
    let mut stats = BuildStats::default();

    for route in site.routes.build_order() {
        let paths = &expanded[route.index];
        if paths.is_empty() {
            continue;
        }

        // Every job of this route sees the table as it stands now.
        let urls = Arc::new(manifest.urls.clone());
        let jobs = paths
            .iter()
            .map(|pathname| Job {
                route_index: route.index,
                pathname: pathname.clone(),
                urls: Arc::clone(&urls),
            })
            .collect();

        let counter = if route.fingerprint { "assets" } else { "pages" };
        pool.run(site, jobs, |reply| {
            record(&mut manifest, &mut stats, reply);
            if let Some(p) = &progress {
                p.inc(counter);
            }
        });
    }

    if let Some(p) = progress {
        p.finish();
    }

    match artifact::write_not_found(site, &manifest.urls) {
        Ok(true) => stats.written += 1,
        Ok(false) => {}
        Err(e) => {
            stats.failed += 1;
            log!("error"; "404.html: {:#}", e);
        }
    }

    entry::save_manifest(&site.output, &manifest)?;
    entry::write_entry(&site.output, &site.entry, &manifest)?;

    if !quiet {
        log!(
            "build";
            "{} written, {} fingerprinted, {} skipped, {} failed",
            plural_count(stats.written, "file"),
            manifest.urls.len(),
            stats.skipped,
            stats.failed
        );
    }

    Ok((manifest, stats))
}

fn record(manifest: &mut Manifest, stats: &mut BuildStats, reply: Reply) {
    match reply {
        Reply::Fingerprinted { original, path } => {
            debug!("build"; "{} -> {}", original, path);
            manifest.record_fingerprint(original, path);
            stats.written += 1;
        }
        Reply::Tagged { path, etag } => {
            debug!("build"; "{} {}", path, etag);
            manifest.record_etag(path, etag);
            stats.written += 1;
        }
        Reply::Passthrough { pathname } => {
            debug!("build"; "{} returned a response, skipped", pathname);
            stats.skipped += 1;
        }
        Reply::Unmatched { pathname } => {
            debug!("build"; "{} does not match its route, skipped", pathname);
            stats.skipped += 1;
        }
        Reply::Failed { pathname, error } => {
            log!("error"; "{}: {}", pathname, error);
            stats.failed += 1;
        }
    }
}

/// Remove and recreate `<output>` and `<output>/files`.
fn clean_output(output: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clear {}", output.display()))?;
    }
    let files = output.join("files");
    fs::create_dir_all(&files).with_context(|| format!("failed to create {}", files.display()))?;
    Ok(())
}
