//! Live reload for `hallmark dev`.
//!
//! HTML responses get a small client that opens an `EventSource` on
//! [`ENDPOINT`]. Each connection owns a `notify` watcher on the project
//! root; accepted changes are debounced and sent as one `message` event, and
//! the watcher is dropped as soon as a write to the client fails.
//!
//! ```text
//! notify → EventFilter → Debouncer → "data: \"change\"" → location.reload()
//! ```

mod debouncer;
mod filter;

pub use debouncer::Debouncer;
pub use filter::EventFilter;

use crate::app::Site;
use crate::{core, debug};
use anyhow::{Context, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use notify::{EventKind, RecursiveMode, Watcher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Change-notification stream path.
pub const ENDPOINT: &str = "/_watch";

/// Comment lines sent this often; a failed write means the client left.
const KEEPALIVE: Duration = Duration::from_secs(15);

/// Longest wait between shutdown checks.
const TICK: Duration = Duration::from_millis(250);

const CLIENT: &str = r#"<script type="module">
new EventSource("/_watch").addEventListener("message", () => location.reload());
</script>"#;

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_client(content: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";
    let script = CLIENT.as_bytes();

    let mut result = Vec::with_capacity(content.len() + script.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script);
        }
    }
    result
}

/// Serve one event stream until the client disconnects or shutdown.
pub fn stream(request: tiny_http::Request, site: &Site) -> Result<()> {
    let root = absolute_root(&site.root)?;
    let output = std::path::absolute(&site.output).unwrap_or_else(|_| root.join(&site.output));
    let filter = EventFilter::new(root.clone(), output, site.dev.ignore_patterns());

    let (tx, rx) = channel::unbounded();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;

    let mut writer = request.into_writer();
    writer.write_all(
        b"HTTP/1.1 200 OK\r\n\
          Content-Type: text/event-stream\r\n\
          Cache-Control: no-store\r\n\
          Connection: keep-alive\r\n\r\n",
    )?;
    writer.flush()?;
    debug!("reload"; "client connected, watching {}", root.display());

    let mut debouncer = Debouncer::new(Duration::from_millis(site.dev.debounce_ms));
    let mut last_write = Instant::now();

    while !core::is_shutdown() {
        let wait = debouncer.sleep_duration(Instant::now()).min(TICK);
        match rx.recv_timeout(wait) {
            Ok(event) if is_change(&event.kind) => {
                let now = Instant::now();
                for path in event.paths.iter().filter(|p| filter.accepts(p)) {
                    debouncer.add(path, now);
                }
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if let Some(changes) = debouncer.take_if_ready(now) {
            debug!("reload"; "{} changed", crate::utils::plural_count(changes.len(), "file"));
            writer.write_all(b"data: \"change\"\n\n")?;
            writer.flush()?;
            last_write = now;
        } else if now.duration_since(last_write) >= KEEPALIVE {
            writer.write_all(b": keepalive\n\n")?;
            writer.flush()?;
            last_write = now;
        }
    }

    Ok(())
}

/// Metadata-only and access events are noise.
fn is_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

/// The project root; the working directory when the app has no config file.
fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.as_os_str().is_empty() {
        return std::env::current_dir().context("Failed to get current working directory");
    }
    std::path::absolute(root).with_context(|| format!("invalid root {}", root.display()))
}
