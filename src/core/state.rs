//! Shutdown state for serve mode.
//!
//! Ctrl+C sets `SHUTDOWN` and unblocks the registered HTTP server so the
//! request loop returns. Live-reload streams poll the flag between events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// - Before `register_server()`: exit immediately (a build in progress)
/// - After `register_server()`: graceful shutdown
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    let installed = ctrlc::set_handler(|| {
        if SERVER.get().is_some() {
            crate::log!("serve"; "shutting down...");
            request_shutdown();
        } else {
            std::process::exit(130);
        }
    });

    match installed {
        Ok(()) => Ok(()),
        // Installed by an earlier call (e.g. several `App::run_with` in one process)
        Err(ctrlc::Error::MultipleHandlers) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to set Ctrl+C handler: {}", e)),
    }
}

/// Register the HTTP server for graceful shutdown.
///
/// Call this after binding the server, before entering the request loop.
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

/// Set the flag and unblock the server's request loop.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    if let Some(server) = SERVER.get() {
        server.unblock();
    }
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
