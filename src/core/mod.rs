//! Process-wide state shared by the CLI and the servers.

mod state;

pub use state::{is_shutdown, register_server, request_shutdown, setup_shutdown_handler};
