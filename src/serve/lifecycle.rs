//! Listener setup.

use crate::log;
use anyhow::{Result, anyhow};
use std::net::SocketAddr;
use tiny_http::Server;

/// Ports tried, starting from the configured one.
const PORT_ATTEMPTS: u16 = 10;

/// Bind `addr`, walking up to the next free port when it is taken.
///
/// Returns the address actually bound; with port `0` that is the one the OS
/// picked.
pub fn bind_with_retry(addr: SocketAddr) -> Result<(Server, SocketAddr)> {
    let candidates = (0..PORT_ATTEMPTS)
        .map_while(|offset| addr.port().checked_add(offset))
        .map(|port| SocketAddr::new(addr.ip(), port));

    let mut last_error = None;
    for candidate in candidates {
        let server = match Server::http(candidate) {
            Ok(server) => server,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };
        if candidate.port() != addr.port() {
            log!("serve"; "port {} is taken, listening on {}", addr.port(), candidate.port());
        }
        let bound = server.server_addr().to_ip().unwrap_or(candidate);
        return Ok((server, bound));
    }

    let reason = last_error.map_or_else(|| "no ports left".to_string(), |e| e.to_string());
    Err(anyhow!("cannot listen on {addr} or the {} ports after it: {reason}", PORT_ATTEMPTS - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taken_port_moves_up() {
        let (held, addr) = bind_with_retry("127.0.0.1:0".parse().unwrap()).unwrap();
        let (_next, moved) = bind_with_retry(addr).unwrap();
        assert_ne!(addr.port(), moved.port());
        drop(held);
    }
}
