//! `[serve]` section: where `dev` and `serve` listen.
//!
//! ```toml
//! [serve]
//! interface = "0.0.0.0"   # LAN-visible; default is loopback only
//! port = 8080             # later ports are tried when this one is taken
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    /// First port tried. `0` lets the OS pick.
    pub port: u16,
}

impl ServeConfig {
    pub const DEFAULT_PORT: u16 = 3000;

    /// Address of the first bind attempt.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: Self::DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::net::Ipv6Addr;

    #[test]
    fn test_defaults_are_loopback() {
        let serve = test_parse_config("").serve;
        assert_eq!(serve.addr(), "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn test_lan_interface_and_port() {
        let serve = test_parse_config("[serve]\ninterface = \"0.0.0.0\"\nport = 8080").serve;
        assert_eq!(serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(serve.addr().port(), 8080);
    }

    #[test]
    fn test_ipv6_interface() {
        let serve = test_parse_config("[serve]\ninterface = \"::1\"").serve;
        assert_eq!(serve.interface, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }
}
