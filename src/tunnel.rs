//! SSH tunnel awareness
//!
//! The tunnel process itself is externally managed; only its local TCP
//! listener is ever probed. A loopback DSN with a parseable port is taken to
//! mean the session goes through a local tunnel on that port.

use tokio::net::TcpStream;

use crate::dsn::DsnParser;

/// Immutable tunnel facts, computed once at construction from the DSN.
///
/// The DSN does not change over a session's lifetime, so this is never
/// recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelState {
    local_port: Option<u16>,
}

impl TunnelState {
    /// Derive tunnel state from a DSN.
    ///
    /// Non-loopback hosts, missing ports and a literal `port=0` all mean
    /// "not tunneled".
    pub fn from_dsn(dsn: &str) -> Self {
        let parsed = DsnParser::new(dsn);
        if !parsed.is_local() {
            return Self { local_port: None };
        }

        Self {
            local_port: parsed.parse_port().filter(|port| *port != 0),
        }
    }

    /// Whether the session is believed to go through a local tunnel
    #[inline]
    pub fn is_tunneled(&self) -> bool {
        self.local_port.is_some()
    }

    /// The tunnel's local port, when tunneled
    #[inline]
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// Probe the local tunnel listener.
    ///
    /// Opens a TCP connection to `127.0.0.1:{port}`, drops it immediately and
    /// reports whether the listener accepted. No socket is held between
    /// probes. Always `false` when not tunneled.
    pub async fn is_open(&self) -> bool {
        match self.local_port {
            Some(port) => TcpStream::connect(("127.0.0.1", port)).await.is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunneled_from_local_dsn_with_port() {
        let state = TunnelState::from_dsn("mysql:host=127.0.0.1;port=33006;dbname=testdb");
        assert!(state.is_tunneled());
        assert_eq!(state.local_port(), Some(33006));
    }

    #[test]
    fn test_not_tunneled_for_remote_host() {
        let state = TunnelState::from_dsn("mysql:host=example.com;port=3306;dbname=testdb");
        assert!(!state.is_tunneled());
        assert_eq!(state.local_port(), None);
    }

    #[test]
    fn test_not_tunneled_without_port() {
        let state = TunnelState::from_dsn("mysql:host=localhost;dbname=testdb");
        assert!(!state.is_tunneled());
    }

    #[test]
    fn test_port_zero_means_not_tunneled() {
        let state = TunnelState::from_dsn("mysql:host=localhost;port=0;dbname=testdb");
        assert!(!state.is_tunneled());
    }

    #[tokio::test]
    async fn test_probe_without_tunnel_is_false() {
        let state = TunnelState::from_dsn("mysql:host=example.com;port=3306");
        assert!(!state.is_open().await);
    }
}
