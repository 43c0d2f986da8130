//! Listener address resolution.
//!
//! # Responsibilities
//! - Turn the configured `host:port` into a concrete socket address
//! - Report unresolvable hosts as bind errors
//!
//! Accepting connections is left to axum-server; see [`crate::lifecycle`].

use std::net::SocketAddr;

use crate::config::ListenerConfig;

/// Resolve the listener's bind address. The first resolved address wins.
pub async fn resolve_bind_address(config: &ListenerConfig) -> Result<SocketAddr, std::io::Error> {
    let address = config.bind_address();
    let mut resolved = tokio::net::lookup_host(&address).await?;
    resolved.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve to any address", address),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_ip_literal() {
        let config = ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        };
        let addr = resolve_bind_address(&config).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 0);
    }

    #[tokio::test]
    async fn resolves_localhost() {
        let config = ListenerConfig {
            host: "localhost".into(),
            port: 9000,
            ..Default::default()
        };
        let addr = resolve_bind_address(&config).await.unwrap();
        assert_eq!(addr.port(), 9000);
    }
}
