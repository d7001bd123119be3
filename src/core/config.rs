//! Configuration for a single connection

use crate::core::error::{RespError, RespResult};
use std::time::Duration;

/// Configuration for a connection to a Redis server
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Enable TCP keepalive
    pub tcp_keepalive: Option<Duration>,

    /// Protocol version requested in the `HELLO` handshake
    pub protocol_version: u8,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            connect_timeout: Duration::from_secs(5),
            tcp_keepalive: Some(Duration::from_secs(60)),
            protocol_version: 3,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Parse a configuration from a `redis://host:port` URL
    ///
    /// The scheme prefix is optional and the port defaults to 6379.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or carries an invalid port.
    pub fn from_url(url: &str) -> RespResult<Self> {
        let addr = url.trim();
        let addr = addr.strip_prefix("redis://").unwrap_or(addr);

        if addr.is_empty() {
            return Err(RespError::Config("empty endpoint".to_string()));
        }

        if let Some((host, port_str)) = addr.rsplit_once(':') {
            let port = port_str
                .parse::<u16>()
                .map_err(|e| RespError::Config(format!("invalid port '{}': {}", port_str, e)))?;
            return Ok(Self::new(host, port));
        }

        Ok(Self::new(addr, 6379))
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the TCP keepalive interval
    #[must_use]
    pub const fn with_tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }

    /// Set the protocol version requested during the handshake
    #[must_use]
    pub const fn with_protocol_version(mut self, version: u8) -> Self {
        self.protocol_version = version;
        self
    }

    /// The `host:port` address string
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let config = ConnectionConfig::default();
        assert_eq!(config.addr(), "127.0.0.1:6379");
        assert_eq!(config.protocol_version, 3);
    }

    #[test]
    fn test_from_url() {
        let config = ConnectionConfig::from_url("redis://example.com:6380").unwrap();
        assert_eq!(config.host, "example.com");
        assert_eq!(config.port, 6380);
    }

    #[test]
    fn test_from_url_default_port() {
        let config = ConnectionConfig::from_url("localhost").unwrap();
        assert_eq!(config.addr(), "localhost:6379");
    }

    #[test]
    fn test_from_url_rejects_bad_port() {
        assert!(ConnectionConfig::from_url("redis://localhost:not-a-port").is_err());
        assert!(ConnectionConfig::from_url("").is_err());
    }
}
