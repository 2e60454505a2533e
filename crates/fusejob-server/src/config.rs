//! Server configuration.

use std::net::SocketAddr;

use fusejob_config::FusejobConfig;

use crate::error::{Result, ServerError};

/// Room for the envelope and option fields around the two inputs.
const ENVELOPE_OVERHEAD: usize = 64 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Maximum request body size in bytes. Requests exceeding this limit
    /// are rejected before parsing.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_body_size: body_limit(fusejob_config::LimitsConfig::default().max_inline_bytes),
        }
    }
}

impl ServerConfig {
    /// Derive from the harness config: `[server] bind` and `[limits]`.
    pub fn from_config(config: &FusejobConfig) -> Result<Self> {
        let bind = config.server().bind;
        let bind_address = bind
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{}': {}", bind, e)))?;

        Ok(Self {
            bind_address,
            max_body_size: body_limit(config.limits().max_inline_bytes),
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the maximum body size.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

/// Two inline inputs at the limit, plus the envelope.
fn body_limit(max_inline_bytes: usize) -> usize {
    max_inline_bytes
        .saturating_mul(2)
        .saturating_add(ENVELOPE_OVERHEAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusejob_config::{LimitsConfig, ServerSection};

    #[test]
    fn test_from_config() {
        let config = FusejobConfig {
            server: Some(ServerSection {
                bind: "127.0.0.1:9000".into(),
            }),
            limits: Some(LimitsConfig {
                max_inline_bytes: 1000,
                ..LimitsConfig::default()
            }),
            ..FusejobConfig::default()
        };

        let server = ServerConfig::from_config(&config).unwrap();
        assert_eq!(server.bind_address.port(), 9000);
        assert_eq!(server.max_body_size, 2000 + ENVELOPE_OVERHEAD);
    }

    #[test]
    fn test_bad_bind_address() {
        let config = FusejobConfig {
            server: Some(ServerSection {
                bind: "not-an-address".into(),
            }),
            ..FusejobConfig::default()
        };
        let err = ServerConfig::from_config(&config).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::default()
            .with_bind_address("127.0.0.1:1234".parse().unwrap())
            .with_max_body_size(10);
        assert_eq!(config.bind_address.port(), 1234);
        assert_eq!(config.max_body_size, 10);
    }
}
