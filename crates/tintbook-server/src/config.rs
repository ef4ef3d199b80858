//! Server configuration from the environment.

use std::net::SocketAddr;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:3040";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3040)),
        }
    }
}

impl ServerConfig {
    /// Read `TINTBOOK_BIND`, falling back to [`DEFAULT_BIND`].
    pub fn from_env() -> Self {
        Self::from_bind(std::env::var("TINTBOOK_BIND").ok().as_deref())
    }

    fn from_bind(bind: Option<&str>) -> Self {
        match bind.map(str::parse::<SocketAddr>) {
            Some(Ok(bind)) => Self { bind },
            Some(Err(e)) => {
                tracing::warn!("Ignoring invalid TINTBOOK_BIND ({}), using {}", e, DEFAULT_BIND);
                Self::default()
            }
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_override() {
        assert_eq!(ServerConfig::from_bind(None).bind.port(), 3040);
        assert_eq!(ServerConfig::from_bind(Some("127.0.0.1:8080")).bind.port(), 8080);
        assert_eq!(ServerConfig::from_bind(Some("nowhere")), ServerConfig::default());
    }
}
