//! Liveness probes for development servers.

use crate::config::NetworkConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Answers whether an endpoint is up. Implementations must return within a
/// bounded time; an unreachable endpoint is `false`, never an error.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self) -> bool;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}

/// Probe that succeeds when a TCP connection to `host:port` opens in time.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: NetworkConfig::PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    async fn is_alive(&self) -> bool {
        let address = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe {} refused: {}", self.target(), e);
                false
            }
            Err(_) => {
                debug!("Probe {} timed out after {:?}", self.target(), self.timeout);
                false
            }
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
