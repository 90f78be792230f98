//! Reachability probes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::ConnectivityStatus;

/// Default host probed for reachability.
pub const DEFAULT_PROBE_HOST: &str = "api.unsplash.com:443";

/// Default time allowed for a probe to complete.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Samples the raw network state once.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns the current raw status. Platform failures report
    /// [`ConnectivityStatus::Disconnected`].
    async fn probe(&self) -> ConnectivityStatus;
}

/// Probes reachability by opening a TCP connection to a host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    timeout: Duration,
}

impl TcpProbe {
    #[must_use]
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self { host: host.into(), timeout }
    }

    #[must_use]
    pub fn host(&self) -> &str { &self.host }
}

impl Default for TcpProbe {
    fn default() -> Self { Self::new(DEFAULT_PROBE_HOST, DEFAULT_PROBE_TIMEOUT) }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> ConnectivityStatus {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.host.as_str())).await {
            Ok(Ok(_)) => ConnectivityStatus::Connected,
            Ok(Err(err)) => {
                tracing::trace!(host = %self.host, error = %err, "connectivity: probe failed");
                ConnectivityStatus::Disconnected
            }
            Err(_) => {
                tracing::trace!(host = %self.host, "connectivity: probe timed out");
                ConnectivityStatus::Disconnected
            }
        }
    }
}
