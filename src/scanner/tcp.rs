//! TCP connect prober.
//!
//! Performs a plain connect() per port using the operating system's socket
//! API. No elevated privileges are required.

use crate::banner::grab_banner;
use crate::error::{ScanError, ScanResult};
use crate::scanner::traits::{PortState, Prober};
use crate::types::Port;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Probes ports on one address with TCP connect.
///
/// Each call owns its own socket; nothing is shared between probes.
#[derive(Debug, Clone)]
pub struct TcpProber {
    target: IpAddr,
    timeout: Duration,
}

impl TcpProber {
    /// Create a prober for `target` with a per-operation `timeout`.
    pub fn new(target: IpAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// Get the target IP address.
    pub fn target(&self) -> IpAddr {
        self.target
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(&self, addr: SocketAddr) -> ScanResult<TcpStream> {
        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(match e.kind() {
                ErrorKind::ConnectionRefused => ScanError::ConnectionRefused,
                ErrorKind::TimedOut => ScanError::Timeout,
                ErrorKind::HostUnreachable => ScanError::HostUnreachable,
                ErrorKind::NetworkUnreachable => ScanError::NetworkUnreachable(e.to_string()),
                _ => ScanError::ConnectionFailed {
                    port: addr.port(),
                    reason: e.to_string(),
                },
            }),
            Err(_) => Err(ScanError::Timeout),
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, port: Port) -> PortState {
        let addr = SocketAddr::new(self.target, port.as_u16());

        match self.attempt_connect(addr).await {
            Ok(mut stream) => {
                // The banner is read over a fresh connection, so release this one now.
                let _ = stream.shutdown().await;
                PortState::Open
            }
            Err(e) => {
                trace!(%port, error = %e, "probe failed");
                state_for_error(e)
            }
        }
    }

    async fn grab_banner(&self, port: Port) -> Option<String> {
        grab_banner(SocketAddr::new(self.target, port.as_u16()), self.timeout).await
    }
}

/// Fold a connect failure into the port's state.
fn state_for_error(error: ScanError) -> PortState {
    match error {
        ScanError::ConnectionRefused | ScanError::Timeout => PortState::Closed,
        other => PortState::Errored(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[test]
    fn test_prober_creation() {
        let prober = TcpProber::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(1));
        assert_eq!(prober.target(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(prober.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_error_folding() {
        assert_eq!(state_for_error(ScanError::ConnectionRefused), PortState::Closed);
        assert_eq!(state_for_error(ScanError::Timeout), PortState::Closed);
        assert!(matches!(
            state_for_error(ScanError::HostUnreachable),
            PortState::Errored(_)
        ));
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
        let prober = TcpProber::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(1));

        assert_eq!(prober.probe(port).await, PortState::Open);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
        drop(listener);

        let prober = TcpProber::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_millis(200));
        assert!(!prober.probe(port).await.is_open());
    }
}
