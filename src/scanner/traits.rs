//! Scanner trait abstraction.
//!
//! The orchestrator talks to the network only through [`Prober`], so the
//! same pool and chunking logic runs against real sockets or a simulated
//! target.

use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of probing one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// A TCP connection was established.
    Open,
    /// The connection was refused or timed out.
    Closed,
    /// The attempt failed for another reason (unreachable, socket error).
    Errored(String),
}

impl PortState {
    /// Check if this is the `Open` state.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Errored(_) => write!(f, "errored"),
        }
    }
}

/// Result of scanning a single port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    /// The port number that was scanned.
    pub port: Port,
    /// State determined by the probe.
    pub state: PortState,
    /// Detected or inferred service name, `Unknown` when unidentified.
    pub service: String,
    /// Banner captured from the service (if any).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PortResult {
    /// Create a new port result.
    pub fn new(port: Port, state: PortState, service: impl Into<String>) -> Self {
        Self {
            port,
            state,
            service: service.into(),
            banner: None,
        }
    }

    /// Set the banner.
    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }

    /// Check if the port is open.
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

/// Which passes a session runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Only the curated priority ports.
    #[default]
    Priority,
    /// Priority ports, then every remaining port in 1-65535.
    Full,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority => write!(f, "priority"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Probes ports on one target.
///
/// Implementations must never panic or return errors for network failures:
/// every failure is expressed as a [`PortState`] or a missing banner.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Make a single connection attempt to `port`.
    async fn probe(&self, port: Port) -> PortState;

    /// Read a short banner from an open `port` over a fresh connection.
    async fn grab_banner(&self, port: Port) -> Option<String>;
}
