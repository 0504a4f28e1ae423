//! Scanner module - drives the priority and full passes.
//!
//! The priority pass probes the curated [`PRIORITY_PORTS`] through the
//! session's worker pool. The full pass walks the rest of 1-65535 in chunks of
//! [`CHUNK_SIZE`] ports; a chunk drains completely before the next one starts,
//! and the same pool serves every chunk.

mod pool;
pub mod rate_limiter;
pub mod tcp;
pub mod traits;

pub use pool::WorkerPool;
pub use rate_limiter::RateLimiter;
pub use tcp::TcpProber;
pub use traits::{PortResult, PortState, Prober, ScanMode};

use crate::services::{classify, PRIORITY_PORTS};
use crate::session::SessionState;
use crate::types::{Port, PortRange};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default number of concurrent probes.
pub const DEFAULT_CONCURRENCY: usize = 200;

/// Upper bound on concurrent probes.
pub const MAX_CONCURRENCY: usize = 800;

/// Default per-port timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Ports per full-sweep chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Configuration for one scan session.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Resolved target address.
    pub address: IpAddr,
    /// Worker pool size, always within `1..=MAX_CONCURRENCY`.
    pub concurrency: usize,
    /// Bound on each connect, send and read.
    pub timeout: Duration,
    /// Read a banner from open ports.
    pub grab_banners: bool,
    /// Report closed and errored ports as well as open ones.
    pub verbose: bool,
    /// Which passes to run.
    pub mode: ScanMode,
    /// Probe starts per second, 0 for unlimited.
    pub rate_limit: u32,
}

/// Targets the loopback address. A [`ScanSession`](crate::session::ScanSession)
/// replaces it with the resolved target; direct orchestrator callers should
/// set one with [`ScanConfig::with_address`].
impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

impl ScanConfig {
    /// Create a configuration with default settings.
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            grab_banners: true,
            verbose: false,
            mode: ScanMode::Priority,
            rate_limit: 0,
        }
    }

    /// Set the target address.
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = address;
        self
    }

    /// Set the pool size, clamped to `1..=MAX_CONCURRENCY`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-port timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable banner grabbing.
    pub fn with_banners(mut self, enabled: bool) -> Self {
        self.grab_banners = enabled;
        self
    }

    /// Enable or disable closed-port reporting.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the scan mode.
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Limit probe starts per second (0 = unlimited).
    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }
}

/// Progress after one full-sweep chunk has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// 1-based index of the chunk just finished.
    pub chunk: usize,
    /// Number of chunks in the sweep.
    pub chunks: usize,
    /// Ports probed so far in this sweep.
    pub completed: usize,
    /// Ports in the whole sweep.
    pub total: usize,
    /// `completed * 100 / total`, rounded down.
    pub percent: u8,
}

/// Live notifications for the presentation layer.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A probe finished.
    PortScanned(PortResult),
    /// A full-sweep chunk finished.
    ChunkCompleted(ChunkProgress),
}

/// Sending half of the event channel.
pub type EventSender = mpsc::UnboundedSender<ScanEvent>;

/// Priority ports as validated `Port`s, in dispatch order.
pub fn priority_ports() -> Vec<Port> {
    PRIORITY_PORTS.iter().copied().filter_map(Port::new).collect()
}

/// Every port in 1-65535 not in `exclude`, ascending.
pub fn full_sweep_ports(exclude: &BTreeSet<Port>) -> Vec<Port> {
    PortRange::full()
        .iter()
        .filter(|port| !exclude.contains(port))
        .collect()
}

/// Number of chunks needed for `total` ports.
pub fn chunk_count(total: usize) -> usize {
    total.div_ceil(CHUNK_SIZE)
}

/// Integer percentage of `completed` out of `total`.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (completed.min(total) * 100 / total) as u8
}

/// Probe one port, grab its banner if open, and label the service.
pub async fn scan_port(prober: &dyn Prober, port: Port, grab_banners: bool) -> PortResult {
    let state = prober.probe(port).await;
    let banner = if grab_banners && state.is_open() {
        prober.grab_banner(port).await
    } else {
        None
    };
    let service = classify(port.as_u16(), banner.as_deref());

    PortResult::new(port, state, service).with_banner(banner)
}

/// Runs scanning passes against one target.
pub struct ScanOrchestrator {
    config: ScanConfig,
    prober: Arc<dyn Prober>,
    pool: WorkerPool,
    cancel: CancellationToken,
    events: Option<EventSender>,
}

impl ScanOrchestrator {
    /// Create an orchestrator probing `config.address` over TCP.
    pub fn new(config: ScanConfig) -> Self {
        let prober = Arc::new(TcpProber::new(config.address, config.timeout));
        Self::with_prober(config, prober)
    }

    /// Create an orchestrator using a custom prober.
    pub fn with_prober(config: ScanConfig, prober: Arc<dyn Prober>) -> Self {
        let pool = WorkerPool::new(config.concurrency).with_rate_limit(config.rate_limit);
        Self {
            config,
            prober,
            pool,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Send live events to `events`.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Abandon work when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Whether the scan has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            // A closed receiver just means nobody is watching.
            let _ = events.send(event);
        }
    }

    /// Probe every priority port.
    pub async fn scan_priority(&self) -> Vec<PortResult> {
        let ports = priority_ports();
        info!(ports = ports.len(), "starting priority pass");

        let mut results = self.run_batch(ports).await;
        results.sort_by_key(|r| r.port);
        results
    }

    /// Probe every port in 1-65535 except `exclude`, one chunk at a time.
    pub async fn scan_full(&self, exclude: &BTreeSet<Port>) -> Vec<PortResult> {
        let ports = full_sweep_ports(exclude);
        let total = ports.len();
        let chunks = chunk_count(total);
        info!(total, chunks, excluded = exclude.len(), "starting full sweep");

        let mut results = Vec::with_capacity(total);
        let mut completed = 0;

        for (index, chunk) in ports.chunks(CHUNK_SIZE).enumerate() {
            if self.is_cancelled() {
                break;
            }

            let found = self.run_batch(chunk.to_vec()).await;
            results.extend(found);

            if self.is_cancelled() {
                info!(chunk = index + 1, chunks, "full sweep cancelled");
                break;
            }

            completed += chunk.len();
            let progress = ChunkProgress {
                chunk: index + 1,
                chunks,
                completed,
                total,
                percent: progress_percent(completed, total),
            };
            debug!(
                chunk = progress.chunk,
                chunks,
                percent = progress.percent,
                "chunk complete"
            );
            self.emit(ScanEvent::ChunkCompleted(progress));
        }

        results.sort_by_key(|r| r.port);
        results
    }

    /// Run `ports` through the pool, reporting each result as it lands.
    async fn run_batch(&self, ports: Vec<Port>) -> Vec<PortResult> {
        let mut results = Vec::with_capacity(ports.len());
        let mut stream = pin!(self.pool.run(
            Arc::clone(&self.prober),
            ports,
            self.config.grab_banners,
            self.cancel.clone(),
        ));

        while let Some(result) = stream.next().await {
            if result.is_open() {
                debug!(port = %result.port, service = %result.service, "open port");
            }
            self.emit(ScanEvent::PortScanned(result.clone()));
            results.push(result);
        }

        results
    }
}

/// Probe the priority ports on `config.address`.
pub async fn scan_priority(config: &ScanConfig) -> Vec<PortResult> {
    ScanOrchestrator::new(config.clone()).scan_priority().await
}

/// Probe the remaining port space on `config.address`, skipping `exclude`.
pub async fn scan_full(config: &ScanConfig, exclude: &BTreeSet<Port>) -> Vec<PortResult> {
    ScanOrchestrator::new(config.clone()).scan_full(exclude).await
}
