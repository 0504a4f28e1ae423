//! Bounded worker pool for port probes.
//!
//! One pool lives for a whole session and is reused by every pass and chunk.
//! The semaphore caps how many probes hold a socket at any instant; results
//! flow back through the returned stream so the caller is the only writer of
//! its result buffer.

use super::rate_limiter::RateLimiter;
use super::scan_port;
use super::traits::{PortResult, PortState, Prober};
use super::MAX_CONCURRENCY;
use crate::services::classify;
use crate::types::Port;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A fixed-capacity set of concurrent probe slots.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
    limiter: Option<RateLimiter>,
}

impl WorkerPool {
    /// Create a pool with `size` slots, clamped to `1..=MAX_CONCURRENCY`.
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, MAX_CONCURRENCY);
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            limiter: None,
        }
    }

    /// Pace probe starts to `rate` per second (0 = unlimited).
    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.limiter = RateLimiter::new(rate);
        self
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Probe `ports`, yielding results in completion order.
    ///
    /// After `cancel` fires no further ports are dispatched and in-flight
    /// probes are dropped without producing a result.
    pub fn run(
        &self,
        prober: Arc<dyn Prober>,
        ports: Vec<Port>,
        grab_banners: bool,
        cancel: CancellationToken,
    ) -> impl Stream<Item = PortResult> + Send + 'static {
        let permits = Arc::clone(&self.permits);
        let limiter = self.limiter.clone();
        let dispatch_guard = cancel.clone();

        stream::iter(ports)
            .take_while(move |_| future::ready(!dispatch_guard.is_cancelled()))
            .map(move |port| {
                let task = tokio::spawn(probe_job(
                    Arc::clone(&prober),
                    port,
                    grab_banners,
                    Arc::clone(&permits),
                    limiter.clone(),
                    cancel.clone(),
                ));

                async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(%port, error = %e, "probe task failed");
                            Some(PortResult::new(
                                port,
                                PortState::Errored(format!("probe task failed: {e}")),
                                classify(port.as_u16(), None),
                            ))
                        }
                    }
                }
            })
            .buffer_unordered(self.size)
            .filter_map(future::ready)
    }
}

/// One unit of work: wait for a slot, then probe.
async fn probe_job(
    prober: Arc<dyn Prober>,
    port: Port,
    grab_banners: bool,
    permits: Arc<Semaphore>,
    limiter: Option<RateLimiter>,
    cancel: CancellationToken,
) -> Option<PortResult> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        permit = permits.acquire_owned() => permit.ok()?,
    };

    if let Some(limiter) = &limiter {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = limiter.wait() => {}
        }
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = scan_port(prober.as_ref(), port, grab_banners) => Some(result),
    }
}
