//! A single scan invocation from target string to ordered report.
//!
//! ```text
//! Idle -> Resolving -> ScanningPriority -> [ScanningFull] -> Aggregating -> Completed
//!            \-> ResolutionFailed                                  \-> Cancelled
//!            \-> Cancelled
//! ```

use crate::aggregate::ResultAggregator;
use crate::error::SessionError;
use crate::resolver::resolve;
use crate::scanner::{
    priority_ports, EventSender, PortResult, Prober, ScanConfig, ScanEvent, ScanMode,
    ScanOrchestrator,
};
use crate::types::{Port, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Resolving,
    ScanningPriority,
    ScanningFull,
    Aggregating,
    Completed,
    ResolutionFailed,
    Cancelled,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Resolving, ScanningPriority)
                | (Resolving, ResolutionFailed)
                | (Resolving, Cancelled)
                | (ScanningPriority, ScanningFull)
                | (ScanningPriority, Aggregating)
                | (ScanningFull, Aggregating)
                | (Aggregating, Completed)
                | (Aggregating, Cancelled)
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::ResolutionFailed | Self::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::ScanningPriority => "scanning priority ports",
            Self::ScanningFull => "scanning all ports",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::ResolutionFailed => "resolution failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Final, ordered outcome of a session.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub id: SessionId,
    /// Target as given by the user.
    pub target: String,
    /// Address that was probed.
    pub address: IpAddr,
    pub mode: ScanMode,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Ports probed across all passes.
    pub ports_scanned: usize,
    pub open_ports: usize,
    /// The session was cancelled and `results` are partial.
    pub cancelled: bool,
    /// Ascending by port; closed ports only in verbose mode.
    pub results: Vec<PortResult>,
}

impl ScanReport {
    /// Iterate over open results.
    pub fn open_results(&self) -> impl Iterator<Item = &PortResult> {
        self.results.iter().filter(|r| r.is_open())
    }
}

/// One scan of one target.
pub struct ScanSession {
    id: SessionId,
    target: String,
    state: SessionState,
    cancel: CancellationToken,
    events: Option<EventSender>,
    prober: Option<Arc<dyn Prober>>,
}

impl ScanSession {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            target: target.into(),
            state: SessionState::Idle,
            cancel: CancellationToken::new(),
            events: None,
            prober: None,
        }
    }

    /// Send live events to `events`.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Use `cancel` to abort the session.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Probe through `prober` instead of TCP connect.
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token that cancels this session when fired.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        if let Some(events) = &self.events {
            let _ = events.send(ScanEvent::StateChanged(next));
        }
    }

    /// Resolve the target, run the configured passes and aggregate.
    ///
    /// Only a resolution failure is an error. Cancellation returns the
    /// results gathered so far with `cancelled` set.
    #[tracing::instrument(skip_all, fields(session = %self.id.short(), target = %self.target))]
    pub async fn run(mut self, config: ScanConfig) -> Result<ScanReport, SessionError> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.advance(SessionState::Resolving);
        let resolved = until_cancelled(resolve(&self.target), &self.cancel).await;
        let address = match resolved {
            None => {
                info!("cancelled during resolution");
                self.advance(SessionState::Cancelled);
                return Err(SessionError::Cancelled);
            }
            Some(Ok(address)) => IpAddr::V4(address),
            Some(Err(e)) => {
                warn!(error = %e, "target resolution failed");
                self.advance(SessionState::ResolutionFailed);
                return Err(e.into());
            }
        };
        info!(%address, mode = %config.mode, "target resolved");

        let config = config.with_address(address);
        let mode = config.mode;
        let include_closed = config.verbose;

        let mut orchestrator = match self.prober.take() {
            Some(prober) => ScanOrchestrator::with_prober(config, prober),
            None => ScanOrchestrator::new(config),
        }
        .with_cancellation(self.cancel.clone());
        if let Some(events) = &self.events {
            orchestrator = orchestrator.with_events(events.clone());
        }

        let mut aggregator = ResultAggregator::new();

        self.advance(SessionState::ScanningPriority);
        aggregator.add_pass(orchestrator.scan_priority().await);

        if mode == ScanMode::Full && !self.cancel.is_cancelled() {
            self.advance(SessionState::ScanningFull);
            let exclude: BTreeSet<Port> = priority_ports().into_iter().collect();
            aggregator.add_pass(orchestrator.scan_full(&exclude).await);
        }

        let cancelled = self.cancel.is_cancelled();
        self.advance(SessionState::Aggregating);
        let ports_scanned = aggregator.len();
        let open_ports = aggregator.open_count();
        let results = aggregator.finish(include_closed);

        self.advance(if cancelled {
            SessionState::Cancelled
        } else {
            SessionState::Completed
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(ports_scanned, open_ports, duration_ms, cancelled, "scan finished");

        Ok(ScanReport {
            id: self.id,
            target: self.target,
            address,
            mode,
            started_at,
            duration_ms,
            ports_scanned,
            open_ports,
            cancelled,
            results,
        })
    }
}

/// Drive `work` until it finishes or `cancel` fires, whichever is first.
///
/// Work that is already complete wins over a cancelled token.
async fn until_cancelled<F: Future>(work: F, cancel: &CancellationToken) -> Option<F::Output> {
    tokio::select! {
        biased;
        output = work => Some(output),
        _ = cancel.cancelled() => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::scanner::PortState;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FixedTarget {
        open: HashSet<u16>,
    }

    impl FixedTarget {
        fn new(open: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                open: open.iter().copied().collect(),
            })
        }
    }

    #[async_trait]
    impl Prober for FixedTarget {
        async fn probe(&self, port: Port) -> PortState {
            if self.open.contains(&port.as_u16()) {
                PortState::Open
            } else {
                PortState::Closed
            }
        }

        async fn grab_banner(&self, _port: Port) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_state_transitions() {
        use SessionState::*;
        assert!(Idle.can_advance_to(Resolving));
        assert!(Resolving.can_advance_to(ResolutionFailed));
        assert!(Resolving.can_advance_to(Cancelled));
        assert!(ScanningPriority.can_advance_to(Aggregating));
        assert!(Aggregating.can_advance_to(Cancelled));
        assert!(!Idle.can_advance_to(ScanningPriority));
        assert!(!ScanningFull.can_advance_to(ScanningPriority));
        assert!(!ResolutionFailed.can_advance_to(ScanningPriority));
        assert!(Completed.is_terminal());
        assert!(!Aggregating.is_terminal());
    }

    #[tokio::test]
    async fn test_full_session_aggregates_unique_sorted_ports() {
        let session = ScanSession::new("127.0.0.1").with_prober(FixedTarget::new(&[80, 22]));
        let config = ScanConfig::default()
            .with_mode(ScanMode::Full)
            .with_concurrency(800);

        let report = session.run(config).await.unwrap();

        let ports: Vec<u16> = report.results.iter().map(|r| r.port.as_u16()).collect();
        assert_eq!(ports, vec![22, 80]);
        assert_eq!(report.open_ports, 2);
        assert_eq!(report.ports_scanned, 65535);
        assert!(!report.cancelled);
        assert_eq!(report.results[0].service, "SSH");
    }

    #[tokio::test]
    async fn test_priority_session_verbose_includes_closed() {
        let session = ScanSession::new("127.0.0.1").with_prober(FixedTarget::new(&[443]));
        let config = ScanConfig::default().with_verbose(true);

        let report = session.run(config).await.unwrap();
        assert_eq!(report.ports_scanned, 25);
        assert_eq!(report.results.len(), 25);
        assert_eq!(report.open_results().count(), 1);
        assert!(report.results.windows(2).all(|w| w[0].port < w[1].port));
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts_before_probing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ScanSession::new("::1")
            .with_prober(FixedTarget::new(&[22]))
            .with_events(tx);

        let err = session.run(ScanConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Resolution(ResolveError::NoIpv4Address(_))
        ));

        let mut states = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::StateChanged(state) => states.push(state),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(
            states,
            vec![SessionState::Resolving, SessionState::ResolutionFailed]
        );
    }

    #[tokio::test]
    async fn test_cancelled_session_returns_partial_report() {
        let session = ScanSession::new("127.0.0.1").with_prober(FixedTarget::new(&[22]));
        session.cancellation_token().cancel();

        let report = session
            .run(ScanConfig::default().with_mode(ScanMode::Full))
            .await
            .unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_pending_lookup_abandoned_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            until_cancelled(std::future::pending::<()>(), &cancel),
        )
        .await;
        assert_eq!(outcome, Ok(None));
    }

    #[tokio::test]
    async fn test_finished_lookup_beats_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(until_cancelled(async { 7 }, &cancel).await, Some(7));
    }
}
