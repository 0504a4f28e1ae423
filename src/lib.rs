//! # portsweep - A Concurrent TCP Port Scanner
//!
//! portsweep resolves a target, probes a fixed set of high-value ports first
//! and can then sweep the rest of the port space in chunks, grabbing banners
//! and labelling services as it goes.
//!
//! ## Features
//!
//! - **Two passes**: 25 priority ports, then the remaining 65,510 in chunks of 4096
//! - **Bounded concurrency**: one semaphore-limited worker pool, optional rate limit
//! - **Banner grabbing**: service labels refined from what the port says
//! - **Cancellation**: partial results survive Ctrl-C
//! - **Multiple Output Formats**: Plain text, JSON, CSV and a text export file
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portsweep::{ScanConfig, ScanMode, ScanSession};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScanConfig::default().with_mode(ScanMode::Priority);
//!     let report = ScanSession::new("127.0.0.1").run(config).await.unwrap();
//!
//!     for result in report.open_results() {
//!         println!("{} {}", result.port, result.service);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Port and session id newtypes
//! - [`resolver`] - Target to IPv4 address
//! - [`scanner`] - Probing, the worker pool and the two-pass orchestrator
//! - [`banner`] and [`services`] - Banner reads and service classification
//! - [`aggregate`] and [`session`] - Merging passes into a report
//! - [`export`] and [`output`] - Getting results out
//! - [`config`], [`logging`] and [`error`] - Ambient plumbing

pub mod aggregate;
pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod output;
pub mod resolver;
pub mod scanner;
pub mod services;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use aggregate::ResultAggregator;
pub use error::{CliError, ConfigError, ExportError, ResolveError, ScanError, SessionError};
pub use export::{export_results, write_export};
pub use resolver::resolve;
pub use scanner::{
    scan_full, scan_port, scan_priority, PortResult, PortState, Prober, ScanConfig, ScanEvent,
    ScanMode, ScanOrchestrator, TcpProber,
};
pub use services::classify;
pub use session::{ScanReport, ScanSession, SessionState};
pub use types::{Port, PortRange, SessionId};
