//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Only resolution failures
//! end a session; per-port failures are folded into [`PortState`] by the prober.
//!
//! [`PortState`]: crate::scanner::PortState

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single connect attempt.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connection to port {port} failed: {reason}")]
    ConnectionFailed { port: u16, reason: String },

    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("host unreachable")]
    HostUnreachable,
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Turning a target string into an IPv4 address failed.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("invalid target: '{0}'")]
    InvalidTarget(String),

    #[error("DNS resolution failed for '{host}': {reason}")]
    LookupFailed { host: String, reason: String },

    #[error("no IPv4 address found for '{0}'")]
    NoIpv4Address(String),
}

/// Writing the text export failed. The scan results stay valid.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write export file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to settings management.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Session-level failure.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error("scan cancelled while resolving the target")]
    Cancelled,
}

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
