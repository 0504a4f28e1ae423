//! Scan subcommand implementation.
//!
//! Handles the `portsweep scan [TARGET]` command.

use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::{CliResult, ConfigError};
use crate::export::write_export;
use crate::output;
use crate::scanner::{ScanConfig, ScanMode};
use crate::session::ScanSession;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Longest accepted per-port timeout, in seconds.
const MAX_TIMEOUT_SECS: f64 = 3600.0;

/// Scan a target for open ports.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target to scan (IPv4 address or hostname)
    #[arg(value_name = "TARGET", default_value = "127.0.0.1")]
    pub target: String,

    /// Number of concurrent probes (1-800)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-port timeout in seconds
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Skip banner grabbing on open ports
    #[arg(long)]
    pub no_banner: bool,

    /// Report closed ports
    #[arg(long)]
    pub show_closed: bool,

    /// Scan the priority ports only, or every port
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<ScanMode>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Probes started per second (0 = unlimited)
    #[arg(long = "rate", value_name = "N")]
    pub rate_limit: Option<u32>,

    /// Write open ports to a text file after the scan
    #[arg(long)]
    pub export: bool,

    /// Directory for the export file
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

impl ScanCommand {
    /// Merge command-line flags over `settings`.
    pub fn scan_config(&self, settings: &AppSettings, verbose: bool) -> CliResult<ScanConfig> {
        let mut config = settings.scan_config();

        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(parse_timeout(secs)?);
        }
        if self.no_banner {
            config = config.with_banners(false);
        }
        if self.show_closed || verbose {
            config = config.with_verbose(true);
        }
        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if let Some(rate) = self.rate_limit {
            config = config.with_rate_limit(rate);
        }

        Ok(config)
    }

    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, verbose: bool, quiet: bool) -> CliResult<()> {
        let config = self.scan_config(settings, verbose)?;
        let plain = self.output == OutputFormat::Plain;
        let live = plain && !quiet;

        if live {
            output::print_scan_header(&self.target, &config);
        }

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("cancellation requested");
                signal_cancel.cancel();
            }
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(output::render_events(rx, config.verbose, live));

        let session = ScanSession::new(self.target.as_str())
            .with_events(tx)
            .with_cancellation(cancel);
        let outcome = session.run(config.clone()).await;
        signal_task.abort();
        // The session dropped its sender, so the printer drains and exits.
        let _ = printer.await;

        let report = outcome?;
        if report.cancelled && !quiet {
            output::print_warning("scan cancelled, showing partial results");
        }

        output::print_results(&report, self.output, config.grab_banners)?;

        if self.export {
            let dir = self
                .export_dir
                .clone()
                .or_else(|| settings.export_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let results: Vec<_> = report.open_results().cloned().collect();
            let path = write_export(&dir, &report.target, &results)?;
            if !quiet {
                output::print_success(&format!("Results exported to {}", path.display()));
            }
        }

        Ok(())
    }
}

/// Convert a timeout given in seconds, rejecting non-positive and absurd values.
fn parse_timeout(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::InvalidValue {
            field: "timeout",
            reason: format!("must be between 0 and {} seconds", MAX_TIMEOUT_SECS),
        });
    }
    Ok(Duration::from_secs_f64(secs))
}
