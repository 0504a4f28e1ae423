//! Plain text output formatting.
//!
//! Produces human-readable output with colors and a progress bar for the
//! full sweep.

use crate::scanner::{PortResult, PortState, ScanConfig, ScanEvent};
use crate::services::{catalog, PRIORITY_PORTS};
use crate::session::{ScanReport, SessionState};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use tokio::sync::mpsc::UnboundedReceiver;

/// Characters of a banner shown in live output.
const LIVE_BANNER_CHARS: usize = 100;

/// Characters of a banner shown in the summary.
const SUMMARY_BANNER_CHARS: usize = 80;

/// First line of a banner, cut to `max` characters.
fn banner_preview(banner: &str, max: usize) -> String {
    banner.lines().next().unwrap_or("").chars().take(max).collect()
}

/// Live line(s) for one probe, or `None` when the port is not reported.
///
/// Banner previews, closed and errored ports are only reported with `verbose`.
pub fn port_line(result: &PortResult, verbose: bool) -> Option<String> {
    match &result.state {
        PortState::Open => {
            let mut line = format!("[+] {} ({})", result.port, result.service);
            if let Some(banner) = result.banner.as_deref().filter(|_| verbose) {
                line.push_str(&format!(
                    "\n    └─ Banner: {}",
                    banner_preview(banner, LIVE_BANNER_CHARS)
                ));
            }
            Some(line)
        }
        PortState::Closed if verbose => Some(format!("[-] {}", result.port)),
        PortState::Errored(reason) if verbose => {
            Some(format!("[!] {} ({})", result.port, reason))
        }
        _ => None,
    }
}

fn styled_port_line(result: &PortResult, verbose: bool) -> Option<String> {
    let line = port_line(result, verbose)?;
    let styled = match result.state {
        PortState::Open => style(line).green().to_string(),
        PortState::Closed => style(line).red().to_string(),
        PortState::Errored(_) => style(line).yellow().to_string(),
    };
    Some(styled)
}

fn sweep_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb
}

/// Print live scan events until the sender side is dropped.
///
/// With `live` unset the events are drained silently.
pub async fn render_events(mut events: UnboundedReceiver<ScanEvent>, verbose: bool, live: bool) {
    let mut progress: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        if !live {
            continue;
        }

        match event {
            ScanEvent::StateChanged(SessionState::ScanningPriority) => {
                println!(
                    "\n{} Scanning {} priority ports...\n",
                    style("•").dim(),
                    style(PRIORITY_PORTS.len()).white().bold()
                );
            }
            ScanEvent::StateChanged(SessionState::ScanningFull) => {
                println!("\n{} Scanning remaining ports...\n", style("•").dim());
                progress = Some(sweep_progress_bar());
            }
            ScanEvent::StateChanged(SessionState::Aggregating) => {
                if let Some(pb) = progress.take() {
                    pb.finish_and_clear();
                }
            }
            ScanEvent::StateChanged(_) => {}
            ScanEvent::PortScanned(result) => {
                if let Some(line) = styled_port_line(&result, verbose) {
                    match &progress {
                        Some(pb) => pb.println(line),
                        None => println!("{}", line),
                    }
                }
            }
            ScanEvent::ChunkCompleted(chunk) => {
                if let Some(pb) = &progress {
                    pb.set_position(u64::from(chunk.percent));
                    pb.set_message(format!("chunk {}/{}", chunk.chunk, chunk.chunks));
                }
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, config: &ScanConfig) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!(
        "{} Mode: {}  Workers: {}  Timeout: {:.2}s  Banners: {}",
        style("•").dim(),
        style(config.mode).yellow(),
        config.concurrency,
        config.timeout.as_secs_f64(),
        if config.grab_banners { "on" } else { "off" }
    );
}

/// Print the end-of-scan summary.
pub fn print_summary(report: &ScanReport, show_banners: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let rule = "═".repeat(50);

    writeln!(out)?;
    writeln!(out, "{}", style(&rule).cyan())?;
    writeln!(out, "{}", style("Scan Summary").bold())?;
    writeln!(out, "  • Target: {} ({})", report.target, report.address)?;
    writeln!(
        out,
        "  • Duration: {:.1}s",
        report.duration_ms as f64 / 1000.0
    )?;
    writeln!(out, "  • Ports scanned: {}", report.ports_scanned)?;
    writeln!(out, "  • Open Ports: {}", style(report.open_ports).green().bold())?;

    if report.open_ports == 0 {
        writeln!(out, "\n{}", style("No open ports found").red())?;
    } else {
        writeln!(out, "\n{}", style("Open Ports:").green().bold())?;
        for result in report.open_results() {
            writeln!(
                out,
                "{}",
                style(format!("   [{}] - {}", result.port, result.service)).green()
            )?;
            if let Some(banner) = result.banner.as_deref().filter(|_| show_banners) {
                writeln!(
                    out,
                    "{}",
                    style(format!(
                        "      └─ {}",
                        banner_preview(banner, SUMMARY_BANNER_CHARS)
                    ))
                    .yellow()
                )?;
            }
        }
    }

    if report.cancelled {
        writeln!(out, "\n{}", style("Scan was cancelled; results are partial.").yellow())?;
    }
    writeln!(out, "{}", style(&rule).cyan())?;

    Ok(())
}

/// Print the service catalog and the priority port order.
pub fn print_services() -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{:>6}  {}", style("PORT").bold(), style("SERVICE").bold())?;
    for (port, name) in catalog() {
        writeln!(out, "{:>6}  {}", port, name)?;
    }

    let order: Vec<String> = PRIORITY_PORTS.iter().map(u16::to_string).collect();
    writeln!(out, "\n{} {}", style("Priority order:").bold(), order.join(","))?;
    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;

    fn result(port: u16, state: PortState, banner: Option<&str>) -> PortResult {
        PortResult::new(Port::new(port).unwrap(), state, "SSH")
            .with_banner(banner.map(str::to_string))
    }

    #[test]
    fn test_open_port_line() {
        let r = result(22, PortState::Open, Some("SSH-2.0-OpenSSH_8.9\r\nextra"));
        assert_eq!(port_line(&r, false).unwrap(), "[+] 22 (SSH)");
        assert_eq!(
            port_line(&r, true).unwrap(),
            "[+] 22 (SSH)\n    └─ Banner: SSH-2.0-OpenSSH_8.9"
        );
    }

    #[test]
    fn test_closed_port_only_when_verbose() {
        let r = result(23, PortState::Closed, None);
        assert_eq!(port_line(&r, false), None);
        assert_eq!(port_line(&r, true).unwrap(), "[-] 23");

        let r = result(24, PortState::Errored("no route to host".into()), None);
        assert_eq!(port_line(&r, false), None);
        assert_eq!(port_line(&r, true).unwrap(), "[!] 24 (no route to host)");
    }

    #[test]
    fn test_banner_preview() {
        assert_eq!(banner_preview("abc\ndef", 10), "abc");
        assert_eq!(banner_preview("abcdef", 3), "abc");
        assert_eq!(banner_preview("", 3), "");
    }
}
