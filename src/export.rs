//! Plain-text export of open ports.
//!
//! ```text
//! Port Scan Results for 10.0.0.5
//! ==================================================
//!
//! Scan Date: 2024-05-01 12:00:00
//! Total Open Ports: 1
//!
//! Port 80: HTTP
//!   Banner: HTTP/1.1 200 OK
//!
//! ```

use crate::error::ExportError;
use crate::scanner::PortResult;
use chrono::{DateTime, Local, TimeZone};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Characters of a banner written to the export.
const EXPORT_BANNER_CHARS: usize = 100;

/// `scan_<target with '.' replaced by '_'>_<unix seconds>.txt`
pub fn export_filename<Tz: TimeZone>(target: &str, at: &DateTime<Tz>) -> String {
    format!("scan_{}_{}.txt", target.replace('.', "_"), at.timestamp())
}

/// Write the export layout for the open ports in `results` to `writer`.
pub fn export_results<W: Write>(
    target: &str,
    results: &[PortResult],
    scan_date: &DateTime<Local>,
    writer: &mut W,
) -> Result<(), ExportError> {
    let open: Vec<&PortResult> = results.iter().filter(|r| r.is_open()).collect();

    writeln!(writer, "Port Scan Results for {}", target)?;
    writeln!(writer, "{}", "=".repeat(50))?;
    writeln!(writer)?;
    writeln!(writer, "Scan Date: {}", scan_date.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(writer, "Total Open Ports: {}", open.len())?;
    writeln!(writer)?;

    for result in open {
        writeln!(writer, "Port {}: {}", result.port, result.service)?;
        if let Some(banner) = result.banner.as_deref() {
            let preview: String = banner.chars().take(EXPORT_BANNER_CHARS).collect();
            writeln!(writer, "  Banner: {}", preview)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Export `results` into a new file under `dir`, returning its path.
pub fn write_export(
    dir: &Path,
    target: &str,
    results: &[PortResult],
) -> Result<PathBuf, ExportError> {
    let now = Local::now();
    let path = dir.join(export_filename(target, &now));

    let file = File::create(&path).map_err(|source| ExportError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    export_results(target, results, &now, &mut writer)?;
    writer.flush()?;

    info!(path = %path.display(), "results exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::PortState;
    use crate::types::Port;
    use chrono::Utc;

    fn open(port: u16, service: &str, banner: Option<&str>) -> PortResult {
        PortResult::new(Port::new(port).unwrap(), PortState::Open, service)
            .with_banner(banner.map(str::to_string))
    }

    fn render(target: &str, results: &[PortResult]) -> String {
        let date = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut buffer = Vec::new();
        export_results(target, results, &date, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_export_layout() {
        let text = render("10.0.0.5", &[open(80, "HTTP", None)]);
        let expected = "Port Scan Results for 10.0.0.5\n\
                        ==================================================\n\
                        \n\
                        Scan Date: 2024-05-01 12:00:00\n\
                        Total Open Ports: 1\n\
                        \n\
                        Port 80: HTTP\n\
                        \n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_export_banner_truncated_and_closed_skipped() {
        let long = "x".repeat(150);
        let closed = PortResult::new(Port::new(23).unwrap(), PortState::Closed, "Telnet");
        let text = render("host", &[open(22, "SSH", Some(&long)), closed]);

        assert!(text.contains("Total Open Ports: 1\n"));
        assert!(text.contains(&format!("Port 22: SSH\n  Banner: {}\n\n", "x".repeat(100))));
        assert!(!text.contains("Port 23"));
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            export_filename("10.0.0.5", &at),
            "scan_10_0_0_5_1700000000.txt"
        );
        assert_eq!(
            export_filename("example.com", &at),
            "scan_example_com_1700000000.txt"
        );
    }

    #[test]
    fn test_write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "10.0.0.5", &[open(80, "HTTP", None)]).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_10_0_0_5_"));
        assert!(name.ends_with(".txt"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().any(|l| l == "Port 80: HTTP"));
        assert!(text.lines().any(|l| l == "Total Open Ports: 1"));
    }

    #[test]
    fn test_write_export_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_export(&missing, "host", &[]).unwrap_err();
        assert!(matches!(err, ExportError::WriteFailed { .. }));
    }
}
