//! CSV output formatting.

use crate::session::ScanReport;
use std::io::{self, Write};

/// Write the report's results as CSV.
pub fn write_csv<W: Write>(report: &ScanReport, writer: W) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["port", "state", "service", "banner"])?;

    for result in &report.results {
        let port = result.port.to_string();
        let state = result.state.to_string();
        wtr.write_record([
            port.as_str(),
            state.as_str(),
            result.service.as_str(),
            result.banner.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print results in CSV format.
pub fn print_csv(report: &ScanReport) -> io::Result<()> {
    write_csv(report, io::stdout().lock())
}
