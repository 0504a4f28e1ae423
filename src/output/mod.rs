//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of scan reports.

mod csv_format;
mod json_format;
pub mod plain;

pub use csv_format::{print_csv, write_csv};
pub use json_format::print_json;
pub use plain::{
    print_error, print_scan_header, print_services, print_success, print_summary,
    print_warning, render_events,
};

use crate::cli::OutputFormat;
use crate::session::ScanReport;
use std::io;

/// Format and print a scan report according to the specified format.
pub fn print_results(report: &ScanReport, format: OutputFormat, show_banners: bool) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_summary(report, show_banners),
        OutputFormat::Json => json_format::print_json(report),
        OutputFormat::Csv => csv_format::print_csv(report),
    }
}
