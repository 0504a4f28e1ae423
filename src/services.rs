//! Service classification from port numbers and banners.
//!
//! A banner reflects the protocol actually spoken, so a recognised keyword in
//! it wins over the conventional port assignment.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Label used when neither the banner nor the port table identify a service.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Well-known ports probed first, in dispatch order.
pub const PRIORITY_PORTS: [u16; 25] = [
    21, 22, 23, 25, 53, 80, 110, 143, 443, 445, 3306, 3389, 5432, 5900, 6379, 8080, 8443, 27017,
    1433, 1521, 2049, 5000, 8000, 9000, 9090,
];

const CATALOG: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (1433, "MSSQL"),
    (1521, "Oracle"),
    (2049, "NFS"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5000, "UPnP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8000, "HTTP-Alt"),
    (8080, "HTTP-Alt"),
    (8443, "HTTPS-Alt"),
    (9000, "HTTP-Alt"),
    (9090, "HTTP-Alt"),
    (27017, "MongoDB"),
];

/// Static map of well-known ports to service names.
static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> =
    LazyLock::new(|| CATALOG.iter().copied().collect());

/// Banner keywords checked in order; the first hit decides the label.
const BANNER_KEYWORDS: &[(&[&str], &str)] = &[
    (&["http", "html"], "HTTP"),
    (&["ssh"], "SSH"),
    (&["ftp"], "FTP"),
    (&["smtp"], "SMTP"),
    (&["mysql"], "MySQL"),
];

/// Look up the conventional service name for a port.
pub fn get_service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}

/// All catalog entries, ascending by port.
pub fn catalog() -> &'static [(u16, &'static str)] {
    CATALOG
}

/// Identify a service from a banner alone.
fn service_from_banner(banner: &str) -> Option<&'static str> {
    let lower = banner.to_lowercase();
    BANNER_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|&(_, label)| label)
}

/// Label the service on `port`, preferring what the banner says.
pub fn classify(port: u16, banner: Option<&str>) -> &'static str {
    banner
        .and_then(service_from_banner)
        .or_else(|| get_service_name(port))
        .unwrap_or(UNKNOWN_SERVICE)
}
