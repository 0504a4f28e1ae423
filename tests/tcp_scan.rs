//! End-to-end checks of the TCP prober against loopback listeners.

use portsweep::scanner::{ScanEvent, ScanOrchestrator};
use portsweep::{
    scan_port, Port, PortState, Prober, ScanConfig, ScanMode, ScanSession, SessionState,
    TcpProber,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn prober() -> TcpProber {
    TcpProber::new(LOCALHOST, Duration::from_millis(500))
}

fn port_of(addr: SocketAddr) -> Port {
    Port::new(addr.port()).unwrap()
}

/// Accept connections forever, greeting each one with `greeting`.
async fn greeting_server(greeting: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(greeting).await;
                let mut probe = [0u8; 64];
                let _ = socket.read(&mut probe).await;
            });
        }
    });

    addr
}

#[tokio::test]
async fn ssh_greeting_is_classified_from_banner() {
    let addr = greeting_server(b"SSH-2.0-OpenSSH_9.6\r\n").await;

    let result = scan_port(&prober(), port_of(addr), true).await;

    assert_eq!(result.state, PortState::Open);
    assert_eq!(result.service, "SSH");
    assert_eq!(result.banner.as_deref(), Some("SSH-2.0-OpenSSH_9.6"));
}

#[tokio::test]
async fn banner_skipped_when_disabled() {
    let addr = greeting_server(b"220 ftp.example.com FTP ready\r\n").await;

    let result = scan_port(&prober(), port_of(addr), false).await;

    assert!(result.is_open());
    assert_eq!(result.banner, None);
}

#[tokio::test]
async fn released_port_is_closed() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = port_of(listener.local_addr().unwrap());
    drop(listener);

    assert_eq!(prober().probe(port).await, PortState::Closed);
}

#[tokio::test]
async fn orchestrator_probes_priority_ports_over_real_sockets() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ScanConfig::new(LOCALHOST)
        .with_concurrency(25)
        .with_timeout(Duration::from_millis(300))
        .with_banners(false);
    let orchestrator = ScanOrchestrator::with_prober(config, Arc::new(prober())).with_events(tx);

    let results = orchestrator.scan_priority().await;
    drop(orchestrator);

    assert_eq!(results.len(), 25);
    assert!(results.windows(2).all(|w| w[0].port < w[1].port));

    let mut scanned = 0;
    while let Some(event) = rx.recv().await {
        if matches!(event, ScanEvent::PortScanned(_)) {
            scanned += 1;
        }
    }
    assert_eq!(scanned, 25);
}

#[tokio::test]
async fn session_reports_loopback_priority_scan() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ScanConfig::default()
        .with_mode(ScanMode::Priority)
        .with_timeout(Duration::from_millis(300))
        .with_banners(false);

    let report = assert_ok!(ScanSession::new("127.0.0.1").with_events(tx).run(config).await);

    assert_eq!(report.address, LOCALHOST);
    assert_eq!(report.ports_scanned, 25);
    assert!(!report.cancelled);
    assert!(report.results.iter().all(|r| r.is_open()));
    assert_eq!(report.open_ports, report.results.len());

    let mut last_state = None;
    while let Some(event) = rx.recv().await {
        if let ScanEvent::StateChanged(state) = event {
            last_state = Some(state);
        }
    }
    assert_eq!(last_state, Some(SessionState::Completed));
}
