//! Banner grabbing for open TCP ports.
//!
//! A banner is read over a fresh connection: connect, send a generic probe,
//! read once. Every step is bounded by the caller's timeout and any failure
//! simply yields no banner.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 1024;

/// Maximum characters kept from a decoded banner.
pub const MAX_BANNER_CHARS: usize = 200;

/// Probe sent to elicit a response from services that wait for the client.
const GENERIC_PROBE: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

/// Grab a banner from `addr` over a new connection.
///
/// Returns `None` if the connection, the read, or decoding yields nothing.
pub async fn grab_banner(addr: SocketAddr, io_timeout: Duration) -> Option<String> {
    let mut stream = match timeout(io_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "banner connect failed");
            return None;
        }
        Err(_) => {
            trace!(%addr, "banner connect timed out");
            return None;
        }
    };

    // Send failures are ignored; some services talk first anyway.
    let _ = timeout(io_timeout, stream.write_all(GENERIC_PROBE)).await;

    let mut buffer = vec![0u8; MAX_BANNER_SIZE];
    let banner = match timeout(io_timeout, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => decode_banner(&buffer[..n]),
        _ => None,
    };

    let _ = stream.shutdown().await;
    banner
}

/// Decode raw banner bytes: invalid UTF-8 is dropped, whitespace trimmed,
/// and the result capped at [`MAX_BANNER_CHARS`].
pub fn decode_banner(data: &[u8]) -> Option<String> {
    let decoded: String = String::from_utf8_lossy(data)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();

    let banner: String = decoded.trim().chars().take(MAX_BANNER_CHARS).collect();
    (!banner.is_empty()).then_some(banner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_decode_banner() {
        let data = b"SSH-2.0-OpenSSH_8.9\r\n";
        assert_eq!(decode_banner(data).as_deref(), Some("SSH-2.0-OpenSSH_8.9"));
    }

    #[test]
    fn test_decode_drops_invalid_bytes() {
        let data = b"\xffHello\xfe World\n";
        assert_eq!(decode_banner(data).as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_decode_empty_and_whitespace() {
        assert_eq!(decode_banner(b""), None);
        assert_eq!(decode_banner(b"  \r\n\t"), None);
        assert_eq!(decode_banner(b"\xff\xfe"), None);
    }

    #[test]
    fn test_decode_caps_length() {
        let data = vec![b'a'; 600];
        let banner = decode_banner(&data).unwrap();
        assert_eq!(banner.chars().count(), MAX_BANNER_CHARS);
    }

    #[tokio::test]
    async fn test_grab_banner_from_greeting_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 test FTP ready\r\n").await.unwrap();
            let mut probe = [0u8; 64];
            let _ = socket.read(&mut probe).await;
        });

        let banner = grab_banner(addr, Duration::from_secs(2)).await;
        assert_eq!(banner.as_deref(), Some("220 test FTP ready"));
    }

    #[tokio::test]
    async fn test_grab_banner_silent_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(socket);
        });

        let banner = grab_banner(addr, Duration::from_millis(100)).await;
        assert_eq!(banner, None);
    }
}
