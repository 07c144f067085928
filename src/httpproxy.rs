//! proxywarden/src/httpproxy.rs
//! C7: HTTP/1.1 CONNECT tunnel + absolute-URI plaintext forwarding. Grounded on
//! `server.py`'s `HTTPProxyServer._handle_client`/`_handle_connect`/`_handle_http`.
//! The plaintext forwarder intentionally does not rewrite absolute-URI to
//! origin-form (RFC 7230 §5.3.2) — documented non-conformance, see DESIGN.md.

use crate::dialer;
use crate::error::WardenError;
use crate::pipe;
use crate::registry::UpstreamRegistry;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAX_HEADER_BYTES: usize = 8192;

pub async fn serve(
    port: u16,
    registry: Arc<UpstreamRegistry>,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), WardenError> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(()),
            accepted = tokio::time::timeout(std::time::Duration::from_secs(1), listener.accept()) => {
                let Ok(accepted) = accepted else { continue };
                let (client, _peer) = accepted?;
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    if let Err(e) = handle_client(client, registry).await {
                        tracing::info!(error = %e, "http client closed");
                    }
                });
            }
        }
    }
}

/// Reads the request head (up to the blank line), capped at [`MAX_HEADER_BYTES`].
/// Returns the raw bytes read so the plaintext path can forward them verbatim.
async fn read_request_head(client: &mut TcpStream) -> Result<Vec<u8>, WardenError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if buf.len() >= MAX_HEADER_BYTES {
            return Err(WardenError::HttpProxy("request head too large".into()));
        }
        let n = client.read(&mut byte).await?;
        if n == 0 {
            return Err(WardenError::HttpProxy("client closed before request head".into()));
        }
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n\r\n") {
            return Ok(buf);
        }
    }
}

fn parse_request_line(head: &[u8]) -> Option<(String, String, String)> {
    let text = std::str::from_utf8(head).ok()?;
    let line = text.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_owned();
    let target = parts.next()?.to_owned();
    let version = parts.next()?.to_owned();
    Some((method, target, version))
}

async fn handle_client(mut client: TcpStream, registry: Arc<UpstreamRegistry>) -> Result<(), WardenError> {
    let head = read_request_head(&mut client).await?;
    let (method, target, _version) =
        parse_request_line(&head).ok_or_else(|| WardenError::HttpProxy("malformed request line".into()))?;

    if method.eq_ignore_ascii_case("CONNECT") {
        handle_connect(client, &target, registry).await
    } else {
        handle_absolute_uri(client, &target, &head, registry).await
    }
}

async fn handle_connect(mut client: TcpStream, target: &str, registry: Arc<UpstreamRegistry>) -> Result<(), WardenError> {
    let (host, port) = target
        .split_once(':')
        .ok_or_else(|| WardenError::HttpProxy("CONNECT target missing port".into()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| WardenError::HttpProxy("CONNECT target has invalid port".into()))?;

    match dialer::dial(&registry, host, port).await {
        Ok(remote) => {
            client
                .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                .await?;
            pipe::copy_bidirectional(client, remote).await?;
            Ok(())
        }
        Err(e) => {
            client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await?;
            Err(e)
        }
    }
}

async fn handle_absolute_uri(
    mut client: TcpStream,
    target: &str,
    head: &[u8],
    registry: Arc<UpstreamRegistry>,
) -> Result<(), WardenError> {
    let rest = target
        .split_once("://")
        .map(|(_, r)| r)
        .ok_or_else(|| WardenError::HttpProxy("target is not an absolute URI".into()))?;
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = match authority.split_once(':') {
        Some((h, p)) => (
            h,
            p.parse::<u16>()
                .map_err(|_| WardenError::HttpProxy("invalid port in absolute URI".into()))?,
        ),
        None => (authority, 80),
    };

    let mut remote = dialer::dial(&registry, host, port).await?;
    remote.write_all(head).await?;

    let mut buf = [0u8; 4096];
    loop {
        let n = remote.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        client.write_all(&buf[..n]).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_request_line() {
        let head = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
        let (method, target, version) = parse_request_line(head).unwrap();
        assert_eq!(method, "CONNECT");
        assert_eq!(target, "example.com:443");
        assert_eq!(version, "HTTP/1.1");
    }

    #[tokio::test]
    async fn connect_to_unresolvable_host_yields_502() {
        let registry = Arc::new(UpstreamRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (client, _) = listener.accept().await.unwrap();
            let _ = handle_client(client, registry).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"CONNECT 127.0.0.1:1 HTTP/1.1\r\nHost: 127.0.0.1:1\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"HTTP/1.1 502 Bad Gateway\r\n\r\n");
    }

    #[tokio::test]
    async fn absolute_uri_forwards_verbatim() {
        let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target_port = target_listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = target_listener.accept().await.unwrap();
            let mut buf = vec![0u8; 256];
            let n = sock.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("GET http://"));
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let registry = Arc::new(UpstreamRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (client, _) = listener.accept().await.unwrap();
            let _ = handle_client(client, registry).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let req = format!(
            "GET http://127.0.0.1:{target_port}/a HTTP/1.1\r\nHost: 127.0.0.1:{target_port}\r\n\r\n"
        );
        client.write_all(req.as_bytes()).await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200 OK"));
    }
}
