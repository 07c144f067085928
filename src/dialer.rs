//! proxywarden/src/dialer.rs
//! C8: upstream dialer. Given a target (host, port), reads the current
//! [`UpstreamRegistry`] value once and yields a ready-to-pipe socket, either
//! direct, via a SOCKS5 upstream, or via an HTTP(S) CONNECT upstream. Hand-rolled
//! rather than delegated to `tokio-socks` (see DESIGN.md), matching the
//! teacher's habit of hand-rolling its own wire format in `protocol.rs`.
//! Grounded on `server.py`'s `_connect_direct`/`_connect_via_socks5`/`_connect_via_http`.

use crate::error::WardenError;
use crate::registry::UpstreamRegistry;
use crate::types::Scheme;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn dial(
    registry: &UpstreamRegistry,
    target_host: &str,
    target_port: u16,
) -> Result<TcpStream, WardenError> {
    match registry.read() {
        None => dial_direct(target_host, target_port).await,
        Some(upstream) => match upstream.scheme {
            Scheme::Socks5 => dial_via_socks5(&upstream.host, upstream.port, target_host, target_port).await,
            Scheme::Http | Scheme::Https => {
                dial_via_http_connect(&upstream.host, upstream.port, target_host, target_port).await
            }
        },
    }
}

async fn connect_with_timeout(host: &str, port: u16) -> Result<TcpStream, WardenError> {
    tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .map_err(|_| WardenError::Probe(format!("connect to {host}:{port} timed out")))?
        .map_err(WardenError::Io)
}

async fn dial_direct(target_host: &str, target_port: u16) -> Result<TcpStream, WardenError> {
    connect_with_timeout(target_host, target_port).await
}

async fn dial_via_socks5(
    upstream_host: &str,
    upstream_port: u16,
    target_host: &str,
    target_port: u16,
) -> Result<TcpStream, WardenError> {
    let mut stream = connect_with_timeout(upstream_host, upstream_port).await?;

    stream.write_all(&[0x05, 0x01, 0x00]).await?;
    let mut greeting_reply = [0u8; 2];
    stream.read_exact(&mut greeting_reply).await?;
    if greeting_reply != [0x05, 0x00] {
        return Err(WardenError::Dial("upstream rejected no-auth".into()));
    }

    let mut request = vec![0x05, 0x01, 0x00];
    if let Ok(ipv4) = target_host.parse::<Ipv4Addr>() {
        request.push(0x01);
        request.extend_from_slice(&ipv4.octets());
    } else {
        request.push(0x03);
        request.push(target_host.len() as u8);
        request.extend_from_slice(target_host.as_bytes());
    }
    request.extend_from_slice(&target_port.to_be_bytes());
    stream.write_all(&request).await?;

    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await?;
    if reply[1] != 0x00 {
        return Err(WardenError::Dial(format!(
            "upstream dial failed with reply code {}",
            reply[1]
        )));
    }
    Ok(stream)
}

async fn dial_via_http_connect(
    upstream_host: &str,
    upstream_port: u16,
    target_host: &str,
    target_port: u16,
) -> Result<TcpStream, WardenError> {
    let mut stream = connect_with_timeout(upstream_host, upstream_port).await?;

    let request = format!(
        "CONNECT {target_host}:{target_port} HTTP/1.1\r\nHost: {target_host}:{target_port}\r\nConnection: keep-alive\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf[..n]);
    let first_line = response.lines().next().unwrap_or_default();
    if first_line.contains("200") {
        Ok(stream)
    } else {
        Err(WardenError::Dial(format!(
            "upstream CONNECT rejected: {first_line}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn direct_dial_succeeds_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        let stream = dial_direct("127.0.0.1", addr.port()).await;
        assert!(stream.is_ok());
    }

    #[tokio::test]
    async fn socks5_dial_fails_on_non_zero_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut greeting = [0u8; 3];
            sock.read_exact(&mut greeting).await.unwrap();
            sock.write_all(&[0x05, 0x00]).await.unwrap();
            let mut req = vec![0u8; 3];
            sock.read_exact(&mut req).await.unwrap();
            let mut atyp = [0u8; 1];
            sock.read_exact(&mut atyp).await.unwrap();
            let mut ip = [0u8; 4];
            sock.read_exact(&mut ip).await.unwrap();
            let mut port = [0u8; 2];
            sock.read_exact(&mut port).await.unwrap();
            sock.write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
        });
        let result = dial_via_socks5("127.0.0.1", addr.port(), "127.0.0.1", 80).await;
        assert!(result.is_err());
    }
}
