//! proxywarden/src/socks5.rs
//! C6: RFC 1928 subset SOCKS5 listener — greeting, no-auth, CONNECT only.
//! Grounded on `server.py`'s `ProxyServer._handle_client`, async-ified in the
//! teacher's accept-loop/per-connection-task style (`ffi.rs`'s
//! `proxy_start_listener`).

use crate::dialer;
use crate::error::WardenError;
use crate::pipe;
use crate::registry::UpstreamRegistry;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const REPLY_OK: [u8; 10] = [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
const REPLY_CMD_NOT_SUPPORTED: [u8; 10] = [0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
const REPLY_ATYP_NOT_SUPPORTED: [u8; 10] = [0x05, 0x08, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
const REPLY_GENERAL_FAILURE: [u8; 10] = [0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0];

/// Binds `127.0.0.1:port` and serves SOCKS5 clients until `shutdown` resolves.
/// The accept loop polls at 1s so a stop signal is observed promptly.
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
                        tracing::info!(error = %e, "socks5 client closed");
                    }
                });
            }
        }
    }
}

async fn handle_client(mut client: TcpStream, registry: Arc<UpstreamRegistry>) -> Result<(), WardenError> {
    let mut ver = [0u8; 1];
    client.read_exact(&mut ver).await?;
    if ver[0] != 0x05 {
        return Err(WardenError::Socks5("unsupported version".into()));
    }

    let mut nmethods = [0u8; 1];
    client.read_exact(&mut nmethods).await?;
    let mut methods = vec![0u8; nmethods[0] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[0x05, 0x00]).await?;

    let mut header = [0u8; 4];
    client.read_exact(&mut header).await?;
    let (_ver, cmd, _rsv, atyp) = (header[0], header[1], header[2], header[3]);

    if cmd != 0x01 {
        client.write_all(&REPLY_CMD_NOT_SUPPORTED).await?;
        return Err(WardenError::Socks5("unsupported command".into()));
    }

    let target_host = match atyp {
        0x01 => {
            let mut octets = [0u8; 4];
            client.read_exact(&mut octets).await?;
            Ipv4Addr::from(octets).to_string()
        }
        0x03 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut domain = vec![0u8; len[0] as usize];
            client.read_exact(&mut domain).await?;
            String::from_utf8(domain).map_err(|e| WardenError::Socks5(e.to_string()))?
        }
        _ => {
            client.write_all(&REPLY_ATYP_NOT_SUPPORTED).await?;
            return Err(WardenError::Socks5("unsupported address type".into()));
        }
    };

    let mut port_bytes = [0u8; 2];
    client.read_exact(&mut port_bytes).await?;
    let target_port = u16::from_be_bytes(port_bytes);

    match dialer::dial(&registry, &target_host, target_port).await {
        Ok(remote) => {
            client.write_all(&REPLY_OK).await?;
            pipe::copy_bidirectional(client, remote).await?;
            Ok(())
        }
        Err(e) => {
            client.write_all(&REPLY_GENERAL_FAILURE).await?;
            Err(e)
        }
    }
}
