//! proxywarden/src/pipe.rs
//! C5: bidirectional byte pump between two sockets. Generalized from the
//! teacher's `copy_bidirectional_with_metrics` in `connection.rs` — same
//! biased-select, 4 KiB chunk, write-all, FIN/error-terminates shape, but
//! returning a plain byte-count pair instead of writing into global metrics.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK: usize = 4096;
const POLL_TICK: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct PipeStats {
    pub a_to_b: u64,
    pub b_to_a: u64,
}

/// Pumps bytes between `a` and `b` until either side hits EOF or an error.
/// Both halves are driven concurrently; a zero-length read (FIN) on either
/// side ends the whole pipe.
pub async fn copy_bidirectional<A, B>(mut a: A, mut b: B) -> io::Result<PipeStats>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf_a = vec![0u8; CHUNK];
    let mut buf_b = vec![0u8; CHUNK];
    let mut stats = PipeStats::default();
    let mut ticker = tokio::time::interval(POLL_TICK);

    loop {
        tokio::select! {
            biased;

            result = a.read(&mut buf_a) => {
                match result {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if b.write_all(&buf_a[..n]).await.is_err() {
                            break;
                        }
                        stats.a_to_b += n as u64;
                    }
                }
            }

            result = b.read(&mut buf_b) => {
                match result {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if a.write_all(&buf_b[..n]).await.is_err() {
                            break;
                        }
                        stats.b_to_a += n as u64;
                    }
                }
            }

            _ = ticker.tick() => {}
        }
    }

    let _ = a.shutdown().await;
    let _ = b.shutdown().await;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn echoes_bytes_both_directions() {
        let (mut client_a, server_a) = duplex(64);
        let (mut client_b, server_b) = duplex(64);

        let pipe = tokio::spawn(copy_bidirectional(server_a, server_b));

        client_a.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        client_b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        client_b.write_all(b"world").await.unwrap();
        let mut buf = [0u8; 5];
        client_a.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"world");

        drop(client_a);
        drop(client_b);
        let stats = pipe.await.unwrap().unwrap();
        assert_eq!(stats.a_to_b, 5);
        assert_eq!(stats.b_to_a, 5);
    }
}
