//! Pump between a session's local pipe end and its relayed stream

use tokio::io::{AsyncRead, AsyncWrite};

use e2elink_core::Result;
use e2elink_tunnel::{pump, PumpLimits, WriteMode};

/// Which bridge leg stopped first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Leg {
    LocalToRemote,
    RemoteToLocal,
}

/// Run both legs until either one terminates.
///
/// Partial writes are backpressure from a full pipe, not a fault, so each
/// leg drains every chunk it reads. The circuit is unusable once one leg is
/// gone, so the other leg is dropped together with its stream halves.
pub(crate) async fn run<Remote, Local>(
    remote: Remote,
    local_conn: Local,
    limits: PumpLimits,
) -> (Leg, Result<u64>)
where
    Remote: AsyncRead + AsyncWrite,
    Local: AsyncRead + AsyncWrite,
{
    let (remote_read, remote_write) = tokio::io::split(remote);
    let (local_read, local_write) = tokio::io::split(local_conn);
    let limits = limits.with_write_mode(WriteMode::All);

    tokio::select! {
        res = pump(local_read, remote_write, limits) => (Leg::LocalToRemote, res),
        res = pump(remote_read, local_write, limits) => (Leg::RemoteToLocal, res),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bridge_forwards_both_ways() {
        let (mut peer, remote) = tokio::io::duplex(4096);
        let (mut app, local_conn) = tokio::io::duplex(4096);
        let task = tokio::spawn(run(remote, local_conn, PumpLimits::unbounded(64)));

        app.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        app.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(peer);
        let (leg, result) = task.await.unwrap();
        assert_eq!(leg, Leg::RemoteToLocal);
        assert_eq!(result.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_bridge_survives_full_local_pipe() {
        let (mut peer, remote) = tokio::io::duplex(64 * 1024);
        // Pipe smaller than a chunk and not a multiple of the writes below
        let (mut app, local_conn) = tokio::io::duplex(700);
        let task = tokio::spawn(run(remote, local_conn, PumpLimits::unbounded(1024)));

        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 241) as u8).collect();
        peer.write_all(&payload).await.unwrap();

        // The app only starts reading once the pipe has long been full
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        let mut received = vec![0u8; payload.len()];
        app.read_exact(&mut received).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bridge_idle_read_timeout() {
        let (_peer, remote) = tokio::io::duplex(4096);
        let (_app, local_conn) = tokio::io::duplex(4096);
        let limits = PumpLimits::new(64, Duration::from_secs(2), Duration::from_secs(2));

        let (_, result) = run(remote, local_conn, limits).await;
        assert!(result.unwrap_err().is_timeout());
    }
}
