//! Single-direction copy loop

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use e2elink_core::{E2eError, Result};

/// How a chunk is handed to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// One write per chunk; accepting fewer bytes fails the direction
    #[default]
    Single,
    /// Keep writing until the chunk is drained; only a zero-length write fails
    All,
}

/// Limits applied to one copy direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpLimits {
    /// Buffer size; no single read or write exceeds it
    pub chunk_size: usize,
    /// Bound on each read from the source (`None` waits indefinitely)
    pub read_timeout: Option<Duration>,
    /// Bound on each write to the destination (`None` waits indefinitely)
    pub write_timeout: Option<Duration>,
    pub write_mode: WriteMode,
}

impl PumpLimits {
    pub fn new(chunk_size: usize, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            chunk_size,
            read_timeout: Some(read_timeout),
            write_timeout: Some(write_timeout),
            write_mode: WriteMode::Single,
        }
    }

    /// Limits without deadlines
    pub fn unbounded(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            read_timeout: None,
            write_timeout: None,
            write_mode: WriteMode::Single,
        }
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }
}

async fn with_deadline<T, F>(limit: Option<Duration>, op: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| E2eError::Timeout)?
            .map_err(E2eError::from_io),
        None => op.await.map_err(E2eError::from_io),
    }
}

/// Copy bytes from `src` to `dst` until `src` reaches EOF.
///
/// Under [`WriteMode::Single`] every read is followed by a single write of
/// exactly the bytes read, and a write that accepts fewer bytes fails the
/// direction. [`WriteMode::All`] retries partial writes, each bounded by the
/// write timeout. Returns the number of bytes forwarded on clean EOF.
pub async fn pump<R, W>(mut src: R, mut dst: W, limits: PumpLimits) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if limits.chunk_size == 0 {
        return Err(E2eError::InvalidConfiguration(
            "chunk size must be positive".to_string(),
        ));
    }

    let mut buf = vec![0u8; limits.chunk_size];
    let mut forwarded = 0u64;

    loop {
        let n = with_deadline(limits.read_timeout, src.read(&mut buf)).await?;
        if n == 0 {
            return Ok(forwarded);
        }

        match limits.write_mode {
            WriteMode::Single => {
                let written = with_deadline(limits.write_timeout, dst.write(&buf[..n])).await?;
                if written != n {
                    return Err(E2eError::truncated_write(n, written));
                }
            }
            WriteMode::All => {
                let mut written = 0;
                while written < n {
                    let w =
                        with_deadline(limits.write_timeout, dst.write(&buf[written..n])).await?;
                    if w == 0 {
                        return Err(E2eError::truncated_write(n, written));
                    }
                    written += w;
                }
            }
        }
        with_deadline(limits.write_timeout, dst.flush()).await?;

        forwarded += n as u64;
    }
}
