//! Bidirectional tunnel between two duplex streams

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use e2elink_core::{E2eError, Result, TunnelConfig};

use crate::pump::{pump, PumpLimits};

static NEXT_TUNNEL_ID: AtomicU64 = AtomicU64::new(1);

/// One of the two copy directions of a tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LeftToRight => f.write_str("left->right"),
            Direction::RightToLeft => f.write_str("right->left"),
        }
    }
}

/// Byte pump wiring two duplex streams.
///
/// `left_timeout` bounds every read from and write to `left`, likewise for
/// `right`. The tunnel never shuts either stream down or drops it: both
/// endpoints are handed back through [`TunnelHandle::join`] so the caller
/// decides what happens to them.
pub struct Tunnel<L, R> {
    id: u64,
    left: L,
    right: R,
    left_timeout: Duration,
    right_timeout: Duration,
    chunk_size: usize,
}

impl<L, R> Tunnel<L, R>
where
    L: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        left: L,
        right: R,
        left_timeout: Duration,
        right_timeout: Duration,
        chunk_size: usize,
    ) -> Result<Self> {
        TunnelConfig {
            left_timeout,
            right_timeout,
            chunk_size,
        }
        .validate()?;

        Ok(Self {
            id: NEXT_TUNNEL_ID.fetch_add(1, Ordering::Relaxed),
            left,
            right,
            left_timeout,
            right_timeout,
            chunk_size,
        })
    }

    pub fn from_config(left: L, right: R, config: &TunnelConfig) -> Result<Self> {
        Self::new(
            left,
            right,
            config.left_timeout,
            config.right_timeout,
            config.chunk_size,
        )
    }

    /// Process-unique id used in log lines
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Start both copy directions and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn copy(self) -> TunnelHandle<L, R> {
        let (left_read, left_write) = tokio::io::split(self.left);
        let (right_read, right_write) = tokio::io::split(self.right);

        let to_right = PumpLimits::new(self.chunk_size, self.left_timeout, self.right_timeout);
        let to_left = PumpLimits::new(self.chunk_size, self.right_timeout, self.left_timeout);

        debug!(
            "Tunnel {} started (chunk {} bytes, timeouts {:?}/{:?})",
            self.id, self.chunk_size, self.left_timeout, self.right_timeout
        );

        let left_to_right = tokio::spawn(run_direction(
            self.id,
            Direction::LeftToRight,
            left_read,
            right_write,
            to_right,
        ));
        let right_to_left = tokio::spawn(run_direction(
            self.id,
            Direction::RightToLeft,
            right_read,
            left_write,
            to_left,
        ));

        TunnelHandle {
            id: self.id,
            left_to_right,
            right_to_left,
        }
    }
}

/// One finished copy direction together with the stream halves it used
pub struct DirectionEnd<Src, Dst> {
    pub direction: Direction,
    /// Bytes forwarded, or the error that stopped the direction
    pub result: Result<u64>,
    pub src: ReadHalf<Src>,
    pub dst: WriteHalf<Dst>,
}

impl<Src, Dst> fmt::Debug for DirectionEnd<Src, Dst> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectionEnd")
            .field("direction", &self.direction)
            .field("result", &self.result)
            .finish()
    }
}

async fn run_direction<Src, Dst>(
    id: u64,
    direction: Direction,
    mut src: ReadHalf<Src>,
    mut dst: WriteHalf<Dst>,
    limits: PumpLimits,
) -> DirectionEnd<Src, Dst>
where
    Src: AsyncRead,
    Dst: AsyncWrite,
{
    let result = pump(&mut src, &mut dst, limits).await;
    match &result {
        Ok(bytes) => debug!("Tunnel {} {} reached EOF after {} bytes", id, direction, bytes),
        Err(E2eError::Timeout) => debug!("Tunnel {} {} timed out", id, direction),
        Err(e) => warn!("Tunnel {} {} failed: {}", id, direction, e),
    }
    DirectionEnd {
        direction,
        result,
        src,
        dst,
    }
}

/// Final result of both directions plus the endpoints handed back.
///
/// An endpoint is `None` when one of its direction tasks was aborted or
/// panicked, in which case its halves are already gone.
pub struct TunnelOutcome<L, R> {
    pub left_to_right: Result<u64>,
    pub right_to_left: Result<u64>,
    pub left: Option<L>,
    pub right: Option<R>,
}

impl<L, R> fmt::Debug for TunnelOutcome<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelOutcome")
            .field("left_to_right", &self.left_to_right)
            .field("right_to_left", &self.right_to_left)
            .field("left_returned", &self.left.is_some())
            .field("right_returned", &self.right.is_some())
            .finish()
    }
}

type DirectionTask<Src, Dst> = JoinHandle<DirectionEnd<Src, Dst>>;

/// Handles to the two copy tasks of a running tunnel.
///
/// Dropping the handle detaches the tasks; they keep forwarding until they
/// terminate on their own, and the endpoints are dropped with them.
pub struct TunnelHandle<L, R> {
    id: u64,
    left_to_right: DirectionTask<L, R>,
    right_to_left: DirectionTask<R, L>,
}

impl<L, R> TunnelHandle<L, R>
where
    L: Unpin,
    R: Unpin,
{
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once both directions have terminated
    pub fn is_finished(&self) -> bool {
        self.left_to_right.is_finished() && self.right_to_left.is_finished()
    }

    /// Cancel both directions
    pub fn abort(&self) {
        self.left_to_right.abort();
        self.right_to_left.abort();
    }

    /// Wait for both directions to terminate and take the endpoints back
    pub async fn join(self) -> TunnelOutcome<L, R> {
        let (left_to_right, right_to_left) = tokio::join!(self.left_to_right, self.right_to_left);
        match (left_to_right, right_to_left) {
            (Ok(to_right), Ok(to_left)) => TunnelOutcome {
                left_to_right: to_right.result,
                right_to_left: to_left.result,
                left: Some(to_right.src.unsplit(to_left.dst)),
                right: Some(to_left.src.unsplit(to_right.dst)),
            },
            (to_right, to_left) => TunnelOutcome {
                left_to_right: flatten(to_right),
                right_to_left: flatten(to_left),
                left: None,
                right: None,
            },
        }
    }

    /// Split into per-direction task handles for independent observation
    pub fn into_parts(self) -> (DirectionTask<L, R>, DirectionTask<R, L>) {
        (self.left_to_right, self.right_to_left)
    }
}

fn flatten<Src, Dst>(joined: std::result::Result<DirectionEnd<Src, Dst>, JoinError>) -> Result<u64> {
    match joined {
        Ok(end) => end.result,
        Err(e) if e.is_cancelled() => Err(E2eError::TransportError("copy task aborted".to_string())),
        Err(e) => Err(E2eError::TransportError(format!("copy task panicked: {}", e))),
    }
}
