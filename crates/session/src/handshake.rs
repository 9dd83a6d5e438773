//! Role handshake exchanged over the relayed stream
//!
//! Wire format of one frame:
//!
//! ```text
//! [magic "E2EL" (4)] [body length: u32 BE (4)] [bincode(HandshakeFrame)]
//! ```
//!
//! The initiator sends `Connect`; the acceptor answers `Accept` or `Reject`.
//! Frames are read with exact lengths so no payload bytes that follow the
//! handshake are consumed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use e2elink_core::{E2eError, Result};

/// Frame prefix
pub const HANDSHAKE_MAGIC: [u8; 4] = *b"E2EL";

/// Handshake protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 512;

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeFrame {
    Connect { version: u8 },
    Accept { version: u8 },
    Reject { reason: String },
}

impl HandshakeFrame {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| E2eError::HandshakeFailed(format!("encode: {}", e)))?;
        if body.len() > MAX_FRAME_LEN {
            return Err(E2eError::HandshakeFailed(format!(
                "frame of {} bytes exceeds {} byte limit",
                body.len(),
                MAX_FRAME_LEN
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.extend_from_slice(&HANDSHAKE_MAGIC);
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn kind(&self) -> &'static str {
        match self {
            HandshakeFrame::Connect { .. } => "connect",
            HandshakeFrame::Accept { .. } => "accept",
            HandshakeFrame::Reject { .. } => "reject",
        }
    }
}

/// Why a frame could not be read
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("stream closed")]
    Closed,

    #[error("{0}")]
    Io(E2eError),

    #[error("malformed frame: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Closed
        } else {
            FrameError::Io(E2eError::from_io(err))
        }
    }
}

pub async fn write_frame<W>(stream: &mut W, frame: &HandshakeFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode()?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(stream: &mut R) -> std::result::Result<HandshakeFrame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;

    if header[..4] != HANDSHAKE_MAGIC {
        return Err(FrameError::Malformed(format!(
            "bad magic {}",
            hex::encode(&header[..4])
        )));
    }

    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(FrameError::Malformed(format!("invalid frame length {}", len)));
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;

    bincode::deserialize(&body).map_err(|e| FrameError::Malformed(e.to_string()))
}

/// Initiator side: send `Connect` and wait for the answer
pub async fn initiate<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(
        stream,
        &HandshakeFrame::Connect {
            version: PROTOCOL_VERSION,
        },
    )
    .await?;
    debug!("Sent connect frame (v{})", PROTOCOL_VERSION);

    match read_frame(stream).await {
        Ok(HandshakeFrame::Accept { version }) if version == PROTOCOL_VERSION => Ok(()),
        Ok(HandshakeFrame::Accept { version }) => Err(E2eError::HandshakeFailed(format!(
            "peer accepted with protocol version {}",
            version
        ))),
        Ok(HandshakeFrame::Reject { reason }) => Err(E2eError::HandshakeFailed(reason)),
        Ok(other) => Err(E2eError::HandshakeFailed(format!(
            "unexpected {} frame from peer",
            other.kind()
        ))),
        Err(FrameError::Closed) => Err(E2eError::TransportClosed),
        Err(FrameError::Io(e)) => Err(e),
        Err(FrameError::Malformed(reason)) => Err(E2eError::HandshakeFailed(reason)),
    }
}

/// Acceptor side: wait for `Connect` and answer it
pub async fn accept<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match read_frame(stream).await {
        Ok(HandshakeFrame::Connect { version }) if version == PROTOCOL_VERSION => {
            write_frame(
                stream,
                &HandshakeFrame::Accept {
                    version: PROTOCOL_VERSION,
                },
            )
            .await?;
            debug!("Accepted connect frame (v{})", version);
            Ok(())
        }
        Ok(HandshakeFrame::Connect { version }) => {
            let reason = format!("unsupported protocol version {}", version);
            reject(stream, &reason).await;
            Err(E2eError::HandshakeFailed(reason))
        }
        Ok(other) => Err(E2eError::ProtocolViolation(format!(
            "expected connect frame, got {}",
            other.kind()
        ))),
        Err(FrameError::Malformed(reason)) => {
            reject(stream, "malformed connect frame").await;
            Err(E2eError::ProtocolViolation(reason))
        }
        Err(FrameError::Closed) => Err(E2eError::TransportClosed),
        Err(FrameError::Io(e)) => Err(e),
    }
}

/// Best-effort rejection; the caller is already failing
async fn reject<W>(stream: &mut W, reason: &str)
where
    W: AsyncWrite + Unpin,
{
    let frame = HandshakeFrame::Reject {
        reason: reason.to_string(),
    };
    if let Err(e) = write_frame(stream, &frame).await {
        warn!("Failed to send reject frame: {}", e);
    }
}
