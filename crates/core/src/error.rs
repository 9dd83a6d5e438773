use std::io;

use thiserror::Error;

use crate::SessionState;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid session state: {0:?}")]
    InvalidState(SessionState),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl E2eError {
    /// Classify an I/O failure from an underlying stream.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => E2eError::TransportClosed,
            io::ErrorKind::TimedOut => E2eError::Timeout,
            _ => E2eError::TransportError(err.to_string()),
        }
    }

    /// Short-write failure for a copy direction
    pub fn truncated_write(expected: usize, written: usize) -> Self {
        E2eError::TransportError(format!(
            "truncated write: wrote {} of {} bytes",
            written, expected
        ))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout)
    }
}

impl From<io::Error> for E2eError {
    fn from(err: io::Error) -> Self {
        E2eError::from_io(err)
    }
}

pub type Result<T> = std::result::Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_handshake_failed() {
        let err = E2eError::HandshakeFailed("rejected by peer".to_string());
        assert_eq!(err.to_string(), "Handshake failed: rejected by peer");
    }

    #[test]
    fn test_error_display_timeout() {
        assert_eq!(E2eError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn test_error_display_protocol_violation() {
        let err = E2eError::ProtocolViolation("bad magic".to_string());
        assert_eq!(err.to_string(), "Protocol violation: bad magic");
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = E2eError::InvalidState(SessionState::Connected);
        assert_eq!(err.to_string(), "Invalid session state: Connected");
    }

    #[test]
    fn test_truncated_write_message() {
        let err = E2eError::truncated_write(256, 100);
        match err {
            E2eError::TransportError(msg) => {
                assert!(msg.contains("truncated write"));
                assert!(msg.contains("100 of 256"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_io_closed_kinds() {
        for kind in [
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionReset,
        ] {
            let err = E2eError::from_io(io::Error::new(kind, "gone"));
            assert!(matches!(err, E2eError::TransportClosed), "{:?}", kind);
        }
    }

    #[test]
    fn test_from_io_timed_out() {
        let err: E2eError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_from_io_other() {
        let err = E2eError::from_io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(matches!(err, E2eError::TransportError(ref msg) if msg == "boom"));
    }
}
