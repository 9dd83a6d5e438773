//! Resolved configuration values
//!
//! These are the already-parsed values the session and tunnel consume. File
//! handling lives in `e2elink-settings`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{E2eError, Result};

/// Default copy granularity in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default capacity of the in-memory pipe behind a session's local endpoint
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// Default idle timeout for sessions (15 seconds)
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Default per-side read/write timeout for tunnels (15 seconds)
pub const DEFAULT_TUNNEL_TIMEOUT: Duration = Duration::from_secs(15);

/// How a session applies its idle timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Idle timeout bounds the connect/accept wait only
    #[default]
    ConnectOnly,
    /// Idle timeout also tears down an established session whose data path
    /// has been silent for that long
    Enforce,
}

/// Session parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub idle_policy: IdlePolicy,
    /// Chunk size of the bridge between the local pipe and the remote stream
    pub chunk_size: usize,
    pub pipe_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_policy: IdlePolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            return Err(E2eError::InvalidConfiguration(
                "idle timeout must be positive".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(E2eError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.pipe_capacity < self.chunk_size {
            return Err(E2eError::InvalidConfiguration(format!(
                "pipe capacity {} is smaller than chunk size {}",
                self.pipe_capacity, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Tunnel parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    pub left_timeout: Duration,
    pub right_timeout: Duration,
    pub chunk_size: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            left_timeout: DEFAULT_TUNNEL_TIMEOUT,
            right_timeout: DEFAULT_TUNNEL_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TunnelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(E2eError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.left_timeout.is_zero() || self.right_timeout.is_zero() {
            return Err(E2eError::InvalidConfiguration(
                "tunnel timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
