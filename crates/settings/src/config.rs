//! Configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use e2elink_core::{
    IdlePolicy, SessionConfig, TunnelConfig, DEFAULT_CHUNK_SIZE, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_PIPE_CAPACITY, DEFAULT_TUNNEL_TIMEOUT,
};

use crate::{default_settings_path, Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// End-to-end session settings
    #[serde(default)]
    pub session: SessionSettings,

    /// Tunnel (copy engine) settings
    #[serde(default)]
    pub tunnel: TunnelSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LogSettings,

    /// Custom settings file path (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the default path, or create defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
            let settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            info!("Loaded settings from {:?}", path);
            settings
        } else {
            Self::default()
        };
        settings.config_path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Save settings to the configured path
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.clone().unwrap_or_else(default_settings_path);
        self.save_to(&path)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Resolved session parameters
    pub fn session_config(&self) -> Result<SessionConfig> {
        let config = SessionConfig {
            idle_timeout: Duration::from_millis(self.session.idle_timeout_ms),
            idle_policy: self.session.idle_policy,
            chunk_size: self.tunnel.chunk_size,
            pipe_capacity: self.session.pipe_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolved tunnel parameters
    pub fn tunnel_config(&self) -> Result<TunnelConfig> {
        let config = TunnelConfig {
            left_timeout: Duration::from_millis(self.tunnel.left_timeout_ms),
            right_timeout: Duration::from_millis(self.tunnel.right_timeout_ms),
            chunk_size: self.tunnel.chunk_size,
        };
        config.validate()?;
        Ok(config)
    }
}

/// End-to-end session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Idle timeout in milliseconds
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Whether the idle timeout also applies after connect
    #[serde(default)]
    pub idle_policy: IdlePolicy,

    /// Capacity of the local pipe in bytes
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,
}

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT.as_millis() as u64
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            idle_policy: IdlePolicy::default(),
            pipe_capacity: default_pipe_capacity(),
        }
    }
}

/// Tunnel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelSettings {
    /// Transfer chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Read/write timeout for the local side, in milliseconds
    #[serde(default = "default_tunnel_timeout_ms")]
    pub left_timeout_ms: u64,

    /// Read/write timeout for the remote side, in milliseconds
    #[serde(default = "default_tunnel_timeout_ms")]
    pub right_timeout_ms: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_tunnel_timeout_ms() -> u64 {
    DEFAULT_TUNNEL_TIMEOUT.as_millis() as u64
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            left_timeout_ms: default_tunnel_timeout_ms(),
            right_timeout_ms: default_tunnel_timeout_ms(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    /// Verbose output for e2elink crates
    #[serde(default)]
    pub debug: bool,

    /// Explicit filter directive (e.g. "info,e2elink_session=trace")
    #[serde(default)]
    pub filter: Option<String>,
}
