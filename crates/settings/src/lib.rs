//! E2ELink Settings
//!
//! Settings file for the session and tunnel layers.
//!
//! ## Usage
//!
//! ```no_run
//! use e2elink_settings::Settings;
//!
//! // Load or create default settings
//! let settings = Settings::load_or_default()?;
//!
//! // Resolve the values the session and tunnel consume
//! let session = settings.session_config()?;
//! let tunnel = settings.tunnel_config()?;
//! # let _ = (session, tunnel);
//! # Ok::<(), e2elink_settings::SettingsError>(())
//! ```

mod config;

pub use config::{LogSettings, SessionSettings, Settings, TunnelSettings};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Invalid settings: {0}")]
    Invalid(#[from] e2elink_core::E2eError),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Get the default config directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("e2elink")
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}
