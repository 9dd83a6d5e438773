//! E2ELink Core Types
//!
//! Shared vocabulary for the end-to-end tunneling crates: peer addresses,
//! session roles and states, configuration values and the error taxonomy.

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;
