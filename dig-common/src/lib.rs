//! # thedig common library
//!
//! Shared code for the thedig crates:
//! - Common error type
//! - TOML configuration loading and config-file resolution
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use config::TomlConfig;
pub use error::{Error, Result};
