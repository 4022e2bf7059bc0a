//! # collink common library
//!
//! Shared code for the collink crates:
//! - Error type
//! - TOML configuration loading and defaults
//! - User-agent construction for outbound HTTP clients
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
