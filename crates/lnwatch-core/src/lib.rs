//! # lnwatch-core
//!
//! Core types, errors, and utilities shared by the lnwatch crates.
//!
//! This crate provides:
//! - [`WatchError`] - Error type for configuration, I/O and parsing failures
//! - [`logging`] - Tracing setup and log management utilities
//! - [`types`] - Alert data model shared between the alert source and the monitor
//!
//! ## Example
//!
//! ```no_run
//! use lnwatch_core::{WatchError, logging};
//!
//! fn main() -> lnwatch_core::Result<()> {
//!     // Initialize logging
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let config_path = std::path::Path::new("~/.lnwatch/config.yaml");
//!     if !config_path.exists() {
//!         return Err(WatchError::config_not_found(config_path));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export main types for convenience
pub use error::{Result, WatchError};
pub use logging::{LogGuard, init_logging};
pub use types::{Alert, AlertCount, Severity};
