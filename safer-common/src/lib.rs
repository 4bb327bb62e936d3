//! Common utilities shared across the SAFER lookup crates.
//!
//! At the moment this is the logging setup every binary and integration test
//! goes through. It stays dependency-light so the driver, lookup and config
//! crates can all depend on it.
//!
//! - [`observability`]: centralised `tracing` initialisation
//!
//! ```rust
//! use safer_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "safer");
//! ```
pub mod observability;
