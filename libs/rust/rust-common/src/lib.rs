//! Shared helpers for the vault-shim crates.
//!
//! This crate provides:
//! - A platform error type for helper failures
//! - HTTP client configuration and building (rustls, timeouts, extra roots)
//! - Bounded exponential backoff for consecutive failures
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod error;
pub mod http;
pub mod tracing_config;

pub use backoff::{Backoff, BackoffConfig};
pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, try_init_tracing};
