//! Shared test utilities for the vault-shim crates.
//!
//! This crate provides:
//! - A scripted [`SecretBackend`](vault_shim::SecretBackend) implementation
//! - Vault response bodies for HTTP-level tests
//! - Proptest generators for secret records and leases

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::MockBackend;
