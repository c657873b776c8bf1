//! HashiCorp Vault client shim.
//!
//! Two independent pieces built on one client handle:
//! - [`SecretFetcher`] reads a KV v2 secret and serializes it to JSON.
//! - [`CredentialRenewer`] keeps the client token alive in the background,
//!   backing off on failures and handing a fatal error back to its owner
//!   instead of exiting the process.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vault_shim::{CredentialRenewer, RenewerConfig, SecretFetcher, Shutdown, VaultClient, VaultConfig};
//!
//! # async fn demo() -> vault_shim::VaultResult<()> {
//! let client = Arc::new(VaultClient::new(VaultConfig::from_env()?)?);
//!
//! let shutdown = Shutdown::new();
//! let renewer = CredentialRenewer::new(Arc::clone(&client), RenewerConfig::default())
//!     .spawn(shutdown.subscribe());
//!
//! let json = SecretFetcher::new(client).fetch("secret", "payments/api").await?;
//! println!("{json}");
//!
//! shutdown.trigger();
//! let _ = renewer.await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod renewer;
pub mod secrets;
pub mod shutdown;

pub use client::VaultClient;
pub use config::{TlsConfig, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use fetcher::SecretFetcher;
pub use provider::SecretBackend;
pub use renewer::{CredentialRenewer, RenewalOutcome, RenewerConfig, RenewerState};
pub use secrets::{Credential, RawSecret, RenewalResult, SecretRecord};
pub use shutdown::{Shutdown, ShutdownSignal};
