//! Backend seam used by the fetcher and the renewer.

use crate::{
    error::VaultResult,
    secrets::{RawSecret, RenewalResult},
};
use async_trait::async_trait;

/// The two backend calls this crate needs.
///
/// [`crate::VaultClient`] talks to a real Vault server; tests plug in
/// scripted implementations.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Read `{mount}/data/{name}` from a KV v2 engine.
    async fn read_secret(&self, mount: &str, name: &str) -> VaultResult<RawSecret>;

    /// Renew the held token. An increment of 0 asks for the server default.
    async fn renew_credential(&self, increment: u64) -> VaultResult<RenewalResult>;
}
