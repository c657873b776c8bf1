//! KV v2 secret fetcher.

use crate::{error::VaultResult, provider::SecretBackend, secrets::SecretRecord};
use std::sync::Arc;
use tracing::instrument;

/// Reads secrets through a [`SecretBackend`] and returns them as JSON.
///
/// Stateless; one fetcher can serve concurrent callers.
pub struct SecretFetcher<B> {
    backend: Arc<B>,
}

impl<B> Clone for SecretFetcher<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: SecretBackend> SecretFetcher<B> {
    /// Create a fetcher over a shared backend.
    #[must_use]
    pub const fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Read `{mount}/data/{name}` into a [`SecretRecord`].
    ///
    /// # Errors
    ///
    /// Backend errors are returned unchanged; nothing is retried.
    #[instrument(skip(self))]
    pub async fn fetch_record(&self, mount: &str, name: &str) -> VaultResult<SecretRecord> {
        let raw = self.backend.read_secret(mount, name).await?;
        Ok(SecretRecord::from(raw))
    }

    /// Read `{mount}/data/{name}` and serialize it to a JSON string.
    ///
    /// The payload is serialized once and returned; it is never logged.
    ///
    /// # Errors
    ///
    /// Backend errors are returned unchanged;
    /// [`crate::VaultError::Serialization`] if encoding fails.
    pub async fn fetch(&self, mount: &str, name: &str) -> VaultResult<String> {
        self.fetch_record(mount, name).await?.to_json()
    }
}
