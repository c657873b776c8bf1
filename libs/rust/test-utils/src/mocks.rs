//! Scripted backend for testing.

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::Mutex;
use vault_shim::{RawSecret, RenewalResult, SecretBackend, VaultError, VaultResult};

/// Backend that replays queued outcomes in order.
///
/// When the renewal queue runs dry it either keeps succeeding with
/// `repeat_lease` or fails with an auth error. An empty read queue yields a
/// 404 backend error.
#[derive(Debug, Default)]
pub struct MockBackend {
    reads: Mutex<VecDeque<VaultResult<RawSecret>>>,
    renewals: Mutex<VecDeque<VaultResult<RenewalResult>>>,
    repeat_lease: Option<Duration>,
    renew_delay: Duration,
    read_paths: Mutex<Vec<String>>,
    read_calls: AtomicUsize,
    renew_calls: AtomicUsize,
}

impl MockBackend {
    /// Create a backend with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a read result.
    #[must_use]
    pub fn with_read(mut self, result: VaultResult<RawSecret>) -> Self {
        self.reads.get_mut().push_back(result);
        self
    }

    /// Queue renewal results.
    #[must_use]
    pub fn with_renewals(
        mut self,
        results: impl IntoIterator<Item = VaultResult<RenewalResult>>,
    ) -> Self {
        self.renewals.get_mut().extend(results);
        self
    }

    /// Keep renewing successfully with this lease once the queue is empty.
    #[must_use]
    pub fn repeating(mut self, lease: Duration) -> Self {
        self.repeat_lease = Some(lease);
        self
    }

    /// Delay every renewal by this long, like an unresponsive server.
    #[must_use]
    pub fn with_renew_delay(mut self, delay: Duration) -> Self {
        self.renew_delay = delay;
        self
    }

    /// Number of `read_secret` calls.
    #[must_use]
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of `renew_credential` calls.
    #[must_use]
    pub fn renew_calls(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }

    /// Renewal outcomes not consumed yet.
    pub async fn pending_renewals(&self) -> usize {
        self.renewals.lock().await.len()
    }

    /// `mount/name` pairs read so far.
    pub async fn read_paths(&self) -> Vec<String> {
        self.read_paths.lock().await.clone()
    }
}

/// Successful renewal with the given lease in seconds.
#[must_use]
pub const fn renewed(lease_secs: u64) -> VaultResult<RenewalResult> {
    Ok(RenewalResult {
        lease_duration: Duration::from_secs(lease_secs),
        renewable: true,
    })
}

/// Failed renewal.
#[must_use]
pub fn renewal_failed(message: &str) -> VaultResult<RenewalResult> {
    Err(VaultError::auth(message))
}

#[async_trait]
impl SecretBackend for MockBackend {
    async fn read_secret(&self, mount: &str, name: &str) -> VaultResult<RawSecret> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.read_paths.lock().await.push(format!("{mount}/{name}"));
        self.reads
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(VaultError::backend(404, "no scripted secret")))
    }

    async fn renew_credential(&self, _increment: u64) -> VaultResult<RenewalResult> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        if !self.renew_delay.is_zero() {
            tokio::time::sleep(self.renew_delay).await;
        }
        if let Some(next) = self.renewals.lock().await.pop_front() {
            return next;
        }
        match self.repeat_lease {
            Some(lease) => Ok(RenewalResult {
                lease_duration: lease,
                renewable: true,
            }),
            None => Err(VaultError::auth("no scripted renewal")),
        }
    }
}
