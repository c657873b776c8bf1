//! Background token renewal.
//!
//! [`CredentialRenewer`] renews the client token in a loop. After a success it
//! sleeps for half the returned lease (clamped between `min_interval` and
//! `poll_interval`). After a failure it backs off exponentially and gives up
//! once `max_consecutive_failures` is reached, returning
//! [`VaultError::RenewalExhausted`] to whoever owns the task.

use crate::{
    error::{VaultError, VaultResult},
    provider::SecretBackend,
    secrets::RenewalResult,
    shutdown::ShutdownSignal,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vault_shim_common::{Backoff, BackoffConfig};

/// Renewer configuration.
#[derive(Debug, Clone)]
pub struct RenewerConfig {
    /// Longest sleep between renewals, also used when no lease is known
    pub poll_interval: Duration,
    /// Shortest sleep between renewals
    pub min_interval: Duration,
    /// Increment in seconds sent with each renewal; 0 uses the server default
    pub increment: u64,
    /// Failure backoff; `max_attempts` is the consecutive-failure bound
    pub backoff: BackoffConfig,
}

impl Default for RenewerConfig {
    fn default() -> Self {
        let poll_interval = Duration::from_secs(10);
        Self {
            poll_interval,
            min_interval: Duration::from_secs(1),
            increment: 0,
            backoff: BackoffConfig::default()
                .with_initial_delay(Duration::from_secs(1))
                .with_max_delay(poll_interval)
                .with_max_attempts(3),
        }
    }
}

impl RenewerConfig {
    /// Set the poll interval. The backoff cap follows it.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self.backoff.max_delay = interval;
        self
    }

    /// Set the minimum interval.
    #[must_use]
    pub const fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the renewal increment in seconds.
    #[must_use]
    pub const fn with_increment(mut self, seconds: u64) -> Self {
        self.increment = seconds;
        self
    }

    /// Set how many failures in a row stop the renewer.
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.backoff = self.backoff.with_max_attempts(failures);
        self
    }

    /// Replace the backoff settings.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sleep before the next renewal given the lease from the last success.
    #[must_use]
    pub fn wake_interval(&self, lease: Option<Duration>) -> Duration {
        match lease {
            Some(lease) if !lease.is_zero() => {
                (lease / 2).min(self.poll_interval).max(self.min_interval)
            }
            _ => self.poll_interval,
        }
    }

    /// Sleep before retrying after a failure, given the backoff delay.
    #[must_use]
    pub fn retry_interval(&self, backoff_delay: Duration) -> Duration {
        backoff_delay.min(self.poll_interval).max(self.min_interval)
    }
}

/// Lifecycle of a renewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewerState {
    /// Renewing
    Running,
    /// Cancelled or given up
    Stopped,
}

/// Result of one renewal attempt.
#[derive(Debug)]
pub enum RenewalOutcome {
    /// The token was renewed
    Success {
        /// Remaining lease
        lease_duration: Duration,
    },
    /// The renewal failed
    Failure {
        /// Why
        cause: VaultError,
    },
}

impl From<VaultResult<RenewalResult>> for RenewalOutcome {
    fn from(result: VaultResult<RenewalResult>) -> Self {
        match result {
            Ok(renewed) => Self::Success {
                lease_duration: renewed.lease_duration,
            },
            Err(cause) => Self::Failure { cause },
        }
    }
}

/// Token renewal loop.
pub struct CredentialRenewer<B> {
    backend: Arc<B>,
    config: RenewerConfig,
    backoff: Backoff,
    state: RenewerState,
}

impl<B: SecretBackend + 'static> CredentialRenewer<B> {
    /// Create a renewer. Nothing happens until [`run`](Self::run) or
    /// [`spawn`](Self::spawn).
    #[must_use]
    pub fn new(backend: Arc<B>, config: RenewerConfig) -> Self {
        let backoff = Backoff::new(config.backoff.clone());
        Self {
            backend,
            config,
            backoff,
            state: RenewerState::Running,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RenewerState {
        self.state
    }

    /// Failures since the last success.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.backoff.failures()
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RenewerConfig {
        &self.config
    }

    /// Run until `shutdown` fires or the failure bound is reached.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::RenewalExhausted`] after
    /// `max_consecutive_failures` failures in a row. Cancellation returns
    /// `Ok(())`.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> VaultResult<()> {
        self.state = RenewerState::Running;
        self.backoff.reset();
        info!(
            poll_secs = self.config.poll_interval.as_secs(),
            max_failures = self.config.backoff.max_attempts,
            "Token renewer started"
        );

        loop {
            if shutdown.is_shutdown() {
                self.stop();
                return Ok(());
            }

            let attempt = tokio::select! {
                biased;
                () = shutdown.recv() => None,
                result = self.renew_once() => Some(result),
            };
            let delay = match attempt {
                None => {
                    self.stop();
                    return Ok(());
                }
                Some(Ok(delay)) => delay,
                Some(Err(fatal)) => {
                    self.state = RenewerState::Stopped;
                    return Err(fatal);
                }
            };

            tokio::select! {
                biased;
                () = shutdown.recv() => {
                    self.stop();
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Run on a tokio task.
    pub fn spawn(mut self, shutdown: ShutdownSignal) -> JoinHandle<VaultResult<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// One renewal; returns the delay before the next one.
    async fn renew_once(&mut self) -> VaultResult<Duration> {
        let outcome = RenewalOutcome::from(self.backend.renew_credential(self.config.increment).await);

        match outcome {
            RenewalOutcome::Success { lease_duration } => {
                self.backoff.reset();
                let next = self.config.wake_interval(Some(lease_duration));
                info!(
                    remaining_secs = lease_duration.as_secs(),
                    next_renewal_secs = next.as_secs(),
                    "Vault token renewed"
                );
                Ok(next)
            }
            RenewalOutcome::Failure { cause } => match self.backoff.record_failure() {
                Some(delay) => {
                    let delay = self.config.retry_interval(delay);
                    warn!(
                        error = %cause,
                        attempt = self.backoff.failures(),
                        transient = cause.is_transient(),
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Vault token renewal failed, retrying"
                    );
                    Ok(delay)
                }
                None => {
                    let failures = self.backoff.failures();
                    error!(error = %cause, failures, "Vault token renewal failed, giving up");
                    Err(VaultError::RenewalExhausted {
                        failures,
                        last: Box::new(cause),
                    })
                }
            },
        }
    }

    fn stop(&mut self) {
        self.state = RenewerState::Stopped;
        info!("Token renewer stopped");
    }
}
