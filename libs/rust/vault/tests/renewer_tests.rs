//! Token renewer tests on a paused clock.

use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use vault_shim::{CredentialRenewer, RenewerConfig, RenewerState, Shutdown, VaultError};
use vault_shim_common::BackoffConfig;
use vault_shim_test_utils::{
    MockBackend,
    mocks::{renewal_failed, renewed},
};

fn deterministic_config() -> RenewerConfig {
    RenewerConfig::default().with_backoff(
        BackoffConfig::default()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10))
            .with_max_attempts(3)
            .without_jitter(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_stops_after_third_consecutive_failure() {
    let backend = Arc::new(MockBackend::new().with_renewals([
        renewed(30),
        renewed(20),
        renewal_failed("connection reset"),
        renewal_failed("connection reset"),
        renewal_failed("connection reset"),
        renewal_failed("never reached"),
    ]));
    let shutdown = Shutdown::new();
    let mut renewer = CredentialRenewer::new(
        Arc::clone(&backend),
        RenewerConfig::default().with_max_consecutive_failures(3),
    );

    let err = renewer.run(shutdown.subscribe()).await.unwrap_err();

    match err {
        VaultError::RenewalExhausted { failures, last } => {
            assert_eq!(failures, 3);
            assert!(matches!(*last, VaultError::Auth(_)));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(renewer.state(), RenewerState::Stopped);
    assert_eq!(backend.renew_calls(), 5);
    assert_eq!(backend.pending_renewals().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let backend = Arc::new(
        MockBackend::new()
            .with_renewals([
                renewal_failed("blip"),
                renewal_failed("blip"),
                renewed(20),
                renewal_failed("blip"),
                renewal_failed("blip"),
            ])
            .repeating(Duration::from_secs(20)),
    );
    let shutdown = Shutdown::new();
    let handle =
        CredentialRenewer::new(Arc::clone(&backend), deterministic_config()).spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_secs(60)).await;
    shutdown.trigger();

    handle.await.unwrap().unwrap();
    assert!(backend.renew_calls() > 5);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_failures() {
    let backend = Arc::new(MockBackend::new());
    let shutdown = Shutdown::new();
    let mut renewer = CredentialRenewer::new(Arc::clone(&backend), deterministic_config());

    let started = Instant::now();
    let err = renewer.run(shutdown.subscribe()).await.unwrap_err();
    let elapsed = started.elapsed();

    // Attempts at 0s, 1s and 3s; the third failure ends the loop.
    assert!(matches!(err, VaultError::RenewalExhausted { failures: 3, .. }));
    assert_eq!(backend.renew_calls(), 3);
    assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_short_lease_paces_at_floor() {
    let backend = Arc::new(MockBackend::new().repeating(Duration::from_secs(2)));
    let shutdown = Shutdown::new();
    let handle = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default())
        .spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_millis(5500)).await;
    shutdown.trigger();
    handle.await.unwrap().unwrap();

    // Renewals at 0s, 1s, 2s, 3s, 4s and 5s.
    assert_eq!(backend.renew_calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_long_lease_paces_at_poll_interval() {
    let backend = Arc::new(MockBackend::new().repeating(Duration::from_secs(3600)));
    let shutdown = Shutdown::new();
    let handle = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default())
        .spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_secs(35)).await;
    shutdown.trigger();
    handle.await.unwrap().unwrap();

    // Renewals at 0s, 10s, 20s and 30s.
    assert_eq!(backend.renew_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_sleep_stops_within_floor() {
    let backend = Arc::new(MockBackend::new().repeating(Duration::from_secs(20)));
    let shutdown = Shutdown::new();
    let handle = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default())
        .spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let cancelled_at = Instant::now();
    shutdown.trigger();
    handle.await.unwrap().unwrap();

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(backend.renew_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_hung_renewal_returns_promptly() {
    let backend = Arc::new(
        MockBackend::new()
            .repeating(Duration::from_secs(20))
            .with_renew_delay(Duration::from_secs(60)),
    );
    let shutdown = Shutdown::new();
    let handle = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default())
        .spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let cancelled_at = Instant::now();
    shutdown.trigger();
    handle.await.unwrap().unwrap();

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(backend.renew_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_at_least_min_interval() {
    let backend = Arc::new(MockBackend::new());
    let shutdown = Shutdown::new();
    let config = RenewerConfig::default()
        .with_min_interval(Duration::from_secs(5))
        .with_backoff(
            BackoffConfig::default()
                .with_initial_delay(Duration::ZERO)
                .with_max_delay(Duration::from_secs(10))
                .with_max_attempts(3)
                .without_jitter(),
        );
    let mut renewer = CredentialRenewer::new(Arc::clone(&backend), config);

    let started = Instant::now();
    let err = renewer.run(shutdown.subscribe()).await.unwrap_err();
    let elapsed = started.elapsed();

    // Attempts at 0s, 5s and 10s.
    assert!(matches!(err, VaultError::RenewalExhausted { failures: 3, .. }));
    assert_eq!(backend.renew_calls(), 3);
    assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(10_100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_never_renews() {
    let backend = Arc::new(MockBackend::new().repeating(Duration::from_secs(20)));
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let mut renewer = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default());
    renewer.run(shutdown.subscribe()).await.unwrap();

    assert_eq!(renewer.state(), RenewerState::Stopped);
    assert_eq!(backend.renew_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_shutdown_owner_stops_renewer() {
    let backend = Arc::new(MockBackend::new().repeating(Duration::from_secs(20)));
    let shutdown = Shutdown::new();
    let handle = CredentialRenewer::new(Arc::clone(&backend), RenewerConfig::default())
        .spawn(shutdown.subscribe());

    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(shutdown);

    handle.await.unwrap().unwrap();
}
