//! HTTP client configuration and building.
//!
//! Every outgoing call to the secrets backend goes through a client built
//! here, so timeouts and trust roots are configured in one place.

use crate::PlatformError;
use reqwest::{Certificate, Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 60s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Extra PEM-encoded root certificates to trust
    pub root_certificates: Vec<Vec<u8>>,
    /// Skip server certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("vault-shim-common/", env!("CARGO_PKG_VERSION")).to_string(),
            root_certificates: Vec::new(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Set the request timeout. The connect timeout never exceeds it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Trust an additional PEM-encoded root certificate (or bundle).
    #[must_use]
    pub fn with_root_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.root_certificates.push(pem.into());
        self
    }

    /// Accept any server certificate. Only meant for local development.
    #[must_use]
    pub const fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns [`PlatformError::InvalidInput`] if a root certificate is not valid
/// PEM, or [`PlatformError::Http`] if the client cannot be built.
///
/// # Examples
///
/// ```
/// use vault_shim_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// let client = build_http_client(&config);
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .danger_accept_invalid_certs(config.accept_invalid_certs);

    for pem in &config.root_certificates {
        let bundle = Certificate::from_pem_bundle(pem)
            .map_err(|e| PlatformError::invalid_input(format!("root certificate: {e}")))?;
        if bundle.is_empty() {
            return Err(PlatformError::invalid_input(
                "root certificate: no certificates found in PEM data",
            ));
        }
        for cert in bundle {
            builder = builder.add_root_certificate(cert);
        }
    }

    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }
    debug!(
        timeout_ms = u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        extra_roots = config.root_certificates.len(),
        user_agent = %config.user_agent,
        "Building HTTP client"
    );

    Ok(builder.build()?)
}
