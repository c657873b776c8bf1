//! Vault client configuration.

use crate::error::{VaultError, VaultResult};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Address used when none is configured.
pub const DEFAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// TLS settings for the connection to Vault.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// PEM bundle of CA certificates to trust in addition to the system roots
    pub ca_cert: Option<PathBuf>,
    /// Skip server certificate verification
    pub skip_verify: bool,
}

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address, e.g. `https://vault.internal:8200`
    pub address: String,
    /// Client token; `None` makes every authenticated call fail with `Auth`
    pub token: Option<SecretString>,
    /// Enterprise namespace sent as `X-Vault-Namespace`
    pub namespace: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// TLS settings
    pub tls: TlsConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

impl VaultConfig {
    /// Create a configuration for the given address with no token.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsConfig::default(),
        }
    }

    /// Read the standard `VAULT_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] when a boolean or duration
    /// variable cannot be parsed.
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the `VAULT_*` names.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] when a boolean or duration
    /// variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VaultResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get("VAULT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()));
        config.token = get("VAULT_TOKEN").map(SecretString::from);
        config.namespace = get("VAULT_NAMESPACE");
        config.tls.ca_cert = get("VAULT_CACERT").map(PathBuf::from);
        if let Some(raw) = get("VAULT_SKIP_VERIFY") {
            config.tls.skip_verify = parse_bool("VAULT_SKIP_VERIFY", &raw)?;
        }
        if let Some(raw) = get("VAULT_CLIENT_TIMEOUT") {
            config.timeout = parse_seconds("VAULT_CLIENT_TIMEOUT", &raw)?;
        }
        Ok(config)
    }

    /// Set the client token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set TLS settings.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Validate the address and return it without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] when the address is empty, not a
    /// URL, not `http`/`https`, or has no host.
    pub fn base_url(&self) -> VaultResult<String> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(VaultError::Configuration(
                "Vault address is not set".to_string(),
            ));
        }

        let url = Url::parse(address).map_err(|e| {
            VaultError::Configuration(format!("Vault address {address:?} is not a URL: {e}"))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(VaultError::Configuration(format!(
                "Vault address scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(VaultError::Configuration(format!(
                "Vault address {address:?} has no host"
            )));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

fn parse_bool(key: &str, raw: &str) -> VaultResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "off" => Ok(false),
        other => Err(VaultError::Configuration(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_seconds(key: &str, raw: &str) -> VaultResult<Duration> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix('s').unwrap_or(trimmed);
    digits
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| VaultError::Configuration(format!("{key} must be whole seconds, got {raw:?}")))
}
