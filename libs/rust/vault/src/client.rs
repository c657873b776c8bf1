//! Vault HTTP client handle.

use crate::{
    config::VaultConfig,
    error::{VaultError, VaultResult},
    provider::SecretBackend,
    secrets::{Credential, RawSecret, RenewSelfResponse, RenewalResult},
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use vault_shim_common::{HttpConfig, build_http_client};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
const RENEW_SELF_PATH: &str = "auth/token/renew-self";
const USER_AGENT: &str = concat!("vault-shim/", env!("CARGO_PKG_VERSION"));

/// Vault client holding the connection settings and the current token.
///
/// Cheap to share behind an `Arc`. The token sits behind a lock: requests
/// clone it under a read lock, renewals replace it under the write lock.
pub struct VaultClient {
    config: VaultConfig,
    base_url: String,
    http: Client,
    credential: Arc<RwLock<Credential>>,
}

impl fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.base_url)
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Create a new Vault client.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] for an unusable address, an
    /// unreadable or invalid CA bundle, or when the HTTP client cannot be
    /// built. A missing token is not an error.
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        let base_url = config.base_url()?;

        let mut http_config = HttpConfig::default()
            .with_timeout(config.timeout)
            .with_user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.tls.skip_verify);
        if let Some(path) = &config.tls.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                VaultError::Configuration(format!(
                    "cannot read CA certificate {}: {e}",
                    path.display()
                ))
            })?;
            http_config = http_config.with_root_certificate(pem);
        }
        let http = build_http_client(&http_config)?;

        let credential = Credential::new(config.token.clone());

        Ok(Self {
            config,
            base_url,
            http,
            credential: Arc::new(RwLock::new(credential)),
        })
    }

    /// Validated server address, without a trailing slash.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.base_url
    }

    /// Configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Snapshot of the held credential.
    pub async fn credential(&self) -> Credential {
        self.credential.read().await.clone()
    }

    /// Lease duration reported by the most recent renewal.
    pub async fn lease_duration(&self) -> Duration {
        self.credential.read().await.lease_duration
    }

    /// Replace the bearer token. Lease details are reset until the next
    /// renewal.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.credential.write().await = Credential::new(Some(SecretString::from(token.into())));
    }

    /// Read a KV v2 secret.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Auth`] when no token is held
    /// - [`VaultError::Backend`] for any non-2xx status or transport failure
    /// - [`VaultError::Serialization`] when the body is not a secret response
    #[instrument(skip(self))]
    pub async fn read_secret(&self, mount: &str, name: &str) -> VaultResult<RawSecret> {
        let path = kv2_data_path(mount, name);
        let token = self.bearer().await?;

        let response = self
            .request(Method::GET, &path, &token)
            .send()
            .await
            .map_err(transport_error)?;

        let body = success_body(response).await?;
        let secret: RawSecret = serde_json::from_slice(&body)?;
        debug!(path = %path, request_id = %secret.request_id, "Read secret");
        Ok(secret)
    }

    /// Renew the held token via `auth/token/renew-self`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Auth`] when no token is held, the backend rejects the
    ///   token, or the token is reported as not renewable
    /// - [`VaultError::Backend`] for other failures
    #[instrument(skip(self))]
    pub async fn renew_credential(&self, increment: u64) -> VaultResult<RenewalResult> {
        let token = self.bearer().await?;
        let body = if increment > 0 {
            serde_json::json!({ "increment": format!("{increment}s") })
        } else {
            serde_json::json!({})
        };

        let response = self
            .request(Method::POST, RENEW_SELF_PATH, &token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            let text = response.text().await.unwrap_or_default();
            return Err(VaultError::auth(format!(
                "token renewal rejected with status {}: {}",
                status.as_u16(),
                error_message(&text)
            )));
        }

        let body = success_body(response).await?;
        let renewed: RenewSelfResponse = serde_json::from_slice(&body)?;
        let auth = renewed
            .auth
            .ok_or_else(|| VaultError::auth("renewal response carried no auth data"))?;

        let result = RenewalResult {
            lease_duration: Duration::from_secs(auth.lease_duration),
            renewable: auth.renewable,
        };

        {
            let mut credential = self.credential.write().await;
            if !auth.client_token.is_empty() {
                credential.token = Some(SecretString::from(auth.client_token));
            }
            credential.lease_duration = result.lease_duration;
            credential.renewable = result.renewable;
        }

        if !result.renewable {
            return Err(VaultError::auth("token is not renewable"));
        }

        debug!(lease_secs = auth.lease_duration, "Renewed token");
        Ok(result)
    }

    async fn bearer(&self) -> VaultResult<SecretString> {
        self.credential
            .read()
            .await
            .token
            .clone()
            .ok_or_else(|| VaultError::auth("no Vault token configured"))
    }

    fn request(&self, method: Method, path: &str, token: &SecretString) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .header(TOKEN_HEADER, token.expose_secret());

        if let Some(namespace) = &self.config.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        request
    }
}

#[async_trait]
impl SecretBackend for VaultClient {
    async fn read_secret(&self, mount: &str, name: &str) -> VaultResult<RawSecret> {
        Self::read_secret(self, mount, name).await
    }

    async fn renew_credential(&self, increment: u64) -> VaultResult<RenewalResult> {
        Self::renew_credential(self, increment).await
    }
}

fn kv2_data_path(mount: &str, name: &str) -> String {
    format!("{}/data/{}", mount.trim_matches('/'), name.trim_matches('/'))
}

fn transport_error(err: reqwest::Error) -> VaultError {
    if err.is_timeout() {
        VaultError::unavailable(format!("request timed out: {err}"))
    } else {
        VaultError::unavailable(err.to_string())
    }
}

async fn success_body(response: Response) -> VaultResult<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = match error_message(&text) {
            m if m.is_empty() => status.canonical_reason().unwrap_or("no body").to_string(),
            m => m,
        };
        return Err(VaultError::backend(status.as_u16(), message));
    }

    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(bytes.to_vec())
}

/// Vault reports failures as `{"errors": ["..."]}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        errors: Vec<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join("; "),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>) -> VaultClient {
        let mut config = VaultConfig::new("http://127.0.0.1:8200");
        if let Some(token) = token {
            config = config.with_token(token);
        }
        VaultClient::new(config).unwrap()
    }

    #[test]
    fn test_kv2_data_path() {
        assert_eq!(kv2_data_path("secret", "app"), "secret/data/app");
        assert_eq!(kv2_data_path("/kv/", "/team/db/"), "kv/data/team/db");
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"errors":["permission denied","extra"]}"#),
            "permission denied; extra"
        );
        assert_eq!(error_message(r#"{"errors":[]}"#), r#"{"errors":[]}"#);
        assert_eq!(error_message("  upstream down\n"), "upstream down");
    }

    #[test]
    fn test_new_rejects_bad_address() {
        let err = VaultClient::new(VaultConfig::new("")).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_missing_ca_file() {
        let config = VaultConfig::new("https://vault.local:8200").with_tls(crate::TlsConfig {
            ca_cert: Some("/nonexistent/vault-ca.pem".into()),
            skip_verify: false,
        });
        let err = VaultClient::new(config).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let client = client(None);
        let err = client.read_secret("secret", "app").await.unwrap_err();
        assert!(matches!(err, VaultError::Auth(_)));

        let err = client.renew_credential(0).await.unwrap_err();
        assert!(matches!(err, VaultError::Auth(_)));
    }

    #[tokio::test]
    async fn test_set_token_resets_lease() {
        let client = client(Some("s.first"));
        client.set_token("s.second").await;

        let credential = client.credential().await;
        assert_eq!(credential.token.unwrap().expose_secret(), "s.second");
        assert_eq!(credential.lease_duration, Duration::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_token_swaps_are_never_torn() {
        const OLD: &str = "s.old-token-aaaaaaaaaaaaaaaa";
        const NEW: &str = "s.new-token-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

        let client = Arc::new(client(Some(OLD)));

        let writer = {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                for i in 0..500 {
                    client.set_token(if i % 2 == 0 { NEW } else { OLD }).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let token = client.bearer().await.unwrap();
                        let seen = token.expose_secret();
                        assert!(seen == OLD || seen == NEW, "torn token: {seen}");
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
