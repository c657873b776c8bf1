//! Secret and credential types.

use crate::error::VaultResult;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{fmt, time::Duration};

/// Vault logical read response, as received.
///
/// Vault sends `null` for several of these fields; they decode to empty
/// values so the record built from it never carries a null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSecret {
    /// Request id assigned by Vault
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_id: String,
    /// Lease id; empty for KV v2 reads
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_id: String,
    /// Lease duration in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_duration: u64,
    /// Whether the lease can be renewed
    #[serde(default, deserialize_with = "null_as_default")]
    pub renewable: bool,
    /// For KV v2 this holds both the stored `data` and its `metadata`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
    /// Warnings attached to the response
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized KV v2 secret.
///
/// Serializes with the fields in declaration order. `Debug` lists the data
/// keys but never their values.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Request id assigned by Vault
    pub request_id: String,
    /// Lease id
    pub lease_id: String,
    /// Lease duration in seconds
    pub lease_duration: u64,
    /// Whether the lease can be renewed
    pub renewable: bool,
    /// Response data, copied as received
    pub data: Map<String, Value>,
    /// Warnings; never null, empty when Vault sent none
    pub warnings: Vec<String>,
}

impl SecretRecord {
    /// Serialize to a compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaultError::Serialization`] if the data cannot be
    /// encoded.
    pub fn to_json(&self) -> VaultResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a string produced by [`SecretRecord::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaultError::Serialization`] on malformed input.
    pub fn from_json(json: &str) -> VaultResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<RawSecret> for SecretRecord {
    fn from(raw: RawSecret) -> Self {
        Self {
            request_id: raw.request_id,
            lease_id: raw.lease_id,
            lease_duration: raw.lease_duration,
            renewable: raw.renewable,
            data: raw.data,
            warnings: raw.warnings,
        }
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("request_id", &self.request_id)
            .field("lease_id", &self.lease_id)
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .field("data", &RedactedKeys(&self.data))
            .field("warnings", &self.warnings)
            .finish()
    }
}

struct RedactedKeys<'a>(&'a Map<String, Value>);

impl fmt::Debug for RedactedKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

/// Token held by the client handle.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    /// Bearer token; `None` until one is configured
    pub token: Option<SecretString>,
    /// Lease duration reported by the last successful renewal
    pub lease_duration: Duration,
    /// Whether the backend reported the token as renewable
    pub renewable: bool,
}

impl Credential {
    /// Credential for a freshly configured token. Lease details are unknown
    /// until the first renewal.
    #[must_use]
    pub const fn new(token: Option<SecretString>) -> Self {
        Self {
            token,
            lease_duration: Duration::ZERO,
            renewable: false,
        }
    }
}

/// Outcome of a successful token self-renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalResult {
    /// Time until the token expires
    pub lease_duration: Duration,
    /// Whether the token can be renewed again
    pub renewable: bool,
}

/// `auth/token/renew-self` response.
#[derive(Debug, Deserialize)]
pub(crate) struct RenewSelfResponse {
    #[serde(default)]
    pub auth: Option<RenewedAuth>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RenewedAuth {
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_duration: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub renewable: bool,
}
