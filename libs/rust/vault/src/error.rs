//! Vault error types using thiserror 2.0.

use thiserror::Error;
use vault_shim_common::PlatformError;

/// Vault-specific errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Missing or malformed client configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The backend rejected the request, or could not be reached
    #[error("{}", backend_display(*status, message))]
    Backend {
        /// HTTP status, `None` for transport failures
        status: Option<u16>,
        /// Error text reported by the backend or the transport
        message: String,
    },

    /// Token missing, invalid, expired or not renewable
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Malformed payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The renewer gave up after too many consecutive failures
    #[error("Token renewal failed {failures} times in a row: {last}")]
    RenewalExhausted {
        /// Consecutive failures observed
        failures: u32,
        /// The last failure
        #[source]
        last: Box<VaultError>,
    },
}

fn backend_display(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Vault returned status {code}: {message}"),
        None => format!("Vault unavailable: {message}"),
    }
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Create a backend error for an HTTP status.
    #[must_use]
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a backend error for a transport failure.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status carried by a backend error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the failure looks like a blip rather than a rejection:
    /// transport errors, 429 and 5xx.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Backend { status: None, .. } => true,
            Self::Backend {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<PlatformError> for VaultError {
    fn from(err: PlatformError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::backend(404, "secret not found");
        assert_eq!(err.to_string(), "Vault returned status 404: secret not found");

        let err = VaultError::unavailable("connection refused");
        assert_eq!(err.to_string(), "Vault unavailable: connection refused");

        let err = VaultError::RenewalExhausted {
            failures: 3,
            last: Box::new(VaultError::auth("permission denied")),
        };
        assert_eq!(
            err.to_string(),
            "Token renewal failed 3 times in a row: Authentication failed: permission denied"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(VaultError::unavailable("timeout").is_transient());
        assert!(VaultError::backend(503, "sealed").is_transient());
        assert!(VaultError::backend(429, "slow down").is_transient());
        assert!(!VaultError::backend(404, "missing").is_transient());
        assert!(!VaultError::auth("expired").is_transient());
        assert!(!VaultError::Configuration("no address".to_string()).is_transient());
    }

    #[test]
    fn test_from_platform_error() {
        let vault_err: VaultError = PlatformError::invalid_input("bad pem").into();
        assert!(matches!(vault_err, VaultError::Configuration(_)));
    }

    #[test]
    fn test_status() {
        assert_eq!(VaultError::backend(500, "x").status(), Some(500));
        assert_eq!(VaultError::unavailable("x").status(), None);
        assert_eq!(VaultError::auth("x").status(), None);
    }
}
