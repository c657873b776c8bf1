//! Vault response bodies for HTTP-level tests.

use serde_json::{Value, json};
use vault_shim::RawSecret;

/// KV v2 read response wrapping `data` the way Vault does.
#[must_use]
pub fn kv2_read_body(request_id: &str, data: &Value, version: u64) -> Value {
    json!({
        "request_id": request_id,
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": {
            "data": data,
            "metadata": {
                "created_time": "2024-05-01T10:00:00.000000Z",
                "custom_metadata": null,
                "deletion_time": "",
                "destroyed": false,
                "version": version
            }
        },
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
}

/// `auth/token/renew-self` response.
#[must_use]
pub fn renew_self_body(client_token: &str, lease_duration: u64, renewable: bool) -> Value {
    json!({
        "request_id": "5e2b3c1a-renew",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": null,
        "warnings": null,
        "auth": {
            "client_token": client_token,
            "accessor": "acc-1234",
            "policies": ["default", "app"],
            "token_policies": ["default", "app"],
            "metadata": null,
            "lease_duration": lease_duration,
            "renewable": renewable,
            "entity_id": "",
            "token_type": "service",
            "orphan": false
        }
    })
}

/// Vault error body.
#[must_use]
pub fn error_body(errors: &[&str]) -> Value {
    json!({ "errors": errors })
}

/// Raw secret holding an application's database credentials.
#[must_use]
pub fn sample_raw_secret() -> RawSecret {
    serde_json::from_value(kv2_read_body(
        "0f9c2a7e-read",
        &json!({ "username": "app", "password": "s3cr3t", "port": 5432 }),
        3,
    ))
    .unwrap_or_default()
}
