//! Proptest generators for secrets and leases.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::time::Duration;
use vault_shim::SecretRecord;

/// Generate JSON leaf values as stored in KV secrets.
pub fn secret_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[A-Za-z0-9!@#$%^&*]{0,32}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Generate the `data` map of a secret, optionally nested one level.
pub fn secret_data_strategy() -> impl Strategy<Value = Map<String, Value>> {
    let leaf_map = prop::collection::btree_map("[a-z_]{1,12}", secret_value_strategy(), 0..6)
        .prop_map(|m| m.into_iter().collect::<Map<String, Value>>());
    prop::collection::btree_map(
        "[a-z_]{1,12}",
        prop_oneof![
            secret_value_strategy(),
            leaf_map.prop_map(Value::Object),
        ],
        0..6,
    )
    .prop_map(|m| m.into_iter().collect())
}

/// Generate Vault-style lease IDs (possibly empty).
pub fn lease_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{2,8}/creds/[a-z]{2,8}/[A-Za-z0-9]{24}",
    ]
}

/// Generate lease durations from zero to a day.
pub fn lease_strategy() -> impl Strategy<Value = Duration> {
    (0u64..=86_400).prop_map(Duration::from_secs)
}

/// Generate complete secret records.
pub fn secret_record_strategy() -> impl Strategy<Value = SecretRecord> {
    (
        "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
        lease_id_strategy(),
        0u64..=86_400,
        any::<bool>(),
        secret_data_strategy(),
        prop::collection::vec("[ -~]{0,40}", 0..3),
    )
        .prop_map(
            |(request_id, lease_id, lease_duration, renewable, data, warnings)| SecretRecord {
                request_id,
                lease_id,
                lease_duration,
                renewable,
                data,
                warnings,
            },
        )
}
