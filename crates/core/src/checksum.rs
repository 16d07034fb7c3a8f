//! Canonical serialization and content addressing for published versions.
//!
//! A published configuration is identified by the SHA-256 hex digest of its
//! canonical JSON form. Canonical means: serialized through
//! `serde_json::Value` (object keys in sorted order, no insignificant
//! whitespace), so that two structurally identical configurations always
//! hash the same regardless of input formatting.

use sha2::{Digest, Sha256};

use crate::config::Configuration;

/// Serialize a configuration to its canonical JSON string.
pub fn canonical_json(config: &Configuration) -> String {
    // serde_json::Value keeps object keys in sorted (BTreeMap) order, and
    // to_string emits compact JSON, which together give the canonical form.
    let value = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
    value.to_string()
}

/// SHA-256 hex digest of the canonical JSON serialization.
pub fn configuration_checksum(config: &Configuration) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(config).as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
