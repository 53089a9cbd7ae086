//! Cache key derivation
//!
//! Key format: `<category>:<endpoint>:<paramHash>`. Parameters are
//! canonicalized through a `BTreeMap` before hashing, so the key is
//! independent of map insertion order.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Hex characters kept from the SHA-256 parameter digest
const PARAM_HASH_LEN: usize = 16;

/// Derive the cache key for a request
pub fn generate_key(category: &str, endpoint: &str, params: &HashMap<String, String>) -> String {
    format!("{}:{}:{}", category, endpoint, param_hash(params))
}

fn param_hash(params: &HashMap<String, String>) -> String {
    let canonical: BTreeMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let mut hasher = Sha256::new();
    for (key, value) in &canonical {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }

    let digest = hex::encode(hasher.finalize());
    digest[..PARAM_HASH_LEN].to_string()
}
