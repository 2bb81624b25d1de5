//! Content-hash revision tokens used for optimistic concurrency.

use sha2::{Digest, Sha256};

/// Compute the revision token for a serialized record body.
///
/// The token is a hex-encoded SHA-256 digest of the exact bytes passed in —
/// callers are expected to serialize with a stable encoding (e.g.
/// `serde_json::to_vec`) before hashing, so that two equal states always hash
/// to the same revision.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the revision token for a JSON-serializable value.
///
/// # Errors
///
/// Returns a serialization error if `value` cannot be encoded as JSON.
pub fn content_hash_of<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(content_hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_hashes_the_same() {
        let a = content_hash_of(&serde_json::json!({"a": 1, "b": [1, 2, 3]})).unwrap();
        let b = content_hash_of(&serde_json::json!({"a": 1, "b": [1, 2, 3]})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_values_hash_differently() {
        let a = content_hash_of(&serde_json::json!({"a": 1})).unwrap();
        let b = content_hash_of(&serde_json::json!({"a": 2})).unwrap();
        assert_ne!(a, b);
    }
}
