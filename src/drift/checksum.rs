use sha2::{Digest, Sha256};
use crate::value::Record;

/// SHA-256 of the canonical JSON form of a normalized record.
///
/// Records are ordered maps, so equal records always hash the same.
pub fn fingerprint(record: &Record) -> String {
    sha256(&serde_json::to_string(record).unwrap_or_default())
}

fn sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}
