use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Content address of a pact document: hex-encoded SHA-256 of its canonical JSON.
///
/// `serde_json::Value` keeps object keys sorted, so two documents with the same
/// content always produce the same address regardless of key order on the wire.
pub fn content_sha(content: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Pacticipant names are unique ignoring case.
pub fn names_match(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}
