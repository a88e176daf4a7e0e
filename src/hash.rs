use sha2::{Digest, Sha256};

/// Content fingerprint for article deduplication.
///
/// Hashes the URL and title together so the same story re-appearing in a
/// feed maps to the same 64-character lowercase hex digest.
pub fn content_hash(url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}
