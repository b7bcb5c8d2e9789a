//! Stable digests used where a name must be derived from content.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `url`.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
