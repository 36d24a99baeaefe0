//! Digests of canonical snapshot text.
//!
//! A digest identifies one canonical form: identical canonical JSON gives
//! identical digests, so two digests can be compared without reading the
//! baseline file again.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `canonical` (64 characters).
///
/// ```
/// use probity_core::snapshot::digest::content_digest;
///
/// let digest = content_digest("{}\n");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn content_digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(content_digest("a"), content_digest("a"));
        assert_ne!(content_digest("a"), content_digest("b"));
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            content_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
