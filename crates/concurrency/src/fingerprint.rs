//! Request fingerprints
//!
//! A fingerprint is the SHA-256 digest of a request's logical content. The
//! ledger stores it next to each request id so that a retry can be told apart
//! from an unrelated request that happens to reuse the id.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a request's logical content
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Digest an ordered list of fields
    ///
    /// Each field is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
    /// produce different digests.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Fingerprint(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_parts_same_fingerprint() {
        let a = Fingerprint::from_parts(&[b"1", b"standup", b"2024-01-10"]);
        let b = Fingerprint::from_parts(&[b"1", b"standup", b"2024-01-10"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let a = Fingerprint::from_parts(&[b"ab", b"c"]);
        let b = Fingerprint::from_parts(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_short_hex() {
        let fp = Fingerprint::from_parts(&[b"x"]);
        let shown = fp.to_string();
        assert_eq!(shown.len(), 16);
        assert!(shown.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
