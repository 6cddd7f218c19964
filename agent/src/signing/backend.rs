//! Signing backend trait

use common::results::SignatureBlock;
use sha2::{Digest, Sha256};

use super::types::SigningResult;

/// A key able to sign evidence envelopes
pub trait SigningBackend: Send + Sync {
    /// Sign `SHA256(content_hash || evidence_hash)`
    fn sign_envelope_hashes(
        &self,
        content_hash: &str,
        evidence_hash: &str,
    ) -> SigningResult<SignatureBlock>;

    /// Algorithm identifier recorded in the signature block
    fn algorithm(&self) -> &str;
}

/// Data covered by an envelope signature
pub fn compute_signed_data(content_hash: &str, evidence_hash: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(evidence_hash.as_bytes());
    hasher.finalize().into()
}

/// First 16 hex characters of `SHA256(public_key_bytes)`
pub fn compute_key_fingerprint(public_key_bytes: &[u8]) -> String {
    let digest = Sha256::digest(public_key_bytes);
    hex::encode(digest.get(..8).unwrap_or(&digest[..]))
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_data_binds_both_hashes() {
        let signed = compute_signed_data("sha256:aaa", "sha256:bbb");
        assert_eq!(signed, compute_signed_data("sha256:aaa", "sha256:bbb"));
        assert_ne!(signed, compute_signed_data("sha256:aaa", "sha256:ccc"));
    }

    #[test]
    fn test_key_fingerprint_length() {
        let fingerprint = compute_key_fingerprint(b"public key");
        assert_eq!(fingerprint.len(), 16);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
