//! Software signing backend
//!
//! ECDSA P-256 with an ephemeral key generated per agent run. The private key
//! never leaves process memory.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::results::SignatureBlock;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use rand_core::OsRng;

use super::backend::{compute_key_fingerprint, compute_signed_data, SigningBackend};
use super::types::{SigningError, SigningResult};

pub struct SoftwareBackend {
    signing_key: SigningKey,
    /// SEC1 uncompressed public key
    public_key_bytes: Vec<u8>,
    key_id: String,
    signer_id: String,
}

impl SoftwareBackend {
    pub fn new() -> SigningResult<Self> {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key_bytes = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let signer_id = format!(
            "sshd-agent:sha256:{}",
            compute_key_fingerprint(&public_key_bytes)
        );

        Ok(Self {
            signing_key,
            public_key_bytes,
            key_id: format!("sshd-agent:ephemeral:{}", uuid::Uuid::new_v4()),
            signer_id,
        })
    }
}

impl SigningBackend for SoftwareBackend {
    fn sign_envelope_hashes(
        &self,
        content_hash: &str,
        evidence_hash: &str,
    ) -> SigningResult<SignatureBlock> {
        let signed_data = compute_signed_data(content_hash, evidence_hash);
        let signature: Signature = self
            .signing_key
            .try_sign(&signed_data)
            .map_err(|e| SigningError::SigningFailed(e.to_string()))?;

        Ok(SignatureBlock::new(
            &self.signer_id,
            self.algorithm(),
            BASE64.encode(&self.public_key_bytes),
            BASE64.encode(signature.to_der().as_bytes()),
            &self.key_id,
            SignatureBlock::standard_covers(),
        ))
    }

    fn algorithm(&self) -> &str {
        "ecdsa-p256"
    }
}
