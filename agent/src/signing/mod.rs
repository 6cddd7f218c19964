//! Evidence envelope signing
//!
//! The signature covers the envelope's `content_hash` and `evidence_hash`:
//!
//! ```text
//! ResultEnvelope
//!   ├── content_hash    ─┐
//!   ├── evidence_hash   ─┼─► SHA256(content_hash || evidence_hash)
//!   └── signature ◄──────┘
//! ```

mod backend;
mod software;
mod types;

pub use backend::SigningBackend;
pub use software::SoftwareBackend;
pub use types::{SigningError, SigningResult};

use common::results::ResultEnvelope;

pub fn create_backend() -> SigningResult<Box<dyn SigningBackend>> {
    log::debug!("using software signing backend");
    Ok(Box::new(SoftwareBackend::new()?))
}

/// Sign an envelope in place
pub fn sign_envelope(
    envelope: &mut ResultEnvelope,
    backend: &dyn SigningBackend,
) -> SigningResult<()> {
    if envelope.content_hash.is_empty() {
        return Err(SigningError::MissingHash("content_hash"));
    }
    if envelope.evidence_hash.is_empty() {
        return Err(SigningError::MissingHash("evidence_hash"));
    }

    let signature =
        backend.sign_envelope_hashes(&envelope.content_hash, &envelope.evidence_hash)?;
    envelope.signature = Some(signature);
    Ok(())
}

/// Sign if a backend is available. Failure leaves the envelope unsigned.
pub fn try_sign_envelope(envelope: &mut ResultEnvelope, backend: Option<&dyn SigningBackend>) {
    let Some(backend) = backend else {
        log::warn!("no signing backend available, evidence envelope will be unsigned");
        return;
    };

    match sign_envelope(envelope, backend) {
        Ok(()) => log::debug!("evidence envelope signed with {}", backend.algorithm()),
        Err(e) => log::warn!("failed to sign evidence envelope: {}. Envelope will be unsigned.", e),
    }
}
