//! Evidence envelope builder

use common::results::{AgentInfo, HostInfo, ResultEnvelope};
use serde::Serialize;

use super::sha256_prefixed;
use crate::evidence::{Finding, Observation};
use crate::signing::{self, SigningBackend};
use crate::sink::SinkError;

const AGENT_NAME: &str = "sshd-agent";

/// Evidence file written by the agent
#[derive(Serialize)]
pub struct EvidenceReport<'a> {
    pub envelope: ResultEnvelope,
    pub observations: &'a [Observation],
    pub findings: &'a [Finding],
}

#[derive(Serialize)]
struct EvidenceContent<'a> {
    observations: &'a [Observation],
    findings: &'a [Finding],
}

/// Build and sign the envelope for the given evidence.
///
/// `content_hash` covers the serialized observations and findings, the
/// caller supplies the `evidence_hash` of the collected configuration.
pub fn build_report<'a>(
    hostname: &str,
    observations: &'a [Observation],
    findings: &'a [Finding],
    evidence_hash: &str,
    backend: Option<&dyn SigningBackend>,
) -> Result<EvidenceReport<'a>, SinkError> {
    let content = serde_json::to_vec(&EvidenceContent {
        observations,
        findings,
    })?;
    let content_hash = sha256_prefixed(&content);

    let mut envelope = ResultEnvelope::new(
        AgentInfo::with_defaults(AGENT_NAME),
        HostInfo::new(
            hostname,
            hostname,
            std::env::consts::OS,
            std::env::consts::ARCH,
        ),
    )
    .with_content_hash(&content_hash)
    .with_evidence_hash(evidence_hash);

    signing::try_sign_envelope(&mut envelope, backend);

    Ok(EvidenceReport {
        envelope,
        observations,
        findings,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_hashed_and_unsigned_without_backend() {
        let report = build_report("bastion-01", &[], &[], "sha256:00", None).unwrap();

        assert_eq!(
            report.envelope.content_hash,
            sha256_prefixed(br#"{"observations":[],"findings":[]}"#)
        );
        assert_eq!(report.envelope.evidence_hash, "sha256:00");
        assert!(report.envelope.signature.is_none());
    }

    #[test]
    fn test_report_is_signed_with_backend() {
        let backend = signing::create_backend().unwrap();
        let report =
            build_report("bastion-01", &[], &[], "sha256:00", Some(backend.as_ref())).unwrap();

        let signature = report.envelope.signature.unwrap();
        assert_eq!(signature.algorithm, "ecdsa-p256");
    }
}
