//! Evidence output
//!
//! [`ReportSink`] is the agent's [`EvidenceSink`]: it prints evidence to the
//! console and optionally writes a signed JSON envelope to disk.
//!
//! ## Hash Architecture
//!
//! ```text
//! StructuredConfig ── canonical JSON ──► evidence_hash ─┐
//! observations + findings ── JSON ────► content_hash  ─┼─► signature
//! ```

mod console;
mod envelope;

use console::print_results;
use envelope::build_report;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use sshd_kit::StructuredConfig;

use crate::evidence::{Finding, Observation};
use crate::signing::{self, SigningBackend};
use crate::sink::{EvidenceSink, SinkError};

/// Console and file sink used by the command line agent
pub struct ReportSink {
    output: Option<PathBuf>,
    quiet: bool,
    hostname: String,
    evidence_hash: Option<String>,
    observations: Vec<Observation>,
    findings: Vec<Finding>,
}

impl ReportSink {
    pub fn new(output: Option<PathBuf>, quiet: bool, hostname: impl Into<String>) -> Self {
        Self {
            output,
            quiet,
            hostname: hostname.into(),
            evidence_hash: None,
            observations: Vec::new(),
            findings: Vec::new(),
        }
    }

    fn write_report(&self, path: &Path) -> Result<(), SinkError> {
        let backend = create_signing_backend();
        let evidence_hash = self
            .evidence_hash
            .clone()
            .unwrap_or_else(|| sha256_prefixed(&[]));

        let report = build_report(
            &self.hostname,
            &self.observations,
            &self.findings,
            &evidence_hash,
            backend.as_deref(),
        )?;

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).map_err(|source| SinkError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("evidence envelope written to {}", path.display());
        Ok(())
    }
}

impl EvidenceSink for ReportSink {
    fn configuration_collected(&mut self, config: &StructuredConfig) {
        self.evidence_hash = Some(sha256_prefixed(&config.canonical_bytes()));
    }

    fn create_observations(&mut self, observations: &[Observation]) -> Result<(), SinkError> {
        self.observations.extend_from_slice(observations);
        Ok(())
    }

    fn create_findings(&mut self, findings: &[Finding]) -> Result<(), SinkError> {
        self.findings.extend_from_slice(findings);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if !self.quiet {
            print_results(&self.observations, &self.findings);
        }

        match &self.output {
            Some(path) => self.write_report(path),
            None => Ok(()),
        }
    }
}

/// Create the signing backend, logging any errors
fn create_signing_backend() -> Option<Box<dyn SigningBackend>> {
    match signing::create_backend() {
        Ok(backend) => Some(backend),
        Err(e) => {
            log::warn!(
                "Failed to create signing backend: {}. Evidence will be unsigned.",
                e
            );
            None
        }
    }
}

/// `sha256:<hex>` digest
pub(crate) fn sha256_prefixed(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::tests::{password_policy_executor, sample_config, FakeFetcher};
    use crate::orchestrator::{CancelToken, EvalStatus, Plugin};
    use crate::subject::SubjectResolver;

    #[test]
    fn test_sha256_prefixed() {
        assert_eq!(
            sha256_prefixed(b"abc"),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_report_sink_writes_signed_envelope() {
        let path = std::env::temp_dir().join(format!(
            "sshd_agent_report_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut sink = ReportSink::new(Some(path.clone()), true, "bastion-01");
        let result = Plugin::new(SubjectResolver::new("bastion-01")).eval_with(
            &FakeFetcher::ok(sample_config()),
            &password_policy_executor(),
            &[PathBuf::from("policies")],
            &mut sink,
            &CancelToken::new(),
        );
        assert_eq!(result.status, EvalStatus::Success);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["observations"].as_array().unwrap().len(), 1);
        assert_eq!(written["findings"][0]["status"], "not-satisfied");
        assert_eq!(
            written["envelope"]["evidence_hash"],
            sha256_prefixed(&sample_config().canonical_bytes())
        );
        assert!(written["envelope"]["content_hash"]
            .as_str()
            .unwrap()
            .starts_with("sha256:"));
        assert!(!written["envelope"]["signature"].is_null());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unwritable_output_is_sink_error() {
        let mut sink = ReportSink::new(
            Some(PathBuf::from("/nonexistent/dir/evidence.json")),
            true,
            "bastion-01",
        );
        let err = sink.finish().unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
    }
}
