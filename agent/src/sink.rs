//! Host ingestion boundary

use std::path::PathBuf;

use sshd_kit::StructuredConfig;

use crate::evidence::{Finding, Observation};

/// Errors raised while handing evidence to the host
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write evidence to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize evidence: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives the evidence of one evaluation
pub trait EvidenceSink {
    /// Called once after a successful fetch, before any evidence
    fn configuration_collected(&mut self, _config: &StructuredConfig) {}

    fn create_observations(&mut self, observations: &[Observation]) -> Result<(), SinkError>;

    fn create_findings(&mut self, findings: &[Finding]) -> Result<(), SinkError>;

    /// Called after observations and findings were delivered
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
