//! Policy evaluation
//!
//! [`PolicyExecutor`] is the seam between evidence compilation and whatever
//! engine evaluates policies. [`EspPolicyExecutor`] evaluates ESP policy
//! bundles against a pre-fetched [`StructuredConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collectors::SshdConfigCollector;
use crate::contracts::create_sshd_config_contract;
use crate::discovery::{discover_policy_files, DiscoveryError};
use crate::execution_api::{scan_file, CtnStrategyRegistry, ScanError, ScanResult, StrategyError};
use crate::executors::SshdConfigExecutor;
use crate::sshd_config::StructuredConfig;

/// One policy-reported non-compliance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub remarks: BTreeMap<String, String>,
}

impl Violation {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            remarks: BTreeMap::new(),
        }
    }

    pub fn with_remark(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.remarks.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one evaluated policy. No violations means the policy passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub package: String,
    pub file: String,
    pub bundle_path: String,
    pub violations: Vec<Violation>,
}

impl PolicyResult {
    pub fn new(
        package: impl Into<String>,
        file: impl Into<String>,
        bundle_path: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            file: file.into(),
            bundle_path: bundle_path.into(),
            violations: Vec::new(),
        }
    }

    pub fn with_violation(mut self, violation: Violation) -> Self {
        self.violations.push(violation);
        self
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Errors scoped to one policy bundle
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("policy bundle {} contains no policy files", .0.display())]
    EmptyBundle(PathBuf),
    #[error("failed to register policy strategy: {0}")]
    Registry(#[from] StrategyError),
    #[error("policy {} failed: {source}", .file.display())]
    Policy {
        file: PathBuf,
        #[source]
        source: ScanError,
    },
}

/// Evaluates one policy bundle against the structured configuration
pub trait PolicyExecutor {
    fn execute(
        &self,
        config: &StructuredConfig,
        bundle_path: &Path,
        namespace: &str,
    ) -> Result<Vec<PolicyResult>, PolicyError>;
}

/// Policy executor backed by the ESP compiler and execution engine
#[derive(Debug, Default, Clone, Copy)]
pub struct EspPolicyExecutor;

impl EspPolicyExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Registry holding the single strategy that serves the fetched configuration
    fn create_registry(
        config: &StructuredConfig,
        namespace: &str,
    ) -> Result<CtnStrategyRegistry, StrategyError> {
        let mut registry = CtnStrategyRegistry::new();

        registry.register_ctn_strategy(
            Box::new(SshdConfigCollector::new(
                namespace,
                Arc::new(config.clone()),
            )),
            Box::new(SshdConfigExecutor::new(create_sshd_config_contract(
                namespace,
            ))),
        )?;

        Ok(registry)
    }
}

impl PolicyExecutor for EspPolicyExecutor {
    fn execute(
        &self,
        config: &StructuredConfig,
        bundle_path: &Path,
        namespace: &str,
    ) -> Result<Vec<PolicyResult>, PolicyError> {
        let policy_files = discover_policy_files(bundle_path)?;
        if policy_files.is_empty() {
            return Err(PolicyError::EmptyBundle(bundle_path.to_path_buf()));
        }

        log::debug!(
            "evaluating {} policy file(s) from {} in namespace {}",
            policy_files.len(),
            bundle_path.display(),
            namespace
        );

        let registry = Arc::new(Self::create_registry(config, namespace)?);
        let bundle = bundle_path.display().to_string();

        let mut results = Vec::with_capacity(policy_files.len());
        for file in policy_files {
            let scan = scan_file(&file, registry.clone()).map_err(|source| {
                log::error!("policy {} failed: {}", file.display(), source);
                PolicyError::Policy {
                    file: file.clone(),
                    source,
                }
            })?;
            results.push(ScanOutcome::from(&scan).into_policy_result(&file, &bundle));
        }

        Ok(results)
    }
}

/// Policy-level facts read from one ESP scan
#[derive(Debug, Clone)]
struct ScanOutcome {
    policy_id: String,
    tree_passed: bool,
    /// `"<failed> of <total> criteria failed"`
    criteria_summary: String,
    findings: Vec<Violation>,
}

impl From<&ScanResult> for ScanOutcome {
    fn from(scan: &ScanResult) -> Self {
        Self {
            policy_id: scan.outcome.policy_id.to_string(),
            tree_passed: scan.tree_passed,
            criteria_summary: format!(
                "{} of {} criteria failed",
                scan.criteria_counts.failed, scan.criteria_counts.total
            ),
            findings: scan
                .findings
                .iter()
                .map(|finding| {
                    Violation::new(finding.title.to_string(), finding.description.to_string())
                        .with_remark("finding_id", finding.finding_id.to_string())
                        .with_remark("severity", finding.severity.to_string())
                })
                .collect(),
        }
    }
}

impl ScanOutcome {
    fn into_policy_result(self, file: &Path, bundle: &str) -> PolicyResult {
        let mut result = PolicyResult::new(self.policy_id, file.display().to_string(), bundle);
        result.violations = self.findings;

        // A failed tree without findings still has to surface as a violation
        if !self.tree_passed && result.violations.is_empty() {
            result.violations.push(Violation::new(
                format!("Policy {} failed", result.package),
                self.criteria_summary,
            ));
        }

        result
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_result_pass_state() {
        let passing = PolicyResult::new("ssh.root_login", "root_login.esp", "policies");
        assert!(passing.passed());

        let failing = passing
            .clone()
            .with_violation(Violation::new("root login enabled", "PermitRootLogin is yes"));
        assert!(!failing.passed());
        assert_eq!(failing.violations.len(), 1);
    }

    #[test]
    fn test_violation_remarks_are_ordered() {
        let violation = Violation::new("t", "d")
            .with_remark("severity", "high")
            .with_remark("finding_id", "F-1");
        let keys: Vec<_> = violation.remarks.keys().cloned().collect();
        assert_eq!(keys, vec!["finding_id", "severity"]);
    }

    #[test]
    fn test_empty_bundle_is_error() {
        let dir = std::env::temp_dir().join(format!("sshd_kit_empty_bundle_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let err = EspPolicyExecutor::new()
            .execute(&StructuredConfig::new(), &dir, "sshd_config")
            .unwrap_err();
        assert!(matches!(err, PolicyError::EmptyBundle(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_bundle_is_discovery_error() {
        let err = EspPolicyExecutor::new()
            .execute(
                &StructuredConfig::new(),
                Path::new("/nonexistent/bundle"),
                "sshd_config",
            )
            .unwrap_err();
        assert!(matches!(err, PolicyError::Discovery(_)));
    }

    #[test]
    fn test_malformed_policy_file_fails_bundle() {
        let dir = std::env::temp_dir().join(format!("sshd_kit_bad_policy_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.esp"), "this is not a policy {").unwrap();

        let err = EspPolicyExecutor::new()
            .execute(&StructuredConfig::new(), &dir, "sshd_config")
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Policy { ref file, .. } if file.ends_with("broken.esp")
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    fn outcome(tree_passed: bool, findings: Vec<Violation>) -> ScanOutcome {
        ScanOutcome {
            policy_id: "ssh.password_auth".to_string(),
            tree_passed,
            criteria_summary: "1 of 2 criteria failed".to_string(),
            findings,
        }
    }

    #[test]
    fn test_scan_findings_become_violations() {
        let finding = Violation::new(
            "Password authentication enabled",
            "passwordauthentication is yes",
        )
        .with_remark("finding_id", "SSH-PW-001")
        .with_remark("severity", "high");

        let result = outcome(false, vec![finding]).into_policy_result(
            Path::new("policies/password_auth.esp"),
            "policies",
        );

        assert_eq!(result.package, "ssh.password_auth");
        assert_eq!(result.file, "policies/password_auth.esp");
        assert_eq!(result.bundle_path, "policies");
        assert!(!result.passed());
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].title, "Password authentication enabled");
        assert_eq!(result.violations[0].remarks["finding_id"], "SSH-PW-001");
        assert_eq!(result.violations[0].remarks["severity"], "high");
    }

    #[test]
    fn test_failed_tree_without_findings_is_violation() {
        let result = outcome(false, vec![])
            .into_policy_result(Path::new("policies/password_auth.esp"), "policies");

        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].title, "Policy ssh.password_auth failed");
        assert_eq!(result.violations[0].description, "1 of 2 criteria failed");
        assert!(result.violations[0].remarks.is_empty());
    }

    #[test]
    fn test_passed_tree_has_no_violations() {
        let result = outcome(true, vec![])
            .into_policy_result(Path::new("policies/password_auth.esp"), "policies");

        assert!(result.passed());
        assert_eq!(result.package, "ssh.password_auth");
    }
}
