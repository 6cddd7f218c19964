//! Evidence compilation
//!
//! Turns the fetched configuration and per-bundle policy results into
//! observations and findings. Every policy result yields exactly one
//! observation; a passing result yields one satisfied finding and a failing
//! result yields one not-satisfied finding per violation. Failures are
//! scoped: a broken bundle or an unseedable result is recorded and skipped,
//! the rest of the run continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sshd_kit::{
    Activity, FetchFailure, Fetched, PolicyExecutor, PolicyResult, ProvenanceStep, SshFetcher,
    StructuredConfig, Violation,
};
use uuid::Uuid;

use crate::errors::{EvalFailure, JoinedError};
use crate::evidence::{
    Descriptors, Finding, FindingStatus, Labels, Observation, RelevantEvidence,
};
use crate::identity::{merge_seed, seeded_uuid, SeedAttributes};
use crate::subject::SubjectResolver;

/// Policies are re-evaluated at least daily
const OBSERVATION_LIFETIME_HOURS: i64 = 24;

/// Source of evidence timestamps
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Configuration fetched once per run, with its provenance
#[derive(Debug, Clone)]
pub struct Collected {
    pub config: StructuredConfig,
    pub activity: Activity,
}

/// Output of a compilation: evidence plus every error joined along the way
#[derive(Debug, Default)]
pub struct CompiledEvidence {
    pub observations: Vec<Observation>,
    pub findings: Vec<Finding>,
    pub error: Option<JoinedError>,
}

impl CompiledEvidence {
    pub fn fail(&mut self, failure: EvalFailure) {
        match self.error.as_mut() {
            Some(joined) => joined.push(failure),
            None => self.error = Some(JoinedError::from(failure)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn absorb(&mut self, bundle: BundleEvidence) {
        self.observations.extend(bundle.observations);
        self.findings.extend(bundle.findings);
        if let Some(errors) = bundle.errors.into_option() {
            match self.error.as_mut() {
                Some(joined) => joined.extend(errors),
                None => self.error = Some(errors),
            }
        }
    }
}

/// Evidence produced by one bundle
#[derive(Debug, Default)]
pub struct BundleEvidence {
    pub observations: Vec<Observation>,
    pub findings: Vec<Finding>,
    pub errors: JoinedError,
}

pub struct EvidenceCompiler {
    subject_attributes: SeedAttributes,
    hostname: String,
    descriptors: Arc<Descriptors>,
    namespace: String,
    clock: Clock,
}

impl EvidenceCompiler {
    pub fn new(subject: &SubjectResolver, namespace: impl Into<String>) -> Self {
        Self {
            subject_attributes: subject.subject_attributes(),
            hostname: subject.hostname().to_string(),
            descriptors: subject.descriptors(),
            namespace: namespace.into(),
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock used to stamp evidence
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Fetch the configuration. A failure here is fatal for the run.
    pub fn collect(&self, fetcher: &dyn SshFetcher) -> Result<Collected, EvalFailure> {
        match fetcher.fetch_ssh_configuration() {
            Ok(Fetched { config, steps }) => Ok(Collected {
                config,
                activity: collection_activity(steps),
            }),
            Err(FetchFailure { error, steps }) => {
                log::error!(
                    "ssh configuration collection failed after {} step(s): {}",
                    steps.len(),
                    error
                );
                Err(EvalFailure::Fetch(error))
            }
        }
    }

    /// Run the full pipeline: one fetch, then every bundle in order
    pub fn compile(
        &self,
        fetcher: &dyn SshFetcher,
        executor: &dyn PolicyExecutor,
        bundles: &[PathBuf],
    ) -> CompiledEvidence {
        let mut compiled = CompiledEvidence::default();

        let collected = match self.collect(fetcher) {
            Ok(collected) => collected,
            Err(failure) => {
                compiled.fail(failure);
                return compiled;
            }
        };

        for bundle in bundles {
            compiled.absorb(self.evaluate_bundle(&collected, executor, bundle));
        }

        compiled
    }

    /// Evaluate one bundle and compile its results
    pub fn evaluate_bundle(
        &self,
        collected: &Collected,
        executor: &dyn PolicyExecutor,
        bundle: &Path,
    ) -> BundleEvidence {
        let mut evidence = BundleEvidence::default();
        let bundle_name = bundle.display().to_string();

        log::debug!("evaluating policy bundle {}", bundle_name);
        let results = match executor.execute(&collected.config, bundle, &self.namespace) {
            Ok(results) => results,
            Err(source) => {
                log::error!("policy bundle {} failed: {}", bundle_name, source);
                evidence.errors.push(EvalFailure::BundleExecution {
                    bundle: bundle_name,
                    source,
                });
                return evidence;
            }
        };

        let activities = Arc::new(vec![
            collected.activity.clone(),
            bundle_activity(&bundle_name),
            results_activity(),
        ]);

        for result in &results {
            match self.compile_result(result, &activities) {
                Ok((observation, findings)) => {
                    evidence.observations.push(observation);
                    evidence.findings.extend(findings);
                }
                Err(failure) => {
                    log::error!("skipping result of policy {}: {}", result.package, failure);
                    evidence.errors.push(failure);
                }
            }
        }

        log::debug!(
            "bundle {} produced {} observation(s) and {} finding(s)",
            bundle_name,
            evidence.observations.len(),
            evidence.findings.len()
        );
        evidence
    }

    fn compile_result(
        &self,
        result: &PolicyResult,
        activities: &Arc<Vec<Activity>>,
    ) -> Result<(Observation, Vec<Finding>), EvalFailure> {
        let observation_uuid = self.seeded_uuid("observation", result)?;
        let finding_uuid = self.seeded_uuid("finding", result)?;

        let collected = (self.clock)();
        let labels = self.labels(result);
        let package = &result.package;
        let violations = result.violations.len();

        let (title, description) = if result.passed() {
            (
                format!("Local SSH Validation on {} passed.", package),
                format!(
                    "Observed no violations on the {} policy within the Local SSH Compliance Plugin.",
                    package
                ),
            )
        } else {
            (
                format!(
                    "Local SSH Validation on {} failed with {} violation(s).",
                    package, violations
                ),
                format!(
                    "Observed {} violation(s) on the {} policy within the Local SSH Compliance Plugin.",
                    violations, package
                ),
            )
        };

        let observation = Observation {
            id: Uuid::new_v4(),
            uuid: observation_uuid,
            title,
            description,
            collected,
            expires: collected + Duration::hours(OBSERVATION_LIFETIME_HOURS),
            activities: Arc::clone(activities),
            relevant_evidence: vec![RelevantEvidence {
                description: format!(
                    "Policy {} was executed against the Local SSH configuration, using the Local SSH Compliance Plugin",
                    package
                ),
            }],
            labels: labels.clone(),
            descriptors: Arc::clone(&self.descriptors),
        };

        let finding = |title: String, description: String, violation: Option<&Violation>| {
            Finding {
                id: Uuid::new_v4(),
                uuid: finding_uuid,
                title,
                description,
                remarks: violation.map(|v| v.remarks.clone()).unwrap_or_default(),
                status: if violation.is_some() {
                    FindingStatus::NotSatisfied
                } else {
                    FindingStatus::Satisfied
                },
                collected,
                related_observations: vec![observation.id],
                labels: labels.clone(),
                descriptors: Arc::clone(&self.descriptors),
            }
        };

        let findings = if result.passed() {
            vec![finding(
                format!("No violations found on {}", package),
                format!(
                    "No violations found on the {} policy within the Local SSH Compliance Plugin.",
                    package
                ),
                None,
            )]
        } else {
            result
                .violations
                .iter()
                .map(|violation| {
                    let title = if violation.title.is_empty() {
                        format!("Violation found on {}", package)
                    } else {
                        violation.title.clone()
                    };
                    let description = if violation.description.is_empty() {
                        format!(
                            "A violation of the {} policy was found within the Local SSH Compliance Plugin.",
                            package
                        )
                    } else {
                        violation.description.clone()
                    };
                    finding(title, description, Some(violation))
                })
                .collect()
        };

        Ok((observation, findings))
    }

    fn seeded_uuid(&self, kind: &str, result: &PolicyResult) -> Result<Uuid, EvalFailure> {
        let seed = merge_seed(
            &self.subject_attributes,
            [
                ("type", kind),
                ("policy", result.package.as_str()),
                ("policy_file", result.file.as_str()),
                ("policy_path", result.bundle_path.as_str()),
            ],
        );
        seeded_uuid(&seed).map_err(|source| EvalFailure::IdentitySeed {
            policy: result.package.clone(),
            source,
        })
    }

    fn labels(&self, result: &PolicyResult) -> Labels {
        Labels::from([
            ("type".to_string(), "ssh".to_string()),
            ("host".to_string(), self.hostname.clone()),
            ("_policy".to_string(), result.package.clone()),
            ("_policy_path".to_string(), result.file.clone()),
        ])
    }
}

fn collection_activity(steps: Vec<ProvenanceStep>) -> Activity {
    Activity::new(
        "Collect SSH configuration",
        "Collect the effective SSH configuration from the host machine and prepare it for policy evaluation.",
    )
    .with_steps(steps)
}

fn bundle_activity(bundle: &str) -> Activity {
    Activity::new(
        "Execute policy",
        "Prepare and compile policy bundles, and execute them using the prepared SSH configuration data.",
    )
    .with_steps([
        ProvenanceStep::new(
            "Compile policy bundle",
            "Using a locally addressed policy path, compile the policy files to an in memory executable.",
        )
        .with_remarks(format!("Policy bundle: {}", bundle)),
        ProvenanceStep::new(
            "Execute policy bundle",
            "Using previously collected JSON-formatted SSH configuration, execute the compiled policies.",
        ),
    ])
}

fn results_activity() -> Activity {
    Activity::new(
        "Compile results",
        "Turn policy results into observations and findings.",
    )
    .with_steps([ProvenanceStep::new(
        "Compile Results",
        "Using previously calculated results from the policy execution, compile the results into observations and findings.",
    )])
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use sshd_kit::{FetchError, PolicyError};
    use std::cell::RefCell;

    pub(crate) struct FakeFetcher {
        config: Option<StructuredConfig>,
    }

    impl FakeFetcher {
        pub(crate) fn ok(config: StructuredConfig) -> Self {
            Self {
                config: Some(config),
            }
        }

        pub(crate) fn failing() -> Self {
            Self { config: None }
        }
    }

    impl SshFetcher for FakeFetcher {
        fn fetch_ssh_configuration(&self) -> Result<Fetched, FetchFailure> {
            let step = ProvenanceStep::new("Fetch SSH configuration from host machine", "test");
            match &self.config {
                Some(config) => Ok(Fetched {
                    config: config.clone(),
                    steps: vec![step],
                }),
                None => Err(FetchFailure {
                    error: FetchError::NonZeroExit {
                        command: "sshd -T".to_string(),
                        exit_code: 255,
                        stderr: "no hostkeys available".to_string(),
                    },
                    steps: vec![step],
                }),
            }
        }
    }

    type Evaluate = dyn Fn(&StructuredConfig, &Path) -> Result<Vec<PolicyResult>, PolicyError>;

    pub(crate) struct FakeExecutor {
        evaluate: Box<Evaluate>,
        pub(crate) calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeExecutor {
        pub(crate) fn new(
            evaluate: impl Fn(&StructuredConfig, &Path) -> Result<Vec<PolicyResult>, PolicyError>
                + 'static,
        ) -> Self {
            Self {
                evaluate: Box::new(evaluate),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PolicyExecutor for FakeExecutor {
        fn execute(
            &self,
            config: &StructuredConfig,
            bundle_path: &Path,
            _namespace: &str,
        ) -> Result<Vec<PolicyResult>, PolicyError> {
            self.calls.borrow_mut().push(bundle_path.to_path_buf());
            (self.evaluate)(config, bundle_path)
        }
    }

    /// Flags password authentication, fails bundle "A", passes everything else
    pub(crate) fn password_policy_executor() -> FakeExecutor {
        FakeExecutor::new(|config, bundle| {
            if bundle == Path::new("A") {
                return Err(PolicyError::EmptyBundle(bundle.to_path_buf()));
            }
            let bundle_path = bundle.display().to_string();
            let mut result =
                PolicyResult::new("ssh.password_auth", "password_auth.esp", bundle_path);
            if config.get("passwordauthentication") == Some(&["yes".to_string()][..]) {
                result = result.with_violation(
                    Violation::new(
                        "password auth enabled",
                        "PasswordAuthentication must be disabled",
                    )
                    .with_remark("severity", "high"),
                );
            }
            Ok(vec![result])
        })
    }

    pub(crate) fn sample_config() -> StructuredConfig {
        vec![
            ("port", vec!["22".to_string()]),
            ("passwordauthentication", vec!["yes".to_string()]),
        ]
        .into_iter()
        .collect()
    }

    fn fixed_clock(hour: u32) -> impl Fn() -> DateTime<Utc> {
        move || Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn compiler(hour: u32) -> EvidenceCompiler {
        EvidenceCompiler::new(&SubjectResolver::new("bastion-01"), "sshd_config")
            .with_clock(fixed_clock(hour))
    }

    fn bundles(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_failing_policy_scenario() {
        let executor = password_policy_executor();
        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["policies"]),
        );

        assert!(compiled.is_success());
        assert_eq!(compiled.observations.len(), 1);
        assert_eq!(compiled.findings.len(), 1);

        let observation = &compiled.observations[0];
        assert!(observation.title.contains("1 violation(s)"));
        assert_eq!(observation.expires - observation.collected, Duration::hours(24));
        assert_eq!(observation.labels["_policy"], "ssh.password_auth");
        assert_eq!(observation.labels["_policy_path"], "password_auth.esp");
        assert_eq!(observation.labels["host"], "bastion-01");
        assert_eq!(observation.labels["type"], "ssh");

        let finding = &compiled.findings[0];
        assert_eq!(finding.title, "password auth enabled");
        assert_eq!(finding.status, FindingStatus::NotSatisfied);
        assert_eq!(finding.related_observations, vec![observation.id]);
        assert_eq!(finding.remarks["severity"], "high");
    }

    #[test]
    fn test_passing_policy_yields_one_satisfied_finding() {
        let executor = password_policy_executor();
        let mut config = StructuredConfig::new();
        config.insert("passwordauthentication", ["no"]);

        let compiled = compiler(8).compile(
            &FakeFetcher::ok(config),
            &executor,
            &bundles(&["policies"]),
        );

        assert_eq!(compiled.observations.len(), 1);
        assert!(compiled.observations[0].title.ends_with("passed."));
        assert_eq!(compiled.findings.len(), 1);
        assert_eq!(compiled.findings[0].status, FindingStatus::Satisfied);
        assert_eq!(
            compiled.findings[0].title,
            "No violations found on ssh.password_auth"
        );
    }

    #[test]
    fn test_violations_fan_out_to_findings() {
        let executor = FakeExecutor::new(|_, bundle| {
            Ok(vec![PolicyResult::new("ssh.hardening", "hardening.esp", bundle.display().to_string())
                .with_violation(Violation::new("root login enabled", "PermitRootLogin is yes"))
                .with_violation(Violation::new("", ""))
                .with_violation(Violation::new("x11 forwarding", "X11Forwarding is yes"))])
        });

        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["policies"]),
        );

        assert_eq!(compiled.observations.len(), 1);
        assert!(compiled.observations[0].description.contains("3 violation(s)"));
        assert_eq!(compiled.findings.len(), 3);
        assert!(compiled
            .findings
            .iter()
            .all(|f| f.status == FindingStatus::NotSatisfied
                && f.related_observations == vec![compiled.observations[0].id]));
        assert_eq!(compiled.findings[1].title, "Violation found on ssh.hardening");
        assert!(compiled.findings[1].description.contains("ssh.hardening"));
    }

    #[test]
    fn test_fetch_failure_is_fatal() {
        let executor = password_policy_executor();
        let compiled = compiler(8).compile(
            &FakeFetcher::failing(),
            &executor,
            &bundles(&["A", "B"]),
        );

        assert!(compiled.observations.is_empty());
        assert!(compiled.findings.is_empty());
        assert!(executor.calls.borrow().is_empty());

        let error = compiled.error.unwrap();
        assert_eq!(error.len(), 1);
        assert!(matches!(error.iter().next(), Some(EvalFailure::Fetch(_))));
    }

    #[test]
    fn test_bundle_failure_is_isolated() {
        let executor = password_policy_executor();
        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["A", "B"]),
        );

        assert_eq!(*executor.calls.borrow(), bundles(&["A", "B"]));
        assert_eq!(compiled.observations.len(), 1);
        assert_eq!(compiled.observations[0].labels["_policy"], "ssh.password_auth");

        let error = compiled.error.unwrap();
        assert_eq!(error.len(), 1);
        assert!(matches!(
            error.iter().next(),
            Some(EvalFailure::BundleExecution { bundle, .. }) if bundle == "A"
        ));
    }

    #[test]
    fn test_unseedable_result_is_skipped() {
        let executor = FakeExecutor::new(|_, bundle| {
            let path = bundle.display().to_string();
            Ok(vec![
                PolicyResult::new("", "anonymous.esp", path.clone()),
                PolicyResult::new("ssh.port", "port.esp", path),
            ])
        });

        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["policies"]),
        );

        assert_eq!(compiled.observations.len(), 1);
        assert_eq!(compiled.observations[0].labels["_policy"], "ssh.port");
        assert!(matches!(
            compiled.error.unwrap().iter().next(),
            Some(EvalFailure::IdentitySeed { .. })
        ));
    }

    #[test]
    fn test_identity_is_stable_across_runs() {
        let executor = password_policy_executor();
        let fetcher = FakeFetcher::ok(sample_config());
        let paths = bundles(&["policies"]);

        let first = compiler(8).compile(&fetcher, &executor, &paths);
        let second = compiler(9).compile(&fetcher, &executor, &paths);

        let (a, b) = (&first.observations[0], &second.observations[0]);
        assert_eq!(a.uuid, b.uuid);
        assert_ne!(a.id, b.id);
        assert_ne!(a.collected, b.collected);

        assert_eq!(first.findings[0].uuid, second.findings[0].uuid);
        assert_ne!(first.findings[0].id, second.findings[0].id);
        assert_ne!(a.uuid, first.findings[0].uuid);
    }

    #[test]
    fn test_identity_depends_on_bundle_path() {
        let executor = password_policy_executor();
        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["B", "C"]),
        );

        assert_eq!(compiled.observations.len(), 2);
        assert_ne!(compiled.observations[0].uuid, compiled.observations[1].uuid);
    }

    #[test]
    fn test_activity_trail_and_shared_descriptors() {
        let executor = password_policy_executor();
        let compiled = compiler(8).compile(
            &FakeFetcher::ok(sample_config()),
            &executor,
            &bundles(&["policies"]),
        );

        let observation = &compiled.observations[0];
        let titles: Vec<_> = observation
            .activities
            .iter()
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec!["Collect SSH configuration", "Execute policy", "Compile results"]
        );
        assert_eq!(
            observation.activities[0].steps[0].title,
            "Fetch SSH configuration from host machine"
        );
        assert!(Arc::ptr_eq(
            &observation.descriptors,
            &compiled.findings[0].descriptors
        ));
    }
}
