//! Evaluation orchestrator
//!
//! Entry point used by the host. One evaluation walks
//! `Idle -> Configuring -> Fetching -> Evaluating(n)* -> Reporting -> Idle`.
//! `Configuring` binds the options last set through [`Plugin::configure`] to
//! the run. The configuration is fetched once, every bundle is visited in
//! order, and whatever evidence was compiled is handed to the sink even when
//! some bundles failed.
//!
//! The fetch is a single blocking command and is not interrupted by a
//! [`CancelToken`]; the command timeout bounds how long a cancellation can be
//! delayed. A cancellation observed once the fetch returns discards its
//! result and reports nothing.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sshd_kit::{EspPolicyExecutor, LocalSshFetcher, PolicyExecutor, SshFetcher};

use crate::compiler::{CompiledEvidence, EvidenceCompiler};
use crate::config::PluginOptions;
use crate::errors::{EvalFailure, JoinedError};
use crate::sink::EvidenceSink;
use crate::subject::SubjectResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Configuring,
    Fetching,
    /// Index of the bundle being evaluated
    Evaluating(usize),
    Reporting,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Configuring => write!(f, "configuring"),
            RunState::Fetching => write!(f, "fetching"),
            RunState::Evaluating(index) => write!(f, "evaluating bundle #{}", index + 1),
            RunState::Reporting => write!(f, "reporting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalStatus {
    Success,
    Failure,
}

/// Outcome reported back to the host
#[derive(Debug)]
pub struct EvalResult {
    pub status: EvalStatus,
    pub error: Option<JoinedError>,
    pub observations: usize,
    pub findings: usize,
    /// States visited, in order
    pub states: Vec<RunState>,
}

/// Host-controlled cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Run {
    state: RunState,
    states: Vec<RunState>,
}

impl Run {
    fn start() -> Self {
        Self {
            state: RunState::Idle,
            states: vec![RunState::Idle],
        }
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("evaluation state {} -> {}", self.state, next);
        self.state = next;
        self.states.push(next);
    }
}

/// The SSH compliance plugin
pub struct Plugin {
    subject: SubjectResolver,
    options: PluginOptions,
}

impl Plugin {
    pub fn new(subject: SubjectResolver) -> Self {
        Self {
            subject,
            options: PluginOptions::default(),
        }
    }

    /// Apply host options. Never fails; unknown or malformed values fall back
    /// to defaults.
    pub fn configure(&mut self, options: &HashMap<String, String>) {
        self.options = PluginOptions::from_map(options);
        log::info!(
            "configured local ssh plugin (sudo: {}, namespace: {})",
            self.options.sudo,
            self.options.policy_namespace
        );
    }

    pub fn hostname(&self) -> &str {
        self.subject.hostname()
    }

    /// Evaluate the local daemon against every policy bundle
    pub fn eval(
        &self,
        policy_paths: &[PathBuf],
        sink: &mut dyn EvidenceSink,
        cancel: &CancelToken,
    ) -> EvalResult {
        let fetcher = LocalSshFetcher::with_timeout(self.options.sudo, self.options.command_timeout);
        self.eval_with(&fetcher, &EspPolicyExecutor::new(), policy_paths, sink, cancel)
    }

    /// Evaluate with explicit collaborators
    pub fn eval_with(
        &self,
        fetcher: &dyn SshFetcher,
        executor: &dyn PolicyExecutor,
        policy_paths: &[PathBuf],
        sink: &mut dyn EvidenceSink,
        cancel: &CancelToken,
    ) -> EvalResult {
        let mut run = Run::start();
        let mut compiled = CompiledEvidence::default();

        run.transition(RunState::Configuring);
        let compiler = EvidenceCompiler::new(&self.subject, &self.options.policy_namespace);

        if cancel.is_cancelled() {
            compiled.fail(EvalFailure::Cancelled {
                stage: "fetch".to_string(),
            });
            run.transition(RunState::Reporting);
            return finish(run, compiled, false);
        }

        run.transition(RunState::Fetching);
        let collected = match compiler.collect(fetcher) {
            Ok(collected) => collected,
            Err(failure) => {
                compiled.fail(failure);
                run.transition(RunState::Reporting);
                return finish(run, compiled, false);
            }
        };

        if cancel.is_cancelled() {
            log::warn!("evaluation cancelled during fetch, discarding configuration");
            compiled.fail(EvalFailure::Cancelled {
                stage: "evaluation".to_string(),
            });
            run.transition(RunState::Reporting);
            return finish(run, compiled, false);
        }
        sink.configuration_collected(&collected.config);

        for (index, bundle) in policy_paths.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!("evaluation cancelled, skipping remaining policy bundles");
                compiled.fail(EvalFailure::Cancelled {
                    stage: format!("bundle {}", bundle.display()),
                });
                break;
            }
            run.transition(RunState::Evaluating(index));
            compiled.absorb(compiler.evaluate_bundle(&collected, executor, bundle));
        }

        run.transition(RunState::Reporting);
        if let Err(failure) = report(sink, &compiled) {
            compiled.fail(failure);
        }
        finish(run, compiled, true)
    }
}

fn report(sink: &mut dyn EvidenceSink, compiled: &CompiledEvidence) -> Result<(), EvalFailure> {
    log::debug!(
        "reporting {} observation(s) and {} finding(s)",
        compiled.observations.len(),
        compiled.findings.len()
    );
    sink.create_observations(&compiled.observations)
        .map_err(EvalFailure::Ingestion)?;
    sink.create_findings(&compiled.findings)
        .map_err(EvalFailure::Ingestion)?;
    sink.finish().map_err(EvalFailure::Ingestion)
}

fn finish(mut run: Run, compiled: CompiledEvidence, reported: bool) -> EvalResult {
    run.transition(RunState::Idle);

    let status = if compiled.is_success() {
        EvalStatus::Success
    } else {
        EvalStatus::Failure
    };

    match &compiled.error {
        Some(error) => log::error!(
            "evaluation finished with {} error(s){}",
            error.len(),
            if reported { "" } else { ", no evidence reported" }
        ),
        None => log::info!(
            "evaluation finished: {} observation(s), {} finding(s)",
            compiled.observations.len(),
            compiled.findings.len()
        ),
    }

    EvalResult {
        status,
        observations: compiled.observations.len(),
        findings: compiled.findings.len(),
        error: compiled.error,
        states: run.states,
    }
}
