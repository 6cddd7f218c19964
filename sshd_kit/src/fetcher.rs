//! SSH configuration fetcher
//!
//! Runs `sshd -T` (optionally through `sudo`) and converts the dump into a
//! [`StructuredConfig`]. Every fetch reports the provenance steps it went
//! through, including on failure, so the collection method is always part of
//! the evidence trail.

use std::path::Path;
use std::time::Duration;

use execution_engine::strategies::SystemCommandExecutor;

use crate::commands::create_sshd_command_executor;
use crate::provenance::ProvenanceStep;
use crate::sshd_config::{ParseError, StructuredConfig};

const SSHD_DESCRIPTION: &str = "Fetch SSH configuration from host machine, using `sshd -T` command. \
This will output the final configuration values used by the SSH service on the host machine.";

/// Successful fetch: configuration plus the steps used to obtain it
#[derive(Debug, Clone)]
pub struct Fetched {
    pub config: StructuredConfig,
    pub steps: Vec<ProvenanceStep>,
}

/// Failed fetch: the error plus whatever steps ran before it
#[derive(Debug)]
pub struct FetchFailure {
    pub error: FetchError,
    pub steps: Vec<ProvenanceStep>,
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Errors that can occur while fetching the daemon configuration
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to execute '{command}': {reason}")]
    Command { command: String, reason: String },
    #[error("'{command}' exited with status {exit_code}: {stderr}")]
    NonZeroExit {
        command: String,
        exit_code: i64,
        stderr: String,
    },
    #[error("failed to convert SSH configuration: {0}")]
    Parse(#[from] ParseError),
}

/// Source of the effective SSH daemon configuration
pub trait SshFetcher {
    fn fetch_ssh_configuration(&self) -> Result<Fetched, FetchFailure>;
}

/// Fetches the configuration of the daemon installed on this machine
#[derive(Clone)]
pub struct LocalSshFetcher {
    sudo: bool,
    timeout: Option<Duration>,
    executor: SystemCommandExecutor,
}

impl LocalSshFetcher {
    pub fn new(sudo: bool) -> Self {
        Self::with_timeout(sudo, None)
    }

    pub fn with_timeout(sudo: bool, timeout: Option<Duration>) -> Self {
        Self {
            sudo,
            timeout,
            executor: create_sshd_command_executor(timeout),
        }
    }

    /// Find sshd binary path
    fn find_sshd(&self) -> &'static str {
        for path in &["/usr/sbin/sshd", "/usr/local/sbin/sshd"] {
            if Path::new(path).exists() {
                return path;
            }
        }
        "sshd" // Fall back to PATH lookup
    }

    /// Program and arguments for the collection command
    fn command_line(&self, sshd: &'static str) -> (&'static str, Vec<&'static str>) {
        if self.sudo {
            ("sudo", vec![sshd, "-T"])
        } else {
            (sshd, vec!["-T"])
        }
    }

    fn collection_step(&self) -> ProvenanceStep {
        if self.sudo {
            ProvenanceStep::new(
                "Fetch SSH configuration from host machine using sudo",
                SSHD_DESCRIPTION,
            )
            .with_remarks(
                "`sshd -T` is used to collect SSH information in aggregate, from all \
configurations files known by the SSH software package. Sudo is used to elevate \
privileges for the collection of configuration.",
            )
        } else {
            ProvenanceStep::new("Fetch SSH configuration from host machine", SSHD_DESCRIPTION)
                .with_remarks(
                    "`sshd -T` is used to collect SSH information in aggregate, from all \
configurations files known by the SSH software package.",
                )
        }
    }

    fn conversion_step() -> ProvenanceStep {
        ProvenanceStep::new(
            "Convert collected SSH configuration to JSON format",
            "Convert SSH configuration collected by plugin to JSON format. This makes the \
configuration accessible for policy engines to validate and assert policy controls.",
        )
    }
}

impl SshFetcher for LocalSshFetcher {
    fn fetch_ssh_configuration(&self) -> Result<Fetched, FetchFailure> {
        let (program, args) = self.command_line(self.find_sshd());
        self.fetch_with(program, &args)
    }
}

impl LocalSshFetcher {
    fn fetch_with(&self, program: &str, args: &[&str]) -> Result<Fetched, FetchFailure> {
        let steps = vec![self.collection_step()];

        let command = format!("{} {}", program, args.join(" "));
        log::debug!("fetching local ssh configuration: {}", command);

        match self.executor.execute(program, args, self.timeout) {
            Ok(output) => interpret_output(
                command,
                i64::from(output.exit_code),
                &output.stdout,
                &output.stderr,
                steps,
            ),
            Err(e) => {
                log::error!("Failed to fetch SSH configuration ({}): {}", command, e);
                Err(FetchFailure {
                    error: FetchError::Command {
                        command,
                        reason: e.to_string(),
                    },
                    steps,
                })
            }
        }
    }
}

/// Turn the output of a finished collection command into a fetch outcome
fn interpret_output(
    command: String,
    exit_code: i64,
    stdout: &str,
    stderr: &str,
    mut steps: Vec<ProvenanceStep>,
) -> Result<Fetched, FetchFailure> {
    if exit_code != 0 {
        log::error!(
            "Failed to fetch SSH configuration ({}): exit {}",
            command,
            exit_code
        );
        return Err(FetchFailure {
            error: FetchError::NonZeroExit {
                command,
                exit_code,
                stderr: stderr.trim().to_string(),
            },
            steps,
        });
    }

    log::debug!("converting ssh configuration to json map for evaluation");
    steps.push(LocalSshFetcher::conversion_step());

    match StructuredConfig::parse(stdout) {
        Ok(config) => {
            log::debug!(
                "ssh configuration prepared for evaluation ({} directives)",
                config.len()
            );
            Ok(Fetched { config, steps })
        }
        Err(e) => {
            log::error!("Failed to convert SSH config to map: {}", e);
            Err(FetchFailure {
                error: e.into(),
                steps,
            })
        }
    }
}
