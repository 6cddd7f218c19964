//! # SSHD Compliance Agent
//!
//! Evaluates the effective configuration of the local SSH daemon against ESP
//! policy bundles and reports observations and findings.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate a directory of policies
//! sshd_agent /etc/sshd_agent/policies/
//!
//! # Collect through sudo and write a signed evidence envelope
//! sshd_agent --sudo -o evidence.json policies/
//!
//! # Use a configuration file
//! sshd_agent -c sshd_agent.toml
//! ```
//!
//! Exit codes: 0 success, 1 evaluation failure, 2 usage or configuration error.

mod cli;
mod compiler;
mod config;
mod errors;
mod evidence;
mod identity;
mod orchestrator;
mod output;
mod signing;
mod sink;
mod subject;

use clap::Parser;

use cli::Cli;
use orchestrator::{CancelToken, EvalStatus, Plugin};
use output::ReportSink;
use subject::SubjectResolver;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

/// `RUST_LOG` overrides the level picked from `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let config = cli.into_run_config()?;

    let mut plugin = Plugin::new(SubjectResolver::from_env());
    plugin.configure(&config.options);

    let mut sink = ReportSink::new(config.output.clone(), config.quiet, plugin.hostname());
    let result = plugin.eval(&config.policy_paths, &mut sink, &CancelToken::new());
    log::debug!(
        "reported {} observation(s) and {} finding(s), states: {:?}",
        result.observations,
        result.findings,
        result.states
    );

    match result.status {
        EvalStatus::Success => Ok(0),
        EvalStatus::Failure => {
            if let Some(error) = &result.error {
                for failure in error.iter() {
                    log::error!("{}", failure);
                }
            }
            Ok(1)
        }
    }
}
