//! Command-line interface parsing

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{AgentConfig, ConfigError, RunConfig, OPTION_POLICY_NAMESPACE, OPTION_SUDO};

/// Evaluate the effective SSH daemon configuration against compliance policies
#[derive(Debug, Parser)]
#[command(name = "sshd_agent", version, about)]
pub struct Cli {
    /// Policy bundles: an .esp file or a directory of .esp files
    #[arg(value_name = "POLICY_PATH")]
    pub policy_paths: Vec<PathBuf>,

    /// Run `sshd -T` through sudo
    #[arg(long)]
    pub sudo: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the signed evidence envelope to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Policy namespace (ESP CTN type) the policies are written against
    #[arg(long, value_name = "NAME")]
    pub namespace: Option<String>,

    /// Additional plugin option
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Suppress console output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge the optional config file with command line flags. Flags win.
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };

        let mut options: HashMap<String, String> = file.plugin;
        options.extend(self.options);
        if self.sudo {
            options.insert(OPTION_SUDO.to_string(), "true".to_string());
        }
        if let Some(namespace) = self.namespace {
            options.insert(OPTION_POLICY_NAMESPACE.to_string(), namespace);
        }

        let policy_paths = if self.policy_paths.is_empty() {
            file.policy_paths
        } else {
            self.policy_paths
        };
        if policy_paths.is_empty() {
            return Err(ConfigError::NoPolicyPaths);
        }

        Ok(RunConfig {
            options,
            policy_paths,
            output: self.output.or(file.output),
            quiet: self.quiet || file.quiet,
        })
    }
}

fn parse_option(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::InvalidOption(raw.to_string())),
    }
}
