//! Configuration for the SSHD agent
//!
//! Host options arrive as a flat string map, either from the `[plugin]` table
//! of a TOML file or from command line flags. [`PluginOptions`] is the typed
//! view the orchestrator works with.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sshd_kit::contracts::SSHD_CONFIG_CTN_TYPE;

/// Option keys understood by the plugin
pub const OPTION_SUDO: &str = "sudo";
pub const OPTION_POLICY_NAMESPACE: &str = "policy_namespace";
pub const OPTION_COMMAND_TIMEOUT: &str = "command_timeout_secs";

/// Optional TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Options handed to the plugin's configure step
    pub plugin: HashMap<String, String>,

    /// Policy bundles evaluated when none are given on the command line
    pub policy_paths: Vec<PathBuf>,

    /// Evidence envelope output file
    pub output: Option<PathBuf>,

    pub quiet: bool,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully merged configuration for one agent run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub options: HashMap<String, String>,
    pub policy_paths: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

/// Typed plugin options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    pub sudo: bool,
    pub policy_namespace: String,
    pub command_timeout: Option<Duration>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            sudo: false,
            policy_namespace: SSHD_CONFIG_CTN_TYPE.to_string(),
            command_timeout: None,
        }
    }
}

impl PluginOptions {
    /// Interpret a host option map. Unknown keys are ignored and malformed
    /// values fall back to defaults, so configuring never fails.
    pub fn from_map(options: &HashMap<String, String>) -> Self {
        let mut parsed = Self::default();

        if let Some(sudo) = options.get(OPTION_SUDO) {
            parsed.sudo = matches!(sudo.trim(), "true" | "1");
        }

        if let Some(namespace) = options.get(OPTION_POLICY_NAMESPACE) {
            let namespace = namespace.trim();
            if !namespace.is_empty() {
                parsed.policy_namespace = namespace.to_string();
            }
        }

        if let Some(timeout) = options.get(OPTION_COMMAND_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => parsed.command_timeout = Some(Duration::from_secs(secs)),
                _ => log::warn!(
                    "ignoring invalid {} '{}', using the default timeout",
                    OPTION_COMMAND_TIMEOUT,
                    timeout
                ),
            }
        }

        parsed
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid option '{0}', expected KEY=VALUE")]
    InvalidOption(String),
    #[error("no policy paths given")]
    NoPolicyPaths,
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_options() {
        let options = PluginOptions::from_map(&HashMap::new());
        assert_eq!(options, PluginOptions::default());
        assert_eq!(options.policy_namespace, "sshd_config");
        assert!(!options.sudo);
    }

    #[test]
    fn test_sudo_accepts_true_and_one() {
        assert!(PluginOptions::from_map(&map(&[("sudo", "true")])).sudo);
        assert!(PluginOptions::from_map(&map(&[("sudo", "1")])).sudo);
        assert!(!PluginOptions::from_map(&map(&[("sudo", "yes")])).sudo);
        assert!(!PluginOptions::from_map(&map(&[("sudo", "false")])).sudo);
    }

    #[test]
    fn test_namespace_and_timeout() {
        let options = PluginOptions::from_map(&map(&[
            ("policy_namespace", "hardened_ssh"),
            ("command_timeout_secs", "30"),
        ]));
        assert_eq!(options.policy_namespace, "hardened_ssh");
        assert_eq!(options.command_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_timeout_is_ignored() {
        let options = PluginOptions::from_map(&map(&[("command_timeout_secs", "soon")]));
        assert_eq!(options.command_timeout, None);
    }

    #[test]
    fn test_parse_toml_config() {
        let config = AgentConfig::from_toml_str(
            r#"
policy_paths = ["/etc/sshd_agent/policies"]
output = "evidence.json"

[plugin]
sudo = "true"
policy_namespace = "sshd_config"
"#,
        )
        .unwrap();

        assert_eq!(config.policy_paths, vec![PathBuf::from("/etc/sshd_agent/policies")]);
        assert_eq!(config.output, Some(PathBuf::from("evidence.json")));
        assert_eq!(config.plugin["sudo"], "true");
        assert!(!config.quiet);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = AgentConfig::from_toml_str("format = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AgentConfig::load(Path::new("/nonexistent/sshd_agent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
