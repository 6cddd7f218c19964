//! SSH daemon command executor configuration
//!
//! Provides a whitelisted command executor for collecting the effective
//! SSH daemon configuration.

use execution_engine::strategies::SystemCommandExecutor;
use std::time::Duration;

/// Upper bound applied when the host does not configure a timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Create command executor configured for `sshd -T` collection
///
/// Whitelist includes:
/// - sshd: OpenSSH daemon (PATH lookup and the usual sbin locations)
/// - sudo: privilege elevation when the host requests it
pub fn create_sshd_command_executor(timeout: Option<Duration>) -> SystemCommandExecutor {
    let mut executor =
        SystemCommandExecutor::with_timeout(timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT));

    executor.allow_commands(&[
        "sshd",                // Standard PATH lookup
        "/usr/sbin/sshd",      // Debian, RHEL, Alpine
        "/usr/local/sbin/sshd", // Source builds, BSD ports
        "sudo",
        "/usr/bin/sudo",
    ]);

    executor
}
