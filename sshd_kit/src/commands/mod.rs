//! Command execution configurations for collection
//!
//! Provides whitelisted command executors for secure system scanning.

pub mod sshd;

pub use sshd::{create_sshd_command_executor, DEFAULT_COMMAND_TIMEOUT};
