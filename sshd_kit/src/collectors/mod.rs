//! # Data Collectors Module

pub mod sshd_config;

pub use sshd_config::SshdConfigCollector;
