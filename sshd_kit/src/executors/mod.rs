//! # Executors Module
//!
//! Executors validate collected data against state requirements:
//! - SshdConfigExecutor: directive presence, value and record validation

pub mod sshd_config;

pub use sshd_config::SshdConfigExecutor;
