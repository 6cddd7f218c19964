//! # CTN Contracts Module
//!
//! Contract definitions specify the interface requirements for each CTN type:
//! - Object requirements: What fields objects must provide
//! - State requirements: What fields can be validated and with which operations
//! - Field mappings: How to map between ESP field names and collected data
//! - Collection strategy: Performance hints and capabilities

pub mod sshd_config;

pub use sshd_config::{create_sshd_config_contract, SSHD_CONFIG_CTN_TYPE};
