//! # SSHD Kit
//!
//! Collection and policy evaluation building blocks for SSH daemon compliance.
//! Provides the effective-configuration fetcher, the `sshd -T` parser, and the
//! ESP strategy used to evaluate policy bundles against the fetched data.
//!
//! ## Modules
//!
//! - `sshd_config` - Structured representation of `sshd -T` output
//! - `fetcher` - `SshFetcher` trait and the local `sshd -T` implementation
//! - `provenance` - Steps and activities describing how evidence was produced
//! - `policy` - `PolicyExecutor` trait, policy results, ESP-backed executor
//! - `collectors` / `contracts` / `executors` - ESP strategy for `sshd_config`
//! - `commands` - Whitelisted command executor for collection
//! - `discovery` - Policy file discovery inside a bundle path
//! - `execution_api` - Thin wrappers around the ESP compile/execute pipeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sshd_kit::fetcher::{LocalSshFetcher, SshFetcher};
//! use sshd_kit::policy::{EspPolicyExecutor, PolicyExecutor};
//!
//! let fetched = LocalSshFetcher::new(false).fetch_ssh_configuration()?;
//! let results = EspPolicyExecutor::new().execute(
//!     &fetched.config,
//!     Path::new("policies/"),
//!     "sshd_config",
//! )?;
//! ```

pub mod collectors;
pub mod commands;
pub mod contracts;
pub mod discovery;
pub mod execution_api;
pub mod executors;
pub mod fetcher;
pub mod policy;
pub mod provenance;
pub mod sshd_config;

pub use fetcher::{FetchError, FetchFailure, Fetched, LocalSshFetcher, SshFetcher};
pub use policy::{EspPolicyExecutor, PolicyError, PolicyExecutor, PolicyResult, Violation};
pub use provenance::{Activity, ProvenanceStep};
pub use sshd_config::{ParseError, StructuredConfig};
