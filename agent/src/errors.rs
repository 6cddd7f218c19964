//! Evaluation error accumulation
//!
//! A run keeps going after a bundle or a single policy fails, so errors are
//! collected into a [`JoinedError`] instead of aborting on the first one.

use std::fmt;

use sshd_kit::{FetchError, PolicyError};

use crate::identity::IdentityError;
use crate::sink::SinkError;

/// One failure observed during an evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvalFailure {
    #[error("failed to fetch ssh configuration: {0}")]
    Fetch(#[source] FetchError),
    #[error("policy bundle {bundle} failed: {source}")]
    BundleExecution {
        bundle: String,
        #[source]
        source: PolicyError,
    },
    #[error("failed to seed identity for policy {policy}: {source}")]
    IdentitySeed {
        policy: String,
        #[source]
        source: IdentityError,
    },
    #[error("failed to hand evidence to host: {0}")]
    Ingestion(#[source] SinkError),
    #[error("evaluation cancelled before {stage}")]
    Cancelled { stage: String },
}

/// Ordered collection of failures, displayed one per line
#[derive(Debug, Default)]
pub struct JoinedError {
    errors: Vec<EvalFailure>,
}

impl JoinedError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(mut self, error: EvalFailure) -> Self {
        self.push(error);
        self
    }

    pub fn push(&mut self, error: EvalFailure) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: JoinedError) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvalFailure> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was joined
    pub fn into_result(self) -> Result<(), JoinedError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_option(self) -> Option<JoinedError> {
        self.into_result().err()
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedError {}

impl From<EvalFailure> for JoinedError {
    fn from(error: EvalFailure) -> Self {
        Self::new().join(error)
    }
}
