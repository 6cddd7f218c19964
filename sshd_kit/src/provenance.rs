//! Provenance trail types
//!
//! Steps describe one stage of evidence production (collection, compilation,
//! execution). Activities group steps under a heading. Both are attached to
//! every emitted observation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceStep {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ProvenanceStep {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            remarks: None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub title: String,
    pub description: String,
    pub steps: Vec<ProvenanceStep>,
}

impl Activity {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = ProvenanceStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn push_step(&mut self, step: ProvenanceStep) {
        self.steps.push(step);
    }
}
