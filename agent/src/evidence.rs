//! Evidence types handed to the host
//!
//! Descriptors (subjects, components, inventory, actors) are identical for
//! every piece of evidence in a run, so they are built once and shared
//! through an `Arc`. Activities are shared the same way per bundle.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sshd_kit::Activity;
use uuid::Uuid;

/// Free-form key/value labels attached to evidence
pub type Labels = BTreeMap<String, String>;

/// Reference to the thing evidence was collected about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectReference {
    #[serde(rename = "type")]
    pub subject_type: String,
    pub title: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub identifier: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub title: String,
    pub description: String,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub identifier: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub props: BTreeMap<String, String>,
    pub implemented_components: Vec<String>,
}

/// Who produced the evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginActor {
    pub title: String,
    #[serde(rename = "type")]
    pub actor_type: String,
}

/// Static descriptors shared by every observation and finding of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptors {
    pub subjects: Vec<SubjectReference>,
    pub components: Vec<Component>,
    pub inventory: Vec<InventoryItem>,
    pub actors: Vec<OriginActor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelevantEvidence {
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    /// Unique per emission
    pub id: Uuid,
    /// Stable across runs for the same subject and policy
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub collected: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub activities: Arc<Vec<Activity>>,
    pub relevant_evidence: Vec<RelevantEvidence>,
    pub labels: Labels,
    #[serde(flatten)]
    pub descriptors: Arc<Descriptors>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingStatus {
    Satisfied,
    NotSatisfied,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Satisfied => "satisfied",
            FindingStatus::NotSatisfied => "not-satisfied",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub id: Uuid,
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub remarks: BTreeMap<String, String>,
    pub status: FindingStatus,
    pub collected: DateTime<Utc>,
    /// `id` of the observation this finding was derived from
    pub related_observations: Vec<Uuid>,
    pub labels: Labels,
    #[serde(flatten)]
    pub descriptors: Arc<Descriptors>,
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(FindingStatus::NotSatisfied).unwrap(),
            serde_json::json!("not-satisfied")
        );
        assert_eq!(FindingStatus::Satisfied.to_string(), "satisfied");
    }

    #[test]
    fn test_descriptors_are_flattened_into_finding() {
        let descriptors = Arc::new(Descriptors {
            subjects: vec![],
            components: vec![],
            inventory: vec![],
            actors: vec![OriginActor {
                title: "tool".to_string(),
                actor_type: "tool".to_string(),
            }],
        });
        let finding = Finding {
            id: Uuid::new_v4(),
            uuid: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            remarks: BTreeMap::new(),
            status: FindingStatus::Satisfied,
            collected: Utc::now(),
            related_observations: vec![],
            labels: Labels::new(),
            descriptors,
        };

        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["actors"][0]["type"], "tool");
        assert_eq!(value["status"], "satisfied");
    }
}
