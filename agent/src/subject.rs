//! Subject resolution
//!
//! Identifies the machine being assessed and builds the static descriptors
//! attached to every piece of evidence.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::evidence::{Component, Descriptors, InventoryItem, OriginActor, SubjectReference};
use crate::identity::SeedAttributes;

pub const UNKNOWN_HOSTNAME: &str = "unknown";

const SSH_COMPONENT_ID: &str = "common-components/ssh";

/// Identity of the assessed machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectResolver {
    hostname: String,
}

impl SubjectResolver {
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Self {
                hostname: UNKNOWN_HOSTNAME.to_string(),
            };
        }
        Self { hostname }
    }

    /// Resolve from the `HOSTNAME` environment variable
    pub fn from_env() -> Self {
        match std::env::var("HOSTNAME") {
            Ok(hostname) if !hostname.trim().is_empty() => Self::new(hostname),
            _ => {
                log::warn!(
                    "HOSTNAME is not set, evidence will be attributed to '{}'",
                    UNKNOWN_HOSTNAME
                );
                Self::new(UNKNOWN_HOSTNAME)
            }
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Attributes identifying the machine instance, used to seed evidence UUIDs
    pub fn subject_attributes(&self) -> SeedAttributes {
        BTreeMap::from([
            ("type".to_string(), "machine-instance".to_string()),
            ("hostname".to_string(), self.hostname.clone()),
        ])
    }

    pub fn descriptors(&self) -> Arc<Descriptors> {
        Arc::new(Descriptors {
            subjects: vec![
                SubjectReference {
                    subject_type: "component".to_string(),
                    title: "SSH Component".to_string(),
                    attributes: BTreeMap::from([
                        ("type".to_string(), "software".to_string()),
                        ("software".to_string(), "ssh".to_string()),
                    ]),
                },
                SubjectReference {
                    subject_type: "inventory-item".to_string(),
                    title: "Machine Instance".to_string(),
                    attributes: self.subject_attributes(),
                },
            ],
            components: vec![Component {
                identifier: SSH_COMPONENT_ID.to_string(),
                component_type: "software".to_string(),
                title: "Secure Shell (SSH)".to_string(),
                description: "SSH daemon providing remote shell access to the machine."
                    .to_string(),
                purpose: "Secure remote administration of the machine.".to_string(),
            }],
            inventory: vec![InventoryItem {
                identifier: format!("machine-instance/{}", self.hostname),
                item_type: "operating-system".to_string(),
                title: format!("Machine Instance {}", self.hostname),
                props: BTreeMap::from([("hostname".to_string(), self.hostname.clone())]),
                implemented_components: vec![SSH_COMPONENT_ID.to_string()],
            }],
            actors: vec![
                OriginActor {
                    title: "The Continuous Compliance Framework".to_string(),
                    actor_type: "assessment-platform".to_string(),
                },
                OriginActor {
                    title: "Continuous Compliance Framework - Local SSH Plugin".to_string(),
                    actor_type: "tool".to_string(),
                },
            ],
        })
    }
}
