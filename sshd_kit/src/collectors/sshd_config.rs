//! SSHD Configuration Collector
//!
//! Serves the configuration fetched once per run to every ESP object that
//! asks for it. The `sshd -T` command is never re-run from here; the
//! collection method still names it so evidence stays traceable.

use std::sync::Arc;

use common::results::{CollectionMethod, CollectionMethodType};
use execution_engine::execution::BehaviorHints;
use execution_engine::strategies::{CollectedData, CollectionError, CtnContract, CtnDataCollector};
use execution_engine::types::common::{RecordData, ResolvedValue};
use execution_engine::types::execution_context::{ExecutableObject, ExecutableObjectElement};

use crate::sshd_config::StructuredConfig;

/// Collector backed by a pre-fetched [`StructuredConfig`]
#[derive(Clone)]
pub struct SshdConfigCollector {
    id: String,
    ctn_type: String,
    config: Arc<StructuredConfig>,
}

impl SshdConfigCollector {
    pub fn new(ctn_type: impl Into<String>, config: Arc<StructuredConfig>) -> Self {
        Self {
            id: "sshd-config-collector".to_string(),
            ctn_type: ctn_type.into(),
            config,
        }
    }

    /// Extract optional string field from object
    fn extract_string_field(
        &self,
        object: &ExecutableObject,
        field_name: &str,
    ) -> Result<Option<String>, CollectionError> {
        for element in &object.elements {
            if let ExecutableObjectElement::Field { name, value, .. } = element {
                if name == field_name {
                    match value {
                        ResolvedValue::String(s) => return Ok(Some(s.clone())),
                        _ => {
                            return Err(CollectionError::InvalidObjectConfiguration {
                                object_id: object.identifier.clone(),
                                reason: format!("Field '{}' must be a string", field_name),
                            });
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Fields describing one directive (or the whole record when `None`)
    fn directive_fields(&self, directive: Option<&str>) -> Vec<(&'static str, ResolvedValue)> {
        match directive {
            Some(name) => {
                let values = self.config.get(name).unwrap_or_default();
                vec![
                    ("present", ResolvedValue::Boolean(self.config.contains(name))),
                    (
                        "value",
                        ResolvedValue::String(values.first().cloned().unwrap_or_default()),
                    ),
                    ("values", ResolvedValue::String(values.join(" "))),
                    ("count", ResolvedValue::Integer(values.len() as i64)),
                ]
            }
            None => vec![
                ("present", ResolvedValue::Boolean(!self.config.is_empty())),
                ("count", ResolvedValue::Integer(self.config.len() as i64)),
            ],
        }
    }
}

impl CtnDataCollector for SshdConfigCollector {
    fn collect_for_ctn_with_hints(
        &self,
        object: &ExecutableObject,
        contract: &CtnContract,
        _hints: &BehaviorHints,
    ) -> Result<CollectedData, CollectionError> {
        self.validate_ctn_compatibility(contract)?;

        let directive = self
            .extract_string_field(object, "directive")?
            .map(|d| d.to_lowercase());

        let mut data = CollectedData::new(
            object.identifier.clone(),
            self.ctn_type.clone(),
            self.id.clone(),
        );

        let mut method_builder = CollectionMethod::builder()
            .method_type(CollectionMethodType::Command)
            .description("Effective SSH daemon configuration")
            .target(directive.as_deref().unwrap_or("sshd"))
            .command("sshd -T");
        if let Some(ref d) = directive {
            method_builder = method_builder.input("directive", d);
        }
        data.set_method(method_builder.build());

        let record = RecordData::from_json_value(self.config.to_json_value());
        data.add_field(
            "config".to_string(),
            ResolvedValue::RecordData(Box::new(record)),
        );

        if let Some(ref d) = directive {
            data.add_field("directive".to_string(), ResolvedValue::String(d.clone()));
        }
        for (name, value) in self.directive_fields(directive.as_deref()) {
            data.add_field(name.to_string(), value);
        }

        Ok(data)
    }

    fn supported_ctn_types(&self) -> Vec<String> {
        vec![self.ctn_type.clone()]
    }

    fn validate_ctn_compatibility(&self, contract: &CtnContract) -> Result<(), CollectionError> {
        if contract.ctn_type != self.ctn_type {
            return Err(CollectionError::CtnContractValidation {
                reason: format!(
                    "Incompatible CTN type: expected '{}', got '{}'",
                    self.ctn_type, contract.ctn_type
                ),
            });
        }
        Ok(())
    }

    fn collector_id(&self) -> &str {
        &self.id
    }

    fn supports_batch_collection(&self) -> bool {
        false
    }
}
