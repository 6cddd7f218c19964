//! SSHD configuration CTN contract
//!
//! Exposes the effective SSH daemon configuration to ESP policies, either as a
//! whole record or one directive at a time.

use execution_engine::strategies::{
    CollectionMode, CollectionStrategy, CtnContract, ObjectFieldSpec, PerformanceHints,
    StateFieldSpec,
};
use execution_engine::types::common::{DataType, Operation};

/// Default CTN type, also the default policy namespace
pub const SSHD_CONFIG_CTN_TYPE: &str = "sshd_config";

const STRING_OPERATIONS: [Operation; 6] = [
    Operation::Equals,
    Operation::NotEqual,
    Operation::Contains,
    Operation::NotContains,
    Operation::StartsWith,
    Operation::EndsWith,
];

/// Create contract for the sshd configuration CTN type
///
/// `ctn_type` is the policy namespace the host asked for; policies address the
/// configuration through that name.
pub fn create_sshd_config_contract(ctn_type: &str) -> CtnContract {
    let mut contract = CtnContract::new(ctn_type.to_string());

    // Object requirements
    contract
        .object_requirements
        .add_optional_field(ObjectFieldSpec {
            name: "directive".to_string(),
            data_type: DataType::String,
            description: "sshd directive to inspect (omit to inspect the whole record)"
                .to_string(),
            example_values: vec![
                "permitrootlogin".to_string(),
                "passwordauthentication".to_string(),
                "listenaddress".to_string(),
            ],
            validation_notes: Some("Case-insensitive; sshd -T prints lower-case names".to_string()),
        });

    // State requirements
    contract
        .state_requirements
        .add_optional_field(StateFieldSpec {
            name: "record".to_string(),
            data_type: DataType::RecordData,
            allowed_operations: vec![Operation::Equals],
            description: "Record validation over the full directive map".to_string(),
            example_values: vec!["See record_checks".to_string()],
            validation_notes: Some("Every directive maps to an array of strings".to_string()),
        });

    contract
        .state_requirements
        .add_optional_field(StateFieldSpec {
            name: "present".to_string(),
            data_type: DataType::Boolean,
            allowed_operations: vec![Operation::Equals, Operation::NotEqual],
            description: "Whether the directive appears in the effective configuration"
                .to_string(),
            example_values: vec!["true".to_string(), "false".to_string()],
            validation_notes: None,
        });

    contract
        .state_requirements
        .add_optional_field(StateFieldSpec {
            name: "value".to_string(),
            data_type: DataType::String,
            allowed_operations: STRING_OPERATIONS.to_vec(),
            description: "First value of the directive".to_string(),
            example_values: vec!["no".to_string(), "prohibit-password".to_string()],
            validation_notes: Some("Empty string when the directive is absent".to_string()),
        });

    contract
        .state_requirements
        .add_optional_field(StateFieldSpec {
            name: "values".to_string(),
            data_type: DataType::String,
            allowed_operations: STRING_OPERATIONS.to_vec(),
            description: "All values of the directive joined by a single space".to_string(),
            example_values: vec!["[::]:22 0.0.0.0:22".to_string()],
            validation_notes: None,
        });

    contract
        .state_requirements
        .add_optional_field(StateFieldSpec {
            name: "count".to_string(),
            data_type: DataType::Int,
            allowed_operations: vec![
                Operation::Equals,
                Operation::NotEqual,
                Operation::GreaterThan,
                Operation::LessThan,
                Operation::GreaterThanOrEqual,
                Operation::LessThanOrEqual,
            ],
            description: "Number of values for the directive, or directives in the record"
                .to_string(),
            example_values: vec!["1".to_string(), "2".to_string()],
            validation_notes: None,
        });

    // Field mappings
    contract
        .field_mappings
        .collection_mappings
        .object_to_collection
        .insert("directive".to_string(), "directive".to_string());

    contract
        .field_mappings
        .collection_mappings
        .required_data_fields = vec!["config".to_string(), "present".to_string()];

    contract
        .field_mappings
        .collection_mappings
        .optional_data_fields = vec![
        "value".to_string(),
        "values".to_string(),
        "count".to_string(),
    ];

    for (state, data) in [
        ("record", "config"),
        ("present", "present"),
        ("value", "value"),
        ("values", "values"),
        ("count", "count"),
    ] {
        contract
            .field_mappings
            .validation_mappings
            .state_to_data
            .insert(state.to_string(), data.to_string());
    }

    // Collection strategy - data is served from the pre-fetched configuration
    contract.collection_strategy = CollectionStrategy {
        collector_type: "sshd_config".to_string(),
        collection_mode: CollectionMode::Content,
        required_capabilities: vec!["sshd_config_snapshot".to_string()],
        performance_hints: PerformanceHints {
            expected_collection_time_ms: Some(0),
            memory_usage_mb: Some(1),
            network_intensive: false,
            cpu_intensive: false,
            requires_elevated_privileges: false,
        },
    };

    contract
}
