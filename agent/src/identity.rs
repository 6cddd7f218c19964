//! Deterministic evidence identity
//!
//! Observations and findings carry a UUID derived from a set of identifying
//! attributes, so the same policy evaluated against the same subject threads
//! into one history across runs. The attribute map is serialized with sorted
//! keys and hashed into a name-based (v5) UUID.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Identifying attributes of a piece of evidence
pub type SeedAttributes = BTreeMap<String, String>;

/// Errors raised while deriving a seeded identifier
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity seed has no attributes")]
    EmptySeed,
    #[error("identity attribute has an empty key")]
    EmptyKey,
    #[error("identity attribute '{0}' has an empty value")]
    EmptyValue(String),
    #[error("failed to serialize identity seed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Derive a stable UUID from identifying attributes.
///
/// Equal maps always yield the same UUID regardless of insertion order.
pub fn seeded_uuid(attributes: &SeedAttributes) -> Result<Uuid, IdentityError> {
    if attributes.is_empty() {
        return Err(IdentityError::EmptySeed);
    }

    for (key, value) in attributes {
        if key.is_empty() {
            return Err(IdentityError::EmptyKey);
        }
        if value.is_empty() {
            return Err(IdentityError::EmptyValue(key.clone()));
        }
    }

    let canonical = serde_json::to_vec(attributes)?;
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, &canonical))
}

/// Merge evidence-specific attributes over the subject's identifying attributes
pub fn merge_seed<I, K, V>(subject: &SeedAttributes, extra: I) -> SeedAttributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut seed = subject.clone();
    seed.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
    seed
}
