//! Structured SSH daemon configuration
//!
//! `sshd -T` prints the effective configuration as one `directive value...`
//! pair per line, with directive names already lower-cased. Directives may
//! repeat (`listenaddress`, `hostkey`, ...) and a single line may carry several
//! whitespace separated values (`authorizedkeysfile a b`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Effective daemon configuration keyed by lower-cased directive name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredConfig {
    directives: BTreeMap<String, Vec<String>>,
}

impl StructuredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stdout of `sshd -T`
    pub fn parse(output: &str) -> Result<Self, ParseError> {
        let mut config = Self::new();

        for (index, raw) in output.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let directive = match tokens.next() {
                Some(d) => d,
                None => continue,
            };

            if !directive
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(ParseError::InvalidDirective {
                    line: index + 1,
                    directive: directive.to_string(),
                });
            }

            let values = config.directives.entry(directive.to_lowercase()).or_default();
            values.extend(tokens.map(str::to_string));
        }

        if config.directives.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(config)
    }

    /// Insert values for a directive, appending to any existing values
    pub fn insert<I, S>(&mut self, directive: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives
            .entry(directive.to_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn get(&self, directive: &str) -> Option<&[String]> {
        self.directives
            .get(&directive.to_lowercase())
            .map(Vec::as_slice)
    }

    pub fn contains(&self, directive: &str) -> bool {
        self.directives.contains_key(&directive.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.directives.iter()
    }

    /// JSON object form handed to policies (`{"port": ["22"], ...}`)
    pub fn to_json_value(&self) -> serde_json::Value {
        let map = self
            .directives
            .iter()
            .map(|(k, v)| {
                let values = v.iter().cloned().map(serde_json::Value::String).collect();
                (k.clone(), serde_json::Value::Array(values))
            })
            .collect();
        serde_json::Value::Object(map)
    }

    /// Canonical byte form (sorted keys) used for evidence hashing
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // BTreeMap keeps directive order stable across runs
        serde_json::to_vec(&self.directives).unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for StructuredConfig {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        let mut config = Self::new();
        for (directive, values) in iter {
            let directive: String = directive.into();
            config.insert(&directive, values);
        }
        config
    }
}

/// Errors produced while parsing `sshd -T` output
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("sshd output contained no configuration directives")]
    Empty,
    #[error("invalid directive '{directive}' on line {line}")]
    InvalidDirective { line: usize, directive: String },
}
