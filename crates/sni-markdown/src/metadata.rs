//! Document metadata parsed from the front matter block.
//!
//! Metadata is an ordered YAML mapping. Callers with a fixed schema
//! deserialize it into their own types with [`Metadata::deserialize`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

/// Error type for metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The block is not valid YAML.
    #[error("Invalid YAML: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The block is valid YAML but not a mapping.
    #[error("Front matter must be a mapping, found {0}")]
    NotMapping(&'static str),

    /// The mapping does not fit the requested type.
    #[error("Metadata does not match the expected shape: {0}")]
    Deserialize(#[source] serde_yaml::Error),

    /// The mapping could not be written back as YAML.
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Key/value data from a document's front matter, in document order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(Mapping);

impl Metadata {
    /// Parse metadata from the raw text of a front matter block.
    ///
    /// Empty content (or content holding only comments) gives empty
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or is not a mapping.
    pub fn from_yaml(content: &str) -> Result<Self, MetadataError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        match serde_yaml::from_str(trimmed).map_err(MetadataError::Parse)? {
            Value::Mapping(mapping) => Ok(Self(mapping)),
            Value::Null => Ok(Self::default()),
            other => Err(MetadataError::NotMapping(value_kind(&other))),
        }
    }

    /// Parse metadata, discarding the reason it is absent.
    #[must_use]
    pub fn parse(content: &str) -> Option<Self> {
        Self::from_yaml(content).ok()
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value stored under `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// String keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|(key, _)| key.as_str())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying mapping.
    #[must_use]
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Consume into the underlying mapping.
    #[must_use]
    pub fn into_mapping(self) -> Mapping {
        self.0
    }

    /// Deserialize into a caller-defined type.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, MetadataError> {
        serde_yaml::from_value(Value::Mapping(self.0.clone())).map_err(MetadataError::Deserialize)
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented as YAML.
    pub fn to_yaml(&self) -> Result<String, MetadataError> {
        serde_yaml::to_string(&self.0).map_err(MetadataError::Serialize)
    }
}

impl From<Mapping> for Metadata {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
