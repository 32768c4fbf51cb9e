//! Declarative routing rules
//!
//! A rule file is a JSON array of `{"url", "key", "value"}` objects. Rules are
//! evaluated in file order and the first rule whose key holds an equal string
//! value wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{DecodeError, RuleError};

/// A decoded record payload
pub type Message = Map<String, Value>;

/// Maps a JSON key and value to the URL matching records are posted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub url: String,
    pub key: String,
    pub value: String,
}

impl Rule {
    pub fn new(url: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Non-string values never match, even if their text would.
    pub fn matches(&self, message: &Message) -> bool {
        matches!(message.get(&self.key), Some(Value::String(v)) if *v == self.value)
    }
}

/// Ordered, immutable set of routing rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Reads and parses a rule file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, RuleError> {
        let rules: Vec<Rule> = serde_json::from_slice(bytes)?;
        Ok(Self { rules })
    }

    /// Returns the URL of the first matching rule
    pub fn find_destination(&self, message: &Message) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map(|rule| rule.url.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

/// Decodes a payload into a key/value message.
///
/// JSON `null` decodes to an empty message; any other non-object is rejected.
pub fn decode_message(payload: &[u8]) -> Result<Message, DecodeError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(_) => Err(DecodeError::NotAnObject("array")),
        Value::String(_) => Err(DecodeError::NotAnObject("string")),
        Value::Number(_) => Err(DecodeError::NotAnObject("number")),
        Value::Bool(_) => Err(DecodeError::NotAnObject("bool")),
    }
}
