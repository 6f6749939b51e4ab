use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Latest balance value observed on a watched document
///
/// Each notification replaces the previous snapshot wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub value: i64,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub received_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Snapshot of `value`, stamped with the current time
    pub fn new(value: i64) -> Self {
        Self {
            value,
            received_at: Utc::now(),
        }
    }
}

/// Path of a document in the remote document store
///
/// Made of alternating collection and document segments, e.g.
/// `payments/user-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Path of `document_id` inside `collection`
    pub fn new(collection: &str, document_id: &str) -> Result<Self, ValidationError> {
        format!("{}/{}", collection, document_id).parse()
    }

    /// Collection holding the document
    pub fn collection(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    pub fn document_id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for DocumentPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s
            .trim_matches('/')
            .split('/')
            .map(|segment| segment.to_string())
            .collect();

        if segments.len() % 2 != 0 || segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(ValidationError::InvalidDocumentPath(s.to_string()));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl Serialize for DocumentPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DocumentPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
