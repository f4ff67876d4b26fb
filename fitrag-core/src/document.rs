//! Indexable documents
//!
//! A [`Document`] is the canonical `(text, metadata)` rendering of one source
//! record. Metadata values are scalars only, because vector stores filter on
//! flat predicates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Metadata key that every document carries
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the numeric source-row id
pub const ID_KEY: &str = "id";

/// Which source table a document was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A row of the `exercise` table
    Exercise,
    /// A row of the `food_item` table
    FoodItem,
}

impl SourceKind {
    /// All source kinds, in build order
    pub const ALL: [SourceKind; 2] = [SourceKind::Exercise, SourceKind::FoodItem];

    /// Tag stored under the `source` metadata key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::FoodItem => "food_item",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exercise" => Ok(Self::Exercise),
            "food_item" => Ok(Self::FoodItem),
            other => Err(Error::InvalidInput(format!("unknown source table: {other}"))),
        }
    }
}

/// A scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Text(String),
}

impl MetadataValue {
    /// Borrow as a string if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the equivalent JSON scalar
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<SourceKind> for MetadataValue {
    fn from(value: SourceKind) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

/// Flat document metadata, ordered by key
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A canonical, indexable rendering of one source record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, `"{source}:{row id}"`
    pub id: String,
    /// Human-readable text that gets embedded
    pub text: String,
    /// Filterable scalar fields; always has `source` and `id`
    pub metadata: Metadata,
}

impl Document {
    /// Build a document for a source row.
    ///
    /// `source` and `id` are written into the metadata here so no caller can
    /// forget them.
    pub fn new(source: SourceKind, row_id: i64, text: String, mut metadata: Metadata) -> Self {
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        metadata.insert(ID_KEY.to_string(), MetadataValue::Int(row_id));
        Self {
            id: format!("{source}:{row_id}"),
            text,
            metadata,
        }
    }

    /// The source tag, if present and well-formed
    pub fn source(&self) -> Option<SourceKind> {
        self.metadata
            .get(SOURCE_KEY)
            .and_then(MetadataValue::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// The numeric source-row id
    pub fn row_id(&self) -> Option<i64> {
        match self.metadata.get(ID_KEY) {
            Some(MetadataValue::Int(id)) => Some(*id),
            _ => None,
        }
    }
}

/// Exact-match predicate on one metadata key
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    /// Metadata key
    pub key: String,
    /// Required value
    pub value: MetadataValue,
}

impl MetadataFilter {
    /// Predicate `key == value`
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Predicate `source == kind`
    pub fn source(kind: SourceKind) -> Self {
        Self::eq(SOURCE_KEY, kind)
    }

    /// Check the predicate against a metadata map
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.key) == Some(&self.value)
    }
}
