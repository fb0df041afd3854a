// ABOUTME: Typed value union for preference values
// ABOUTME: Closed tagged enum with exact-type semantics and a lossless serialized form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a preference value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceType {
    String,
    Bool,
    Int,
    Float,
    Json,
}

impl PreferenceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeTag(pub String);

impl fmt::Display for UnknownTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown preference type tag: {}", self.0)
    }
}

impl std::error::Error for UnknownTypeTag {}

impl FromStr for PreferenceType {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "bool" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "json" => Ok(Self::Json),
            _ => Err(UnknownTypeTag(s.to_string())),
        }
    }
}

/// A preference value. Adjacently tagged so the declared shape survives the
/// round trip: an `Int(7)` never comes back as a `Float(7.0)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PreferenceValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl PreferenceValue {
    /// The runtime shape of this value.
    pub fn kind(&self) -> PreferenceType {
        match self {
            Self::String(_) => PreferenceType::String,
            Self::Bool(_) => PreferenceType::Bool,
            Self::Int(_) => PreferenceType::Int,
            Self::Float(_) => PreferenceType::Float,
            Self::Json(_) => PreferenceType::Json,
        }
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PreferenceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PreferenceValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<serde_json::Value> for PreferenceValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}
