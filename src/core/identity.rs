//! Record identity using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Record type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Costing job (one part on one machine with one material)
    Job,
    /// Machine catalog record
    Mach,
    /// Material catalog record
    Mat,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Job => "JOB",
            EntityPrefix::Mach => "MACH",
            EntityPrefix::Mat => "MAT",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[EntityPrefix::Job, EntityPrefix::Mach, EntityPrefix::Mat]
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JOB" => Ok(EntityPrefix::Job),
            "MACH" => Ok(EntityPrefix::Mach),
            "MAT" => Ok(EntityPrefix::Mat),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique record identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    /// Get the record prefix
    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing record IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (valid: JOB, MACH, MAT)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
