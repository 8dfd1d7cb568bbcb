//! Remote package metadata structures.
//!
//! [`PackageRecord`] is a semi-structured view of a package entry: the fields lodestone
//! consumes are typed and validated at the boundary, everything else the server sends is
//! kept in an open map and written back unchanged to the cache.
//!
//! Decoding is lenient about a few quirks seen in the wild:
//! - `id` may be a JSON string or number
//! - snake case aliases (`mc_versions`, `download_url`, `file_hash`) are accepted
//! - empty `downloadUrl` and `fileHash` strings are treated as absent
//! - `null` text fields become empty strings

use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::{Map, Value};

fn empty_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

fn null_is_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.unwrap_or_default())
}

fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-empty string or an integer")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.trim().is_empty() {
                return Err(E::invalid_value(de::Unexpected::Str(v), &self));
            }
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Package metadata as served by a repository.
///
/// # Required Fields
///
/// - `id` - package identifier, unique within one repository
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackageRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,

    #[serde(default, deserialize_with = "null_is_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_is_empty")]
    pub description: String,

    #[serde(default, deserialize_with = "null_is_empty")]
    pub author: String,

    /// Game versions the package supports. `None` when the server sent no list.
    #[serde(
        rename = "mcVersions",
        alias = "mc_versions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mc_versions: Option<Vec<String>>,

    #[serde(
        rename = "downloadUrl",
        alias = "download_url",
        default,
        deserialize_with = "empty_is_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,

    /// Hex SHA-256 of the artifact behind `download_url`.
    #[serde(
        rename = "fileHash",
        alias = "file_hash",
        default,
        deserialize_with = "empty_is_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_hash: Option<String>,

    /// Fields lodestone does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            author: String::new(),
            mc_versions: None,
            download_url: None,
            file_hash: None,
            extra: Map::new(),
        }
    }

    /// Decodes a record from an untyped JSON value.
    ///
    /// Fails unless `value` is an object with a usable `id`.
    pub fn from_value(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("expected a JSON object, got {}", json_kind(&value)));
        }
        serde_json::from_value(value).map_err(|err| err.to_string())
    }

    /// Case-insensitive substring match against name, description and author.
    ///
    /// `needle` must already be lower-cased. An empty needle matches everything.
    pub fn matches_query(&self, needle: &str) -> bool {
        needle.is_empty()
            || [&self.name, &self.description, &self.author]
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
    }

    /// Whether the record lists exactly `version` among its supported game versions.
    pub fn supports_version(&self, version: &str) -> bool {
        self.mc_versions
            .as_ref()
            .is_some_and(|versions| versions.iter().any(|v| v == version))
    }
}

/// Short name of a JSON value's type, for protocol error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The repository a search result came from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryRef {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// A search hit: an owned copy of the package record plus its origin.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchedPackage {
    #[serde(flatten)]
    pub record: PackageRecord,
    pub repository: RepositoryRef,
}

impl MatchedPackage {
    /// Pairs `record` with its origin.
    ///
    /// A `repository` key carried in the record's unknown fields is dropped so the flattened
    /// output has a single `repository` entry, the origin.
    pub fn new(mut record: PackageRecord, repository: RepositoryRef) -> Self {
        record.extra.remove("repository");
        Self {
            record,
            repository,
        }
    }
}
