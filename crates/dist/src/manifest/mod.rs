//! # Package Manifests
//!
//! This module provides the types for reading and editing `package.json` manifests.
//!
//! A manifest is kept as an ordered JSON object so that keys this crate knows nothing
//! about survive a read-modify-write cycle verbatim and in their original order. Only
//! the five entry-point fields in [`Field`] are ever interpreted or written, and their
//! expected values are modeled by the closed [`FieldValue`] variant rather than raw JSON.
//!
//! ## Key Types
//!
//! - [`Manifest`] - an ordered JSON object with typed access to the entry-point fields.
//! - [`Field`] - the recognized entry-point fields.
//! - [`FieldValue`] - a path, a path map (`browser`) or a conditions tree (`exports`).
//! - [`Conditions`] - one node of a conditional exports map.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

mod writer;

pub use writer::set_in_order;

/// The conventional manifest filename.
pub const MANIFEST_NAME: &str = "package.json";

/// The key holding this tool's configuration inside a manifest.
pub const CONFIG_FIELD: &str = "distill";

/// The order manifest fields are kept in, relative to keys which already exist.
pub const CANONICAL_ORDER: [&str; 7] = [
    "version",
    "description",
    "main",
    "module",
    "umd:main",
    "browser",
    "exports",
];

//================================================================================================
// Types
//================================================================================================

/// The entry-point fields this crate computes and reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// `main`, the CommonJS build.
    Main,
    /// `module`, the ES module build.
    Module,
    /// `umd:main`, the minified UMD build.
    UmdMain,
    /// `browser`, replacements used by browser-targeting bundlers.
    Browser,
    /// `exports`, the conditional exports map.
    Exports,
}

/// An ordered map of export conditions to their targets.
pub type ExportsMap = IndexMap<String, Conditions>;

/// A node in a conditional exports tree.
///
/// Consumers evaluate conditions first-match, so insertion order is significant.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditions {
    /// A path the condition resolves to.
    Target(String),
    /// A nested set of conditions.
    Nested(ExportsMap),
    /// A raw value supplied through `exports.extra`, never interpreted.
    Extra(Value),
}

/// The expected value of a manifest field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A single file path (`main`, `module`, `umd:main`).
    Path(String),
    /// A map of source paths to replacement paths (`browser`).
    PathMap(IndexMap<String, String>),
    /// A conditional exports map (`exports`).
    Conditions(ExportsMap),
}

/// A `package.json` manifest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest(Map<String, Value>);

//================================================================================================
// Impls
//================================================================================================

impl Field {
    /// Every field, in the order they are reconciled.
    pub const ALL: [Field; 5] = [
        Field::Main,
        Field::Module,
        Field::UmdMain,
        Field::Browser,
        Field::Exports,
    ];

    /// The manifest key of this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Main => "main",
            Field::Module => "module",
            Field::UmdMain => "umd:main",
            Field::Browser => "browser",
            Field::Exports => "exports",
        }
    }

    /// Whether a build cannot proceed without this field.
    pub fn is_mandatory(self) -> bool {
        matches!(self, Field::Main)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Conditions> for Value {
    fn from(conditions: &Conditions) -> Self {
        match conditions {
            Conditions::Target(path) => Value::String(path.clone()),
            Conditions::Nested(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
            Conditions::Extra(value) => value.clone(),
        }
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Path(path) => Value::String(path.clone()),
            FieldValue::PathMap(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            FieldValue::Conditions(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl FieldValue {
    /// Whether `actual` holds exactly this value. Object key order is not significant.
    pub fn matches(&self, actual: &Value) -> bool {
        Value::from(self) == *actual
    }
}

impl Manifest {
    /// Parses a manifest, attributing failures to `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content)
            .map(Manifest)
            .map_err(|source| Error::Json {
                source,
                path: path.to_owned(),
            })
    }

    /// Renders the manifest the way it is written to disk.
    pub fn to_pretty_string(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(&self.0)?;
        out.push('\n');
        Ok(out)
    }

    /// The package name, if declared.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The declared value of a field.
    pub fn get(&self, field: Field) -> Option<&Value> {
        self.0.get(field.as_str())
    }

    /// Whether a field is declared at all.
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(field.as_str())
    }

    /// Sets a field, keeping the canonical field order (see [`set_in_order`]).
    pub fn set_field(&mut self, field: Field, value: &FieldValue) {
        set_in_order(&mut self.0, field, Value::from(value));
    }

    /// Deserializes this tool's configuration object, defaulting when it is absent.
    pub fn config<T: DeserializeOwned + Default>(&self) -> std::result::Result<T, serde_json::Error> {
        match self.0.get(CONFIG_FIELD) {
            Some(value) => serde_json::from_value(value.clone()),
            None => Ok(T::default()),
        }
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The keys of the manifest, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(map: Map<String, Value>) -> Self {
        Manifest(map)
    }
}

impl TryFrom<Value> for Manifest {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        serde_json::from_value(value).map(Manifest)
    }
}
