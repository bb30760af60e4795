// mpn-common/src/manifest.rs
//! Loading of the JSON manifests the engine reads: package manifests
//! (`package.json`) and component declaration files (`*.json`).
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DEFAULT_ALTERNATE_OUTPUT_DIRNAME;

/// Key of the component declaration block inside page/component manifests.
pub const COMPONENTS_KEY: &str = "usingComponents";

/// Reads and parses a JSON file. Any failure yields an empty object.
pub fn load_json(path: &Path) -> Value {
    match fs::read_to_string(path) {
        Ok(content) => parse_json(&content).unwrap_or_else(|| {
            debug!("Treating malformed JSON at {} as empty", path.display());
            empty_object()
        }),
        Err(e) => {
            debug!("Could not read JSON at {}: {}", path.display(), e);
            empty_object()
        }
    }
}

/// Parses JSON text, returning `None` unless the document is an object.
pub fn parse_json(content: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Ordered `alias -> specifier` entries of the component declaration block.
pub fn component_declarations(manifest: &Value) -> Vec<(String, String)> {
    manifest
        .get(COMPONENTS_KEY)
        .and_then(Value::as_object)
        .map(|block| {
            block
                .iter()
                .filter_map(|(alias, spec)| {
                    spec.as_str()
                        .filter(|s| !s.is_empty())
                        .map(|s| (alias.clone(), s.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The subset of `package.json` the catalog cares about. A field of the
/// wrong type reads as missing without affecting the others.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default, deserialize_with = "string_field")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "version_field")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    pub main: Option<String>,
    /// Alternate output declaration: a directory name, or a flag. An
    /// explicit `null` is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "declared_field")]
    pub miniprogram: Option<Value>,
}

fn string_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn version_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn declared_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl PackageManifest {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn load(path: &Path) -> Self {
        Self::from_value(load_json(path))
    }

    /// Like [`PackageManifest::load`], but `None` when the file is missing,
    /// unreadable or not a JSON object.
    pub fn try_load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        parse_json(&content).map(Self::from_value)
    }

    /// Name of the directory to look in for an alternate build output.
    ///
    /// An absent declaration still checks the conventional directory; an
    /// explicit `false`/`null`/empty string opts the package out.
    pub fn alternate_output_dirname(&self) -> Option<String> {
        match &self.miniprogram {
            None => Some(DEFAULT_ALTERNATE_OUTPUT_DIRNAME.to_string()),
            Some(Value::String(dir)) => {
                let dir = dir.trim().trim_start_matches("./").trim_end_matches('/');
                if dir.is_empty() {
                    None
                } else {
                    Some(dir.to_string())
                }
            }
            Some(Value::Bool(false)) | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            Some(_) => Some(DEFAULT_ALTERNATE_OUTPUT_DIRNAME.to_string()),
        }
    }
}
