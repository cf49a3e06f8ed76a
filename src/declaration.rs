//! Raw declaration schema and readers
//!
//! A [`Declaration`] is what a project author writes: every field is optional
//! and nothing is validated yet. The readers accept TOML, YAML, JSON and the
//! literal subset of a Sphinx `conf.py`. All of them go through the same
//! `serde_json::Value` intermediate so alias handling and unknown-key
//! collection behave identically whatever the source format.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::conf_py;
use crate::error::ConfigurationError;

/// Suffix of the Sphinx-style keys that enable sub-features of one extension,
/// e.g. `myst_enable_extensions`.
const ENABLE_EXTENSIONS_SUFFIX: &str = "_enable_extensions";

/// Key prefixes whose owning extension is not named after the prefix itself.
/// When several extensions read the same key, the enabled one wins; the first
/// listed is used when none of them is enabled.
const PREFIX_OWNERS: &[(&str, &[&str])] = &[("myst", &["myst_parser", "myst_nb"])];

/// Every top-level key the schema reads, canonical names and Sphinx aliases
const RECOGNIZED_KEYS: &[&str] = &[
    "project_name",
    "project",
    "author_name",
    "author",
    "enabled_extensions",
    "extensions",
    "extension_options",
    "template_paths",
    "templates_path",
    "static_asset_paths",
    "html_static_path",
    "theme_name",
    "html_theme",
];

/// Whether `key` feeds a [`Declaration`] field, either directly, through an
/// alias, or as a `<prefix>_enable_extensions` sub-feature list
pub fn is_recognized_key(key: &str) -> bool {
    RECOGNIZED_KEYS.contains(&key) || is_sub_feature_key(key)
}

fn is_sub_feature_key(key: &str) -> bool {
    key.len() > ENABLE_EXTENSIONS_SUFFIX.len() && key.ends_with(ENABLE_EXTENSIONS_SUFFIX)
}

/// The unvalidated declaration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Declaration {
    #[serde(alias = "project")]
    pub project_name: Option<String>,
    #[serde(alias = "author")]
    pub author_name: Option<String>,
    #[serde(alias = "extensions")]
    pub enabled_extensions: Option<Vec<String>>,
    pub extension_options: Option<IndexMap<String, Vec<String>>>,
    #[serde(alias = "templates_path")]
    pub template_paths: Option<Vec<PathBuf>>,
    #[serde(alias = "html_static_path")]
    pub static_asset_paths: Option<Vec<PathBuf>>,
    #[serde(alias = "html_theme")]
    pub theme_name: Option<String>,
    /// Top-level keys the schema does not recognise, in source order
    #[serde(skip)]
    pub unknown_keys: Vec<String>,
}

/// Source formats a declaration can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationFormat {
    Toml,
    Yaml,
    Json,
    ConfPy,
}

impl DeclarationFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(DeclarationFormat::Toml),
            "yaml" | "yml" => Some(DeclarationFormat::Yaml),
            "json" => Some(DeclarationFormat::Json),
            "py" => Some(DeclarationFormat::ConfPy),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationFormat::Toml => write!(f, "toml"),
            DeclarationFormat::Yaml => write!(f, "yaml"),
            DeclarationFormat::Json => write!(f, "json"),
            DeclarationFormat::ConfPy => write!(f, "conf.py"),
        }
    }
}

impl Declaration {
    /// Read a declaration file, choosing the format from its extension
    pub fn read(path: &Path) -> Result<Self, ConfigurationError> {
        let format = DeclarationFormat::from_path(path).ok_or_else(|| {
            ConfigurationError::parse(
                path.display().to_string(),
                "unsupported declaration format (expected .toml, .yaml, .yml, .json or .py)",
            )
        })?;

        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Reading {} declaration from {}", format, path.display());
        Self::parse_as(&content, format, &path.display().to_string())
    }

    /// Parse a declaration held in memory
    pub fn from_str_with_format(
        content: &str,
        format: DeclarationFormat,
    ) -> Result<Self, ConfigurationError> {
        Self::parse_as(content, format, &format!("{} declaration", format))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        Self::from_str_with_format(content, DeclarationFormat::Toml)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        Self::from_str_with_format(content, DeclarationFormat::Yaml)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        Self::from_str_with_format(content, DeclarationFormat::Json)
    }

    pub fn from_conf_py_str(content: &str) -> Result<Self, ConfigurationError> {
        Self::from_str_with_format(content, DeclarationFormat::ConfPy)
    }

    fn parse_as(
        content: &str,
        format: DeclarationFormat,
        source_name: &str,
    ) -> Result<Self, ConfigurationError> {
        let value: Value = match format {
            DeclarationFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigurationError::parse(source_name, e))?,
            DeclarationFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigurationError::parse(source_name, e))?,
            DeclarationFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigurationError::parse(source_name, e))?,
            DeclarationFormat::ConfPy => {
                Value::Object(conf_py::parse_assignments(content, source_name)?)
            }
        };

        Self::from_value(value, source_name)
    }

    /// Build a declaration from an already-parsed mapping
    pub fn from_value(value: Value, source_name: &str) -> Result<Self, ConfigurationError> {
        let mut map = match value {
            Value::Object(map) => map,
            // An empty YAML document parses as null
            Value::Null => Map::new(),
            other => {
                return Err(ConfigurationError::parse(
                    source_name,
                    format!("expected a mapping at the top level, found {}", value_kind(&other)),
                ))
            }
        };

        let sub_feature_keys: Vec<String> = map
            .keys()
            .filter(|key| is_sub_feature_key(key))
            .cloned()
            .collect();

        let mut sub_features = Vec::with_capacity(sub_feature_keys.len());
        for key in sub_feature_keys {
            let Some(raw) = map.remove(&key) else {
                continue;
            };
            let features: Vec<String> = serde_json::from_value(raw)
                .map_err(|e| ConfigurationError::parse(source_name, format!("{}: {}", key, e)))?;
            let prefix = key[..key.len() - ENABLE_EXTENSIONS_SUFFIX.len()].to_string();
            sub_features.push((prefix, features));
        }

        let mut unknown_keys = Vec::new();
        let mut declaration: Declaration =
            serde_ignored::deserialize(Value::Object(map), |path: serde_ignored::Path| {
                unknown_keys.push(path.to_string());
            })
            .map_err(|e| ConfigurationError::parse(source_name, e))?;
        declaration.unknown_keys = unknown_keys;

        for (prefix, features) in sub_features {
            let enabled = declaration.enabled_extensions.as_deref().unwrap_or_default();
            let extension = owning_extension(&prefix, enabled);
            debug!(
                "Folding {} sub-feature(s) into extension_options for '{}'",
                features.len(),
                extension
            );
            declaration
                .extension_options
                .get_or_insert_with(IndexMap::new)
                .entry(extension)
                .or_default()
                .extend(features);
        }

        Ok(declaration)
    }
}

/// Map a `<prefix>_enable_extensions` prefix to the extension it configures
fn owning_extension(prefix: &str, enabled: &[String]) -> String {
    let Some((_, owners)) = PREFIX_OWNERS.iter().find(|(p, _)| *p == prefix) else {
        return prefix.to_string();
    };
    owners
        .iter()
        .find(|owner| enabled.iter().any(|e| e.as_str() == **owner))
        .or_else(|| owners.first())
        .map(|owner| owner.to_string())
        .unwrap_or_else(|| prefix.to_string())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
