//! The validated build configuration handed to the documentation generator

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Theme used when the declaration does not name one
pub const DEFAULT_THEME: &str = "alabaster";

/// Validated, immutable configuration for one build invocation.
///
/// Only [`ConfigLoader`](crate::loader::ConfigLoader) constructs this type, so
/// every instance satisfies the declaration invariants: a non-empty project
/// name, unique extensions, options only for enabled extensions and a
/// non-empty theme. Template and static paths are passed through untouched;
/// checking that they exist is left to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    pub(crate) project_name: String,
    pub(crate) author_name: String,
    pub(crate) enabled_extensions: Vec<String>,
    pub(crate) extension_options: IndexMap<String, IndexSet<String>>,
    pub(crate) template_paths: Vec<PathBuf>,
    pub(crate) static_asset_paths: Vec<PathBuf>,
    pub(crate) theme_name: String,
}

impl BuildConfiguration {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    /// Extensions in load order
    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    pub fn extension_options(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.extension_options
    }

    /// Template override directories, most specific first
    pub fn template_paths(&self) -> &[PathBuf] {
        &self.template_paths
    }

    pub fn static_asset_paths(&self) -> &[PathBuf] {
        &self.static_asset_paths
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    pub fn is_extension_enabled(&self, extension: &str) -> bool {
        self.enabled_extensions.iter().any(|e| e == extension)
    }

    /// Sub-features enabled for an extension, if it has any
    pub fn sub_features(&self, extension: &str) -> Option<&IndexSet<String>> {
        self.extension_options.get(extension)
    }

    /// Whether `feature` is switched on for `extension`
    pub fn has_sub_feature(&self, extension: &str, feature: &str) -> bool {
        self.sub_features(extension)
            .is_some_and(|features| features.contains(feature))
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.project_name)?;
        if !self.author_name.is_empty() {
            write!(f, " by {}", self.author_name)?;
        }
        write!(
            f,
            ": {} extension(s), theme '{}'",
            self.enabled_extensions.len(),
            self.theme_name
        )
    }
}
