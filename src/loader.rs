//! Turns a [`Declaration`] into a validated [`BuildConfiguration`]
//!
//! Loading is a pure function of the declaration and the loader options: no
//! filesystem or network access happens here, and either a complete
//! configuration is returned or a [`ConfigurationError`] naming the offending
//! field. Nothing in between.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::collections::HashSet;

use crate::config::{BuildConfiguration, DEFAULT_THEME};
use crate::declaration::Declaration;
use crate::error::ConfigurationError;
use crate::theme::ThemeCatalog;

/// What to do with top-level keys the schema does not know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    /// Fail loading
    #[default]
    Reject,
    /// Log a warning and ignore the key
    Warn,
}

/// Knobs for [`ConfigLoader`]
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub unknown_keys: UnknownKeyPolicy,
    /// Theme used when the declaration names none
    pub default_theme: String,
    /// When set, the resolved theme must be one of these
    pub theme_catalog: Option<ThemeCatalog>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            unknown_keys: UnknownKeyPolicy::Reject,
            default_theme: DEFAULT_THEME.to_string(),
            theme_catalog: None,
        }
    }
}

impl LoaderOptions {
    pub fn with_unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn with_default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = theme.into();
        self
    }

    /// Request strict theme validation against `catalog`
    pub fn with_theme_catalog(mut self, catalog: ThemeCatalog) -> Self {
        self.theme_catalog = Some(catalog);
        self
    }
}

/// Validates declarations into build configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Validate `declaration` and build the immutable configuration
    pub fn load(&self, declaration: &Declaration) -> Result<BuildConfiguration, ConfigurationError> {
        self.check_unknown_keys(&declaration.unknown_keys)?;

        let project_name = match declaration.project_name.as_deref() {
            None => return Err(ConfigurationError::MissingField { field: "project_name" }),
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigurationError::EmptyField { field: "project_name" })
            }
            Some(name) => name.to_string(),
        };

        let enabled_extensions = validate_extensions(
            declaration.enabled_extensions.as_deref().unwrap_or_default(),
        )?;

        let extension_options = validate_extension_options(
            declaration.extension_options.as_ref(),
            &enabled_extensions,
        )?;

        let theme_name = self.resolve_theme(declaration.theme_name.as_deref())?;

        let config = BuildConfiguration {
            project_name,
            author_name: declaration.author_name.clone().unwrap_or_default(),
            enabled_extensions,
            extension_options,
            template_paths: declaration.template_paths.clone().unwrap_or_default(),
            static_asset_paths: declaration.static_asset_paths.clone().unwrap_or_default(),
            theme_name,
        };

        debug!("Loaded configuration: {}", config);
        Ok(config)
    }

    fn check_unknown_keys(&self, keys: &[String]) -> Result<(), ConfigurationError> {
        if keys.is_empty() {
            return Ok(());
        }
        match self.options.unknown_keys {
            UnknownKeyPolicy::Reject => Err(ConfigurationError::UnknownKeys {
                keys: keys.to_vec(),
            }),
            UnknownKeyPolicy::Warn => {
                for key in keys {
                    warn!("Ignoring unknown configuration key '{}'", key);
                }
                Ok(())
            }
        }
    }

    fn resolve_theme(&self, declared: Option<&str>) -> Result<String, ConfigurationError> {
        let theme = match declared {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigurationError::EmptyField { field: "theme_name" })
            }
            Some(name) => name.to_string(),
            None => {
                if self.options.default_theme.trim().is_empty() {
                    return Err(ConfigurationError::EmptyField { field: "default_theme" });
                }
                debug!("No theme declared, using '{}'", self.options.default_theme);
                self.options.default_theme.clone()
            }
        };

        if let Some(catalog) = &self.options.theme_catalog {
            if !catalog.contains(&theme) {
                return Err(ConfigurationError::UnknownTheme {
                    field: "theme_name",
                    theme,
                    known: catalog.theme_names().into_iter().map(String::from).collect(),
                });
            }
        }

        Ok(theme)
    }
}

/// Load with the default options: unknown keys rejected, default theme
/// `alabaster`, no theme catalog.
pub fn load(declaration: &Declaration) -> Result<BuildConfiguration, ConfigurationError> {
    ConfigLoader::default().load(declaration)
}

fn validate_extensions(extensions: &[String]) -> Result<Vec<String>, ConfigurationError> {
    let mut seen = HashSet::with_capacity(extensions.len());
    for (index, extension) in extensions.iter().enumerate() {
        if extension.trim().is_empty() {
            return Err(ConfigurationError::EmptyIdentifier {
                field: "enabled_extensions",
                index,
            });
        }
        check_padding("enabled_extensions", extension)?;
        if !seen.insert(extension.as_str()) {
            return Err(ConfigurationError::DuplicateExtension {
                field: "enabled_extensions",
                extension: extension.clone(),
            });
        }
    }
    Ok(extensions.to_vec())
}

/// Identifiers are compared verbatim and must not carry surrounding whitespace
fn check_padding(field: &'static str, identifier: &str) -> Result<(), ConfigurationError> {
    if identifier.trim() != identifier {
        return Err(ConfigurationError::PaddedIdentifier {
            field,
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}

fn validate_extension_options(
    options: Option<&IndexMap<String, Vec<String>>>,
    enabled: &[String],
) -> Result<IndexMap<String, IndexSet<String>>, ConfigurationError> {
    let Some(options) = options else {
        return Ok(IndexMap::new());
    };

    let mut resolved = IndexMap::with_capacity(options.len());
    for (extension, features) in options {
        if !enabled.iter().any(|e| e == extension) {
            return Err(ConfigurationError::DanglingExtensionOptions {
                field: "extension_options",
                extension: extension.clone(),
            });
        }

        let mut set = IndexSet::with_capacity(features.len());
        for (index, feature) in features.iter().enumerate() {
            if feature.trim().is_empty() {
                return Err(ConfigurationError::EmptyIdentifier {
                    field: "extension_options",
                    index,
                });
            }
            check_padding("extension_options", feature)?;
            set.insert(feature.clone());
        }
        resolved.insert(extension.clone(), set);
    }
    Ok(resolved)
}
