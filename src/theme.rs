//! Catalog of themes available to the documentation generator
//!
//! The loader only consults the catalog when strict theme validation is
//! requested. Building the catalog from disk is a separate step done by the
//! caller before loading, so `load` itself never touches the filesystem.

use indexmap::IndexSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// Themes bundled with the generator
pub const BUILTIN_THEMES: &[&str] = &[
    "alabaster",
    "basic",
    "classic",
    "sphinxdoc",
    "scrolls",
    "agogo",
    "traditional",
    "nature",
    "haiku",
    "pyramid",
    "bizstyle",
];

/// Raw theme.toml structure for deserialization
#[derive(Debug, Clone, Deserialize)]
struct ThemeToml {
    theme: ThemeTomlMeta,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeTomlMeta {
    name: String,
}

/// Set of theme names the generator can resolve
#[derive(Debug, Clone, Default)]
pub struct ThemeCatalog {
    /// Known theme names in registration order
    themes: IndexSet<String>,
    /// Directories to search for themes
    search_paths: Vec<PathBuf>,
}

impl ThemeCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the bundled themes
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for name in BUILTIN_THEMES {
            catalog.register(*name);
        }
        catalog
    }

    /// Register a theme by name, e.g. one installed as a Python package
    pub fn register(&mut self, name: impl Into<String>) {
        self.themes.insert(name.into());
    }

    /// Add a search path for theme discovery
    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    /// Register every theme found in the search paths.
    ///
    /// Each subdirectory holding a `theme.toml` with a `[theme] name` entry is a
    /// theme. Unreadable theme files are logged and skipped. Returns the number
    /// of themes found.
    pub fn discover(&mut self) -> usize {
        let mut found = 0;
        for search_path in self.search_paths.clone() {
            let Ok(entries) = std::fs::read_dir(&search_path) else {
                log::debug!("Theme search path {} is not readable", search_path.display());
                continue;
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() || !path.join("theme.toml").exists() {
                    continue;
                }
                match Self::read_theme_name(&path) {
                    Ok(name) => {
                        log::debug!("Discovered theme: {} at {}", name, path.display());
                        self.register(name);
                        found += 1;
                    }
                    Err(e) => {
                        log::warn!("Failed to load theme from {}: {}", path.display(), e);
                    }
                }
            }
        }
        found
    }

    fn read_theme_name(theme_dir: &Path) -> Result<String, ConfigurationError> {
        let theme_toml_path = theme_dir.join("theme.toml");
        let content =
            std::fs::read_to_string(&theme_toml_path).map_err(|source| ConfigurationError::Io {
                path: theme_toml_path.clone(),
                source,
            })?;
        let toml: ThemeToml = toml::from_str(&content)
            .map_err(|e| ConfigurationError::parse(theme_toml_path.display().to_string(), e))?;
        Ok(toml.theme.name)
    }

    /// Check if a theme exists
    pub fn contains(&self, name: &str) -> bool {
        self.themes.contains(name)
    }

    /// Get all known theme names
    pub fn theme_names(&self) -> Vec<&str> {
        self.themes.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_theme(dir: &Path, dir_name: &str, theme_name: &str) {
        let theme_dir = dir.join(dir_name);
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::write(
            theme_dir.join("theme.toml"),
            format!(
                r#"
[theme]
name = "{}"
inherit = "basic"
version = "1.0.0"
"#,
                theme_name
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = ThemeCatalog::builtin();
        assert!(catalog.contains("alabaster"));
        assert!(catalog.contains("classic"));
        assert!(!catalog.contains("sphinx_rtd_theme"));
        assert_eq!(catalog.len(), BUILTIN_THEMES.len());
    }

    #[test]
    fn test_register() {
        let mut catalog = ThemeCatalog::new();
        assert!(catalog.is_empty());
        catalog.register("sphinx_rtd_theme");
        catalog.register("sphinx_rtd_theme");
        assert_eq!(catalog.theme_names(), vec!["sphinx_rtd_theme"]);
    }

    #[test]
    fn test_discover_themes() {
        let temp_dir = TempDir::new().unwrap();
        create_test_theme(temp_dir.path(), "rtd", "sphinx_rtd_theme");
        create_test_theme(temp_dir.path(), "furo", "furo");

        // Directories without theme.toml are ignored
        std::fs::create_dir_all(temp_dir.path().join("not-a-theme")).unwrap();

        // Broken theme.toml is skipped
        let broken = temp_dir.path().join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("theme.toml"), "[theme]\n").unwrap();

        let mut catalog = ThemeCatalog::new();
        catalog.add_search_path(temp_dir.path().to_path_buf());
        catalog.add_search_path(temp_dir.path().to_path_buf());
        catalog.add_search_path(temp_dir.path().join("missing"));

        assert_eq!(catalog.discover(), 2);
        assert!(catalog.contains("sphinx_rtd_theme"));
        assert!(catalog.contains("furo"));
        assert_eq!(catalog.len(), 2);
    }
}
