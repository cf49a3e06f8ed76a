//! Sphinx Ultra Configuration
//!
//! Loads a documentation build declaration (TOML, YAML, JSON or a Sphinx
//! `conf.py`), validates it, and exposes the result as an immutable
//! [`BuildConfiguration`] for the generator's build entry point.

pub mod conf_py;
pub mod config;
pub mod declaration;
pub mod error;
pub mod loader;
pub mod theme;

pub use config::{BuildConfiguration, DEFAULT_THEME};
pub use declaration::{Declaration, DeclarationFormat};
pub use error::ConfigurationError;
pub use loader::{load, ConfigLoader, LoaderOptions, UnknownKeyPolicy};
pub use theme::{ThemeCatalog, BUILTIN_THEMES};
