//! Error type for declaration loading and validation

use std::path::PathBuf;
use thiserror::Error;

/// Every way a declaration can fail to become a [`BuildConfiguration`].
///
/// Each variant names the field it concerns so the build can abort with a
/// message pointing at the offending entry.
///
/// [`BuildConfiguration`]: crate::config::BuildConfiguration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("required field '{field}' is missing")]
    MissingField { field: &'static str },

    #[error("field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("extension '{extension}' is listed more than once in '{field}'")]
    DuplicateExtension {
        field: &'static str,
        extension: String,
    },

    #[error("'{field}' contains an empty identifier at position {index}")]
    EmptyIdentifier { field: &'static str, index: usize },

    #[error("'{field}' identifier '{identifier}' has leading or trailing whitespace")]
    PaddedIdentifier {
        field: &'static str,
        identifier: String,
    },

    #[error("'{field}' has options for extension '{extension}', which is not in 'enabled_extensions'")]
    DanglingExtensionOptions {
        field: &'static str,
        extension: String,
    },

    #[error("unknown top-level key(s): {}", .keys.join(", "))]
    UnknownKeys { keys: Vec<String> },

    #[error(
        "theme '{}' in '{}' is not available; known themes: {}",
        .theme,
        .field,
        .known.join(", ")
    )]
    UnknownTheme {
        field: &'static str,
        theme: String,
        known: Vec<String>,
    },

    #[error("failed to parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    /// Name of the declaration field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigurationError::MissingField { field }
            | ConfigurationError::EmptyField { field }
            | ConfigurationError::DuplicateExtension { field, .. }
            | ConfigurationError::EmptyIdentifier { field, .. }
            | ConfigurationError::PaddedIdentifier { field, .. }
            | ConfigurationError::DanglingExtensionOptions { field, .. }
            | ConfigurationError::UnknownTheme { field, .. } => Some(*field),
            ConfigurationError::UnknownKeys { keys } => keys.first().map(String::as_str),
            ConfigurationError::Parse { .. } | ConfigurationError::Io { .. } => None,
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        ConfigurationError::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_field() {
        let err = ConfigurationError::DanglingExtensionOptions {
            field: "extension_options",
            extension: "other_extension".to_string(),
        };
        assert_eq!(err.field(), Some("extension_options"));
        assert!(err.to_string().contains("other_extension"));
    }

    #[test]
    fn test_unknown_keys_message() {
        let err = ConfigurationError::UnknownKeys {
            keys: vec!["html_logo".to_string(), "language".to_string()],
        };
        assert_eq!(err.field(), Some("html_logo"));
        assert_eq!(
            err.to_string(),
            "unknown top-level key(s): html_logo, language"
        );
    }

    #[test]
    fn test_parse_error_has_no_field() {
        let err = ConfigurationError::parse("conf.toml", "expected `=`");
        assert!(err.field().is_none());
        assert!(err.to_string().contains("conf.toml"));
    }
}
