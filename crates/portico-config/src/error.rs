//! Errors raised while assembling a [`PorticoConfig`](crate::PorticoConfig).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why the configuration could not be loaded.
///
/// Every variant names what to fix: a path, an environment variable or
/// a dotted setting such as `session.lifetime_secs`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("no configuration file at {}", path.display())]
    NotFound {
        /// Where the file was expected.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or a setting the schema does not know.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a setting the schema does not know.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format '{format}'")]
    UnsupportedFormat {
        /// Extension or format name that was given.
        format: String,
    },

    /// A `.env` file could not be loaded.
    #[error("cannot load environment file {}: {reason}", path.display())]
    Dotenv {
        /// The file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override could not be applied.
    #[error("environment override {var}: {reason}")]
    EnvVar {
        /// Full variable name.
        var: String,
        /// What was expected instead.
        reason: String,
    },

    /// A setting loaded fine but its value cannot be used.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted setting name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub(crate) fn dotenv(path: &Path, source: &dotenvy::Error) -> Self {
        Self::Dotenv {
            path: path.to_path_buf(),
            reason: source.to_string(),
        }
    }

    pub(crate) fn env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// A value error for the dotted setting `field`.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The setting or environment variable at fault, when there is one.
    #[must_use]
    pub fn setting(&self) -> Option<&str> {
        match self {
            Self::EnvVar { var, .. } => Some(var),
            Self::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigLoader;
    use std::error::Error as _;
    use std::io::Write;

    #[test]
    fn test_missing_dotenv_file() {
        let err = ConfigLoader::new()
            .with_dotenv_file("/no/such/dir/.env")
            .unwrap_err();
        assert!(matches!(&err, ConfigError::Dotenv { path, .. } if path.ends_with(".env")));
        assert!(err
            .to_string()
            .starts_with("cannot load environment file /no/such/dir/.env: "));
        assert_eq!(err.setting(), None);
    }

    #[test]
    fn test_malformed_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PORTICO_TEST_DOTENV=\"unterminated").unwrap();

        let err = ConfigLoader::new().with_dotenv_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Dotenv { .. }));
    }

    #[test]
    fn test_unreadable_file_keeps_io_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portico.toml");
        std::fs::create_dir(&path).unwrap();

        let err = ConfigLoader::new().with_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigLoader::new().with_string("a: 1", "yaml").unwrap_err();
        assert_eq!(err.to_string(), "unsupported configuration format 'yaml'");
    }

    #[test]
    fn test_setting_names_the_culprit() {
        let err = ConfigError::env_var("PORTICO__SESSION__LIFETIME_SECS", "expected integer");
        assert_eq!(err.setting(), Some("PORTICO__SESSION__LIFETIME_SECS"));
        assert_eq!(
            err.to_string(),
            "environment override PORTICO__SESSION__LIFETIME_SECS: expected integer"
        );

        let mut config = crate::PorticoConfig::default();
        config.session.cookie_name = " ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.setting(), Some("session.cookie_name"));
        assert_eq!(err.to_string(), "session.cookie_name: must not be empty");
    }
}
