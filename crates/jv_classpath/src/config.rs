//! Resolver settings, loadable from a TOML table.

use crate::naming::{FUNCTION_CLASS_PREFIX, INVOKE_METHOD_NAME};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read resolver configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid resolver configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid resolver configuration: {0}")]
    Invalid(String),
}

/// Conventions shared by registry population and function resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverConfig {
    /// File name prefix marking a compiled top-level function.
    pub function_class_prefix: String,
    /// Name of the single method a function class declares.
    pub invoke_method_name: String,
    /// Archive extensions scanned for class entries (case-insensitive).
    pub archive_extensions: Vec<String>,
    /// Ignore `META-INF/` entries, including multi-release class variants.
    pub skip_meta_inf: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            function_class_prefix: FUNCTION_CLASS_PREFIX.to_string(),
            invoke_method_name: INVOKE_METHOD_NAME.to_string(),
            archive_extensions: vec!["jar".to_string(), "zip".to_string()],
            skip_meta_inf: true,
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn is_archive_extension(&self, extension: &str) -> bool {
        self.archive_extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.function_class_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "function-class-prefix must not be empty".into(),
            ));
        }
        if self.invoke_method_name.is_empty() {
            return Err(ConfigError::Invalid(
                "invoke-method-name must not be empty".into(),
            ));
        }
        Ok(())
    }
}
