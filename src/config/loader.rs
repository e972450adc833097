use crate::config::schema::{TableConfig, ValidationError};
use crate::table::IncludeTable;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read include table from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => {
                // toml_edit renders a multi-line snippet; keep the diagnostic on one line.
                let message = source.message();
                match path {
                    Some(path) => write!(
                        f,
                        "failed to parse include table TOML ({}): {}",
                        path.display(),
                        message
                    ),
                    None => write!(f, "failed to parse include table TOML: {}", message),
                }
            }
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid include table ({}): {}", path.display(), source),
                None => write!(f, "invalid include table: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<TableConfig, ConfigError> {
    let config: TableConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<TableConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// The built-in table, with the table at `overlay` (if any) layered on top.
pub fn load_table(overlay: Option<&Path>) -> Result<IncludeTable, ConfigError> {
    let mut table = IncludeTable::builtin()?;
    if let Some(path) = overlay {
        table.merge(IncludeTable::from(load_from_path(path)?));
    }
    Ok(table)
}
