use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// An include table as written in TOML.
///
/// `profiles` maps a profile name to its files, and each filename to the
/// block that replaces the file's first include.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TableConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub profiles: BTreeMap<String, BTreeMap<String, FileEntry>>,
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.profiles.is_empty() {
            issues.push(ValidationIssue::EmptyTable);
        }

        for (profile, files) in &self.profiles {
            if profile.trim().is_empty() {
                issues.push(ValidationIssue::EmptyProfileName);
            }
            if files.is_empty() {
                issues.push(ValidationIssue::EmptyProfile {
                    profile: profile.clone(),
                });
            }

            for (filename, entry) in files {
                if filename.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyFilename {
                        profile: profile.clone(),
                    });
                } else if filename.contains(['/', '\\']) {
                    issues.push(ValidationIssue::FilenameIsPath {
                        profile: profile.clone(),
                        filename: filename.clone(),
                    });
                }

                if entry.text.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyBlock {
                        profile: profile.clone(),
                        filename: filename.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileEntry {
    /// Inserted verbatim, including trailing blank lines.
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyTable,
    EmptyProfileName,
    EmptyProfile { profile: String },
    EmptyFilename { profile: String },
    FilenameIsPath { profile: String, filename: String },
    EmptyBlock { profile: String, filename: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyTable => write!(f, "include table defines no profiles"),
            ValidationIssue::EmptyProfileName => write!(f, "profile name must not be empty"),
            ValidationIssue::EmptyProfile { profile } => {
                write!(f, "profile '{profile}' defines no files")
            }
            ValidationIssue::EmptyFilename { profile } => {
                write!(f, "profile '{profile}' has an entry with an empty filename")
            }
            ValidationIssue::FilenameIsPath { profile, filename } => write!(
                f,
                "profile '{profile}': '{filename}' must be a bare filename, not a path"
            ),
            ValidationIssue::EmptyBlock { profile, filename } => {
                write!(f, "profile '{profile}': include block for '{filename}' is empty")
            }
        }
    }
}
