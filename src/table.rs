//! The (profile, filename) -> include block dispatch table.
//!
//! Which target-format includes a translated file needs cannot be derived
//! from its content, so the answer is static data: one block per known
//! filename per profile. A built-in table for the ARM and PPC backends ships
//! with the crate; user tables loaded through [`crate::config`] are layered
//! on top of it.

use crate::config::{self, ConfigError};
use crate::patch::PatchError;
use std::collections::BTreeMap;
use std::fmt;

const BUILTIN_TABLE: &str = include_str!("../tables/includes.toml");

/// Minimum similarity for a "did you mean" filename suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTable {
    profiles: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl IncludeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        config::load_from_str(BUILTIN_TABLE).map(Self::from)
    }

    pub fn insert(
        &mut self,
        profile: impl Into<String>,
        filename: impl Into<String>,
        block: impl Into<Vec<u8>>,
    ) {
        self.profiles
            .entry(profile.into())
            .or_default()
            .insert(filename.into(), block.into());
    }

    /// Layer `other` on top of `self`. Entries in `other` replace entries
    /// with the same (profile, filename) key.
    pub fn merge(&mut self, other: IncludeTable) {
        for (profile, files) in other.profiles {
            self.profiles.entry(profile).or_default().extend(files);
        }
    }

    pub fn has_profile(&self, profile: &str) -> bool {
        self.profiles.contains_key(profile)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Filenames configured for `profile`, sorted.
    pub fn files(&self, profile: &str) -> Option<impl Iterator<Item = &str>> {
        self.profiles
            .get(profile)
            .map(|files| files.keys().map(String::as_str))
    }

    /// The include block for `filename` under `profile`.
    pub fn lookup(&self, profile: &str, filename: &str) -> Result<&[u8], PatchError> {
        let files = self
            .profiles
            .get(profile)
            .ok_or_else(|| self.unknown_profile(profile))?;

        files
            .get(filename)
            .map(Vec::as_slice)
            .ok_or_else(|| PatchError::UnknownFileForProfile {
                profile: profile.to_string(),
                filename: filename.to_string(),
                suggestion: closest(filename, files.keys()),
            })
    }

    /// Check that every filename has a block under `profile`.
    ///
    /// Reports all missing entries at once.
    pub fn ensure_covers<'a>(
        &self,
        profile: &str,
        filenames: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), CoverageError> {
        if !self.has_profile(profile) {
            return Err(CoverageError {
                errors: vec![self.unknown_profile(profile)],
            });
        }

        let errors: Vec<PatchError> = filenames
            .into_iter()
            .filter_map(|filename| self.lookup(profile, filename).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoverageError { errors })
        }
    }

    fn unknown_profile(&self, profile: &str) -> PatchError {
        PatchError::UnknownProfile {
            profile: profile.to_string(),
            known: self.profiles().map(str::to_string).collect(),
        }
    }
}

impl From<config::TableConfig> for IncludeTable {
    fn from(config: config::TableConfig) -> Self {
        let mut table = IncludeTable::new();
        for (profile, files) in config.profiles {
            for (filename, entry) in files {
                table.insert(profile.clone(), filename, entry.text.into_bytes());
            }
        }
        table
    }
}

fn closest<'a>(filename: &str, candidates: impl Iterator<Item = &'a String>) -> Option<String> {
    candidates
        .map(|c| (strsim::normalized_damerau_levenshtein(filename, c), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.clone())
}

/// Every lookup that failed during a coverage check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageError {
    pub errors: Vec<PatchError>,
}

impl fmt::Display for CoverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include table is incomplete: ")?;
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CoverageError {}
