//! Patch engine: drives registered patches over source buffers.
//!
//! For each file, patches run one at a time in priority order. Each pass
//! re-parses the current buffer, collects every match of the patch's query,
//! asks the patch for a replacement per match in document order, and splices
//! the results in. The next pass sees the rewritten buffer and fresh offsets.
//!
//! A run owns one [`PatchState`]. Any error aborts the whole run and no
//! translation is returned, so callers never see a partially rewritten batch.

use crate::cache;
use crate::edit::{self, EditError, Splice};
use crate::patch::{Patch, PatchContext, PatchError, SearchPattern};
use crate::pool;
use crate::state::PatchState;
use crate::table::CoverageError;
use crate::ts::{ParsedSource, QueryEngine, TreeSitterError};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{filename}: {source}")]
    Patch {
        filename: String,
        #[source]
        source: PatchError,
    },

    #[error("{filename}: {source}")]
    Edit {
        filename: String,
        #[source]
        source: EditError,
    },

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error("patch '{patch}' has an invalid search pattern: {source}")]
    InvalidPattern {
        patch: &'static str,
        #[source]
        source: TreeSitterError,
    },

    #[error("search pattern of patch '{patch}' has no capture named '@{capture}'")]
    MissingMainCapture { patch: &'static str, capture: String },

    #[error("{filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: TreeSitterError,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no file name to dispatch on", .path.display())]
    NoFileName { path: PathBuf },
}

/// One input of a run. `name` is the dispatch key patches see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, keyed by its final path component.
    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EngineError::NoFileName {
                path: path.to_path_buf(),
            })?;
        let contents = fs::read(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(name, contents))
    }
}

/// A rewritten file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub name: String,
    pub output: Vec<u8>,
    /// Number of matches replaced across all patches.
    pub replacements: usize,
}

impl Translation {
    /// xxh3 digest of the output, for comparing runs.
    pub fn digest(&self) -> u64 {
        xxh3_64(&self.output)
    }
}

#[derive(Default)]
pub struct PatchEngine {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patch, keeping the list ordered by priority.
    ///
    /// The patch's query is compiled here so a bad pattern fails at setup,
    /// not halfway through a run.
    pub fn register(&mut self, patch: Box<dyn Patch>) -> Result<(), EngineError> {
        let pattern = patch.search_pattern();
        let query = compile(patch.as_ref(), &pattern)?;
        if !query.has_capture(&pattern.main_capture) {
            return Err(EngineError::MissingMainCapture {
                patch: patch.kind(),
                capture: pattern.main_capture,
            });
        }

        debug!(
            patch = patch.kind(),
            profile = patch.profile(),
            priority = patch.priority(),
            "registered patch"
        );
        self.patches.push(patch);
        // Stable: equal priorities keep registration order.
        self.patches.sort_by_key(|p| p.priority());
        Ok(())
    }

    pub fn with_patch(mut self, patch: impl Patch + 'static) -> Result<Self, EngineError> {
        self.register(Box::new(patch))?;
        Ok(self)
    }

    pub fn patches(&self) -> &[Box<dyn Patch>] {
        &self.patches
    }

    /// Check that every patch has a rule for every file of the batch that
    /// will consult one.
    ///
    /// Files are matched as read. A file is only checked against a patch when
    /// [`Patch::needs_rule`] says its matches will reach the patch's
    /// configuration, so headers without includes and generated fragments
    /// pass through.
    pub fn preflight(&self, files: &[SourceFile]) -> Result<(), EngineError> {
        for patch in &self.patches {
            let pattern = patch.search_pattern();
            let query = compile(patch.as_ref(), &pattern)?;

            let mut needed = Vec::with_capacity(files.len());
            for file in files {
                let parsed = parse(&file.name, &file.contents)?;
                let matches = query.find_all(&parsed);
                let matched: Vec<&[u8]> = matches
                    .iter()
                    .filter_map(|m| m.capture(&pattern.main_capture))
                    .map(|c| c.text(&file.contents))
                    .collect();

                if patch.needs_rule(&matched) {
                    needed.push(file.name.as_str());
                } else {
                    debug!(
                        patch = patch.kind(),
                        filename = %file.name,
                        matches = matched.len(),
                        "no rule needed"
                    );
                }
            }

            patch.check_coverage(&needed)?;
        }
        Ok(())
    }

    /// Translate a batch with fresh occurrence counters.
    pub fn run(&self, files: &[SourceFile]) -> Result<Vec<Translation>, EngineError> {
        let mut state = PatchState::new();
        self.run_with_state(files, &mut state)
    }

    /// Translate a batch, sharing `state` across every file and patch.
    pub fn run_with_state(
        &self,
        files: &[SourceFile],
        state: &mut PatchState,
    ) -> Result<Vec<Translation>, EngineError> {
        let translations = files
            .iter()
            .map(|file| self.translate(&file.name, &file.contents, state))
            .collect::<Result<Vec<_>, _>>()?;

        for (kind, filename, count) in state.iter() {
            debug!(kind, filename, count, "occurrences");
        }
        Ok(translations)
    }

    /// Apply every patch, in priority order, to one buffer.
    pub fn translate(
        &self,
        filename: &str,
        source: &[u8],
        state: &mut PatchState,
    ) -> Result<Translation, EngineError> {
        let mut buffer = source.to_vec();
        let mut replacements = 0;

        for (pass, patch) in self.patches.iter().enumerate() {
            let (rewritten, count) =
                self.apply_patch(patch.as_ref(), filename, &buffer, state, pass == 0)?;
            buffer = rewritten;
            replacements += count;
        }

        info!(filename, replacements, bytes = buffer.len(), "translated");
        Ok(Translation {
            name: filename.to_string(),
            output: buffer,
            replacements,
        })
    }

    fn apply_patch(
        &self,
        patch: &dyn Patch,
        filename: &str,
        buffer: &[u8],
        state: &mut PatchState,
        first_pass: bool,
    ) -> Result<(Vec<u8>, usize), EngineError> {
        let pattern = patch.search_pattern();
        let query = compile(patch, &pattern)?;

        let parsed = parse(filename, buffer)?;
        if first_pass && parsed.has_errors() {
            warn!(
                filename,
                errors = parsed.error_count(),
                "source has syntax errors; matching what parsed"
            );
        }

        let matches = query.find_all(&parsed);

        let mut anchored = Vec::with_capacity(matches.len());
        for m in &matches {
            let main = m.capture(&pattern.main_capture).ok_or_else(|| EngineError::Patch {
                filename: filename.to_string(),
                source: PatchError::MalformedMatch {
                    patch: patch.kind(),
                    capture: pattern.main_capture.clone(),
                    filename: filename.to_string(),
                },
            })?;
            anchored.push((main.byte_range(), m));
        }
        // Document order decides which match is the first occurrence.
        anchored.sort_by_key(|(range, _)| (range.start, range.end));
        // A node matched by several patterns of one query is one occurrence.
        anchored.dedup_by(|a, b| a.0 == b.0);

        let mut splices = Vec::with_capacity(anchored.len());
        for (range, m) in anchored {
            let mut ctx = PatchContext::new(filename, state);
            let replacement = patch
                .compute_replacement(&m.captures, buffer, &mut ctx)
                .map_err(|source| EngineError::Patch {
                    filename: filename.to_string(),
                    source,
                })?;

            debug!(
                patch = patch.kind(),
                filename,
                pattern = m.pattern_index,
                occurrence = ctx.occurrences(patch.kind()),
                start = range.start,
                end = range.end,
                replacement_len = replacement.len(),
                "computed replacement"
            );
            let before = &buffer[range.clone()];
            splices.push(Splice::new(range.start, range.end, replacement, before));
        }

        let count = splices.len();
        let delta: isize = splices.iter().map(Splice::delta).sum();
        debug!(patch = patch.kind(), filename, count, delta, "applying splices");
        let rewritten = edit::apply_splices(buffer, splices).map_err(|source| EngineError::Edit {
            filename: filename.to_string(),
            source,
        })?;
        Ok((rewritten, count))
    }
}

fn compile(patch: &dyn Patch, pattern: &SearchPattern) -> Result<Rc<QueryEngine>, EngineError> {
    cache::get_or_compile_query(&pattern.query).map_err(|source| EngineError::InvalidPattern {
        patch: patch.kind(),
        source,
    })
}

fn parse<'s>(filename: &str, source: &'s [u8]) -> Result<ParsedSource<'s>, EngineError> {
    let tree = pool::with_parser(|parser| parser.parse(source))
        .and_then(|parsed| parsed)
        .map_err(|source| EngineError::Parse {
            filename: filename.to_string(),
            source,
        })?;
    Ok(ParsedSource { source, tree })
}
