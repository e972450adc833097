//! Include rewriting: LLVM-style include lists to Capstone include lists.
//!
//! The first `#include` of a file is replaced with the complete include block
//! the translated file needs. Every later include is deleted, since the first
//! block already covers it. References to TableGen'd `.inc` files are the
//! exception: they are renamed in place with the profile prefix wherever they
//! appear.

use crate::patch::{main_capture, Capture, Patch, PatchContext, PatchError, SearchPattern};
use crate::table::{CoverageError, IncludeTable};
use crate::text;
use std::sync::Arc;
use tracing::debug;

const KIND: &str = "includes";
const MAIN_CAPTURE: &str = "preproc_include";

/// Generic C library includes every translated file starts with.
pub const PREAMBLE: &[u8] = b"#include <stdio.h>\n\
#include <string.h>\n\
#include <stdlib.h>\n\
#include <capstone/platform.h>\n\n";

/// Macro helpers appended after the file-specific block.
pub const TRAILER: &[u8] = b"#define CONCAT(a, b) CONCAT_(a, b)\n\
#define CONCAT_(a, b) a ## _ ## b\n";

/// Generated files whose includes are renamed instead of folded into the
/// first block. Checked in order; the first marker found wins.
pub const MARKERS: &[&str] = &["GenDisassemblerTables.inc", "GenAsmWriter.inc"];

fn find_marker(include_text: &[u8]) -> Option<&'static str> {
    MARKERS
        .iter()
        .copied()
        .find(|m| text::contains(include_text, m.as_bytes()))
}

pub struct IncludesPatch {
    priority: i32,
    profile: String,
    table: Arc<IncludeTable>,
}

impl IncludesPatch {
    pub fn new(priority: i32, profile: impl Into<String>, table: Arc<IncludeTable>) -> Self {
        Self {
            priority,
            profile: profile.into(),
            table,
        }
    }

    /// `#include "<profile><marker>"` for the first marker in `include_text`.
    fn marker_override(&self, include_text: &[u8]) -> Option<Vec<u8>> {
        let marker = find_marker(include_text)?;
        Some(format!("#include \"{}{}\"\n\n", self.profile, marker).into_bytes())
    }

    /// Full block for the first include of `filename`.
    fn first_block(&self, filename: &str) -> Result<Vec<u8>, PatchError> {
        let specific = self.table.lookup(&self.profile, filename)?;

        let mut block = Vec::with_capacity(PREAMBLE.len() + specific.len() + TRAILER.len());
        block.extend_from_slice(PREAMBLE);
        block.extend_from_slice(specific);
        block.extend_from_slice(TRAILER);
        Ok(block)
    }
}

impl Patch for IncludesPatch {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn profile(&self) -> &str {
        &self.profile
    }

    fn search_pattern(&self) -> SearchPattern {
        SearchPattern::new(format!("({MAIN_CAPTURE}) @{MAIN_CAPTURE}"), MAIN_CAPTURE)
    }

    fn compute_replacement(
        &self,
        captures: &[Capture<'_>],
        src: &[u8],
        ctx: &mut PatchContext<'_>,
    ) -> Result<Vec<u8>, PatchError> {
        let occurrence = ctx.advance(KIND);

        let include = main_capture(captures, MAIN_CAPTURE).ok_or_else(|| {
            PatchError::MalformedMatch {
                patch: KIND,
                capture: MAIN_CAPTURE.to_string(),
                filename: ctx.filename().to_string(),
            }
        })?;
        let include_text = include.text(src);

        if let Some(renamed) = self.marker_override(include_text) {
            debug!(
                filename = ctx.filename(),
                occurrence, "renaming generated include"
            );
            return Ok(renamed);
        }

        if occurrence > 1 {
            return Ok(Vec::new());
        }

        debug!(
            filename = ctx.filename(),
            profile = %self.profile,
            "expanding first include into full block"
        );
        self.first_block(ctx.filename())
    }

    /// Only a plain include can be the one that pulls in the table block;
    /// generated-file includes are renamed without a lookup.
    fn needs_rule(&self, matched: &[&[u8]]) -> bool {
        matched.iter().any(|include| find_marker(include).is_none())
    }

    fn check_coverage(&self, filenames: &[&str]) -> Result<(), CoverageError> {
        self.table
            .ensure_covers(&self.profile, filenames.iter().copied())
    }
}
