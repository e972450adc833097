//! The patch contract.
//!
//! A [`Patch`] is one category of structural rewrite specialised for one
//! target profile. It declares a tree-sitter query through
//! [`SearchPattern`], names the capture its replacement is anchored on, and
//! turns each match into the bytes that replace that capture's span.
//!
//! Patches never own mutable state. Anything that depends on how often a
//! patch has already fired lives in the run's [`PatchState`], lent to each
//! invocation through [`PatchContext`].

pub mod errors;
pub mod includes;

pub use crate::ts::Capture;
pub use errors::PatchError;
pub use includes::IncludesPatch;

use crate::state::PatchState;
use crate::table::CoverageError;

/// A structural query plus the name of the capture a patch rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    pub query: String,
    pub main_capture: String,
}

impl SearchPattern {
    pub fn new(query: impl Into<String>, main_capture: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            main_capture: main_capture.into(),
        }
    }
}

/// Per-invocation view of the run: the file being rewritten and the shared
/// occurrence counters.
pub struct PatchContext<'a> {
    filename: &'a str,
    state: &'a mut PatchState,
}

impl<'a> PatchContext<'a> {
    pub fn new(filename: &'a str, state: &'a mut PatchState) -> Self {
        Self { filename, state }
    }

    /// The dispatch key for the current file (its final path component).
    pub fn filename(&self) -> &str {
        self.filename
    }

    /// Count one more occurrence of `kind` in this file and return the new total.
    pub fn advance(&mut self, kind: &'static str) -> usize {
        self.state.advance(kind, self.filename)
    }

    pub fn occurrences(&self, kind: &str) -> usize {
        self.state.count(kind, self.filename)
    }
}

/// A prioritized, structurally scoped rewrite rule.
pub trait Patch {
    /// Category name. Instances of one kind share occurrence counters.
    fn kind(&self) -> &'static str;

    /// Lower values run earlier. Equal priorities keep registration order.
    fn priority(&self) -> i32;

    /// Target variant this instance was built for, e.g. `ARM`.
    fn profile(&self) -> &str;

    /// The query and main capture name. Must not depend on file content.
    fn search_pattern(&self) -> SearchPattern;

    /// Bytes to substitute for the main capture of one match.
    ///
    /// `src` is the buffer the captures were matched against. Implementations
    /// may advance this file's counter through `ctx`; an input they have no
    /// rule for is an error, never an empty result.
    fn compute_replacement(
        &self,
        captures: &[Capture<'_>],
        src: &[u8],
        ctx: &mut PatchContext<'_>,
    ) -> Result<Vec<u8>, PatchError>;

    /// Whether a file whose matches anchor on `matched` (main-capture text,
    /// in document order) will consult this patch's rules. Any match at all,
    /// unless the patch knows better.
    fn needs_rule(&self, matched: &[&[u8]]) -> bool {
        !matched.is_empty()
    }

    /// Confirm a rule exists for every file of a batch before any of them
    /// is rewritten.
    fn check_coverage(&self, _filenames: &[&str]) -> Result<(), CoverageError> {
        Ok(())
    }
}

/// Find the capture a match is anchored on.
pub fn main_capture<'c, 'a>(
    captures: &'c [Capture<'a>],
    name: &str,
) -> Option<&'c Capture<'a>> {
    captures.iter().find(|c| c.name == name)
}
