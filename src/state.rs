//! Run-scoped occurrence counters.
//!
//! Some patches behave differently on the first match in a file than on later
//! ones. [`PatchState`] records how often a patch kind has fired for each
//! filename. One instance is owned by an engine run and lent to every patch
//! invocation through [`PatchContext`](crate::patch::PatchContext).
//!
//! Counters are keyed by (patch kind, filename): every instance of the same
//! kind shares one counter per file, whatever profile it was built for, while
//! different kinds never see each other's counts.

use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchState {
    counters: BTreeMap<&'static str, BTreeMap<String, usize>>,
}

impl PatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more occurrence and return the updated count.
    ///
    /// The first call for a (kind, filename) pair returns 1.
    pub fn advance(&mut self, kind: &'static str, filename: &str) -> usize {
        let files = self.counters.entry(kind).or_default();
        if let Some(count) = files.get_mut(filename) {
            *count += 1;
            return *count;
        }
        files.insert(filename.to_string(), 1);
        1
    }

    /// Occurrences seen so far; 0 if the pair was never observed.
    pub fn count(&self, kind: &str, filename: &str) -> usize {
        self.counters
            .get(kind)
            .and_then(|files| files.get(filename))
            .copied()
            .unwrap_or(0)
    }

    /// Drop every counter. Called at the start of a fresh run.
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// All (kind, filename, count) triples in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str, usize)> + '_ {
        self.counters.iter().flat_map(|(kind, files)| {
            files
                .iter()
                .map(move |(file, count)| (*kind, file.as_str(), *count))
        })
    }
}
