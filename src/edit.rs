use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The substitution primitive: replace `[byte_start, byte_end)` of a buffer
/// with `replacement`, after checking the span still holds what the patch saw.
///
/// Every patch result compiles down to one splice on the working buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until applied with apply_splices()"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    pub replacement: Vec<u8>,
    pub expected_before: SpliceVerification,
}

/// What the span must contain for a splice to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceVerification {
    ExactMatch(Vec<u8>),
    /// xxh3 hash of expected bytes (for large spans)
    Hash(u64),
}

impl SpliceVerification {
    pub fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            SpliceVerification::ExactMatch(expected) => bytes == expected.as_slice(),
            SpliceVerification::Hash(expected_hash) => xxh3_64(bytes) == *expected_hash,
        }
    }

    /// Create verification from bytes, using a hash for spans over 1KB.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() > 1024 {
            SpliceVerification::Hash(xxh3_64(bytes))
        } else {
            SpliceVerification::ExactMatch(bytes.to_vec())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("span [{byte_start}, {byte_end}) no longer holds the matched text")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in buffer of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("splices overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlapping {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Splice {
    /// Create a splice that expects `expected_before` at the span.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        replacement: impl Into<Vec<u8>>,
        expected_before: &[u8],
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            replacement: replacement.into(),
            expected_before: SpliceVerification::from_bytes(expected_before),
        }
    }

    /// Net change in buffer length once applied.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - (self.byte_end - self.byte_start) as isize
    }

    fn validate(&self, content: &[u8]) -> Result<(), EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        let current = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: String::from_utf8_lossy(current).into_owned(),
            });
        }

        Ok(())
    }
}

/// Apply splices to `content` and return the rewritten buffer.
///
/// All splices are validated against the original buffer before any is
/// applied, then spliced bottom-to-top so earlier offsets stay valid.
/// Overlapping spans are rejected.
pub fn apply_splices(content: &[u8], mut splices: Vec<Splice>) -> Result<Vec<u8>, EditError> {
    if splices.is_empty() {
        return Ok(content.to_vec());
    }

    splices.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

    for splice in &splices {
        splice.validate(content)?;
    }

    // Sorted descending: for non-overlapping regions earlier.end <= later.start
    for window in splices.windows(2) {
        let (later, earlier) = (&window[0], &window[1]);
        if earlier.byte_end > later.byte_start {
            return Err(EditError::Overlapping {
                first_start: earlier.byte_start,
                first_end: earlier.byte_end,
                second_start: later.byte_start,
                second_end: later.byte_end,
            });
        }
    }

    let mut new_content = content.to_vec();
    for splice in splices {
        new_content.splice(splice.byte_start..splice.byte_end, splice.replacement);
    }

    Ok(new_content)
}

/// Write every `(name, content)` pair into `dir` as one batch.
///
/// Each file is written and synced into a staging directory inside `dir`
/// first, then renamed over its destination. A failed write leaves `dir`
/// untouched and the staging directory is removed. Only a failing rename,
/// after every file was staged, can leave `dir` partially updated.
pub fn commit_batch<'a>(
    dir: &Path,
    files: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<Vec<PathBuf>, EditError> {
    fs::create_dir_all(dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(dir)?;

    let mut staged = Vec::new();
    for (name, content) in files {
        let path = staging.path().join(name);
        let mut file = fs::File::create(&path)?;
        file.write_all(content)?;
        file.sync_all()?;
        staged.push((path, dir.join(name)));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (from, to) in staged {
        fs::rename(&from, &to)?;
        written.push(to);
    }

    Ok(written)
}
