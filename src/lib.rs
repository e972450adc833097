//! CPP Translator: structural rewriting of C/C++ backend sources
//!
//! Parses a source file with tree-sitter, finds the nodes a [`Patch`]'s query
//! matches, and replaces each matched byte span with the bytes the patch
//! computes for it. Used to carry LLVM-style disassembler and printer modules
//! over into Capstone's C layout, starting with their include lists.
//!
//! # Architecture
//!
//! - [`ts`] parses buffers and runs queries, yielding named [`Capture`]s.
//! - [`patch`] defines the [`Patch`] contract and the concrete patches.
//! - [`state`] holds the run's occurrence counters ([`PatchState`]).
//! - [`table`] and [`config`] provide the (profile, filename) include table.
//! - [`engine`] runs patches in priority order and splices results in via
//!   [`edit`].
//!
//! Every failure is a `Result`; nothing in the library exits the process.
//!
//! # Example
//!
//! ```no_run
//! use cpp_translator::{IncludeTable, IncludesPatch, PatchEngine, SourceFile};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = Arc::new(IncludeTable::builtin()?);
//! let engine = PatchEngine::new().with_patch(IncludesPatch::new(0, "ARM", table))?;
//!
//! let files = vec![SourceFile::new(
//!     "ARMBaseInfo.cpp",
//!     b"#include \"ARMBaseInfo.h\"\n#include \"llvm/ADT/StringRef.h\"\n".to_vec(),
//! )];
//! for translation in engine.run(&files)? {
//!     println!("{}", String::from_utf8_lossy(&translation.output));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod edit;
pub mod engine;
pub mod patch;
pub mod pool;
pub mod state;
pub mod table;
pub mod text;
pub mod ts;

// Re-exports
pub use config::{load_from_path, load_from_str, load_table, ConfigError, TableConfig};
pub use edit::{apply_splices, EditError, Splice, SpliceVerification};
pub use engine::{EngineError, PatchEngine, SourceFile, Translation};
pub use patch::{Capture, IncludesPatch, Patch, PatchContext, PatchError, SearchPattern};
pub use state::PatchState;
pub use table::{CoverageError, IncludeTable};
pub use ts::{CppParser, ParsedSource, QueryEngine, QueryMatch, TreeSitterError};
