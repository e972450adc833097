//! Tree-sitter integration for structural C/C++ queries.
//!
//! Patches describe what they look for as tree-sitter queries. This module
//! parses source buffers with the C++ grammar and turns query matches into
//! named captures with byte spans into the exact buffer that was parsed.

pub mod errors;
pub mod parser;
pub mod query;

pub use errors::TreeSitterError;
pub use parser::{CppParser, ParsedSource};
pub use query::{Capture, QueryEngine, QueryMatch};
