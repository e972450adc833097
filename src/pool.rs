//! Thread-local parser pooling.
//!
//! The engine re-parses the working buffer before every patch pass, so the
//! parser is created once per thread and reused for every parse after that.

use crate::ts::{CppParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static CPP_PARSER: RefCell<Option<CppParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use cpp_translator::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse(b"#include <stdio.h>\n"))??;
/// assert_eq!(tree.root_node().kind(), "translation_unit");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut CppParser) -> R,
{
    CPP_PARSER.with(|cell| {
        let mut opt = cell.borrow_mut();
        let parser = match opt.take() {
            Some(parser) => parser,
            None => CppParser::new()?,
        };
        Ok(f(opt.insert(parser)))
    })
}
