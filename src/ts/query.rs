use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ParsedSource;
use ast_grep_language::{LanguageExt, SupportLang};
use std::ops::Range;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

/// A matched node paired with the name the query gave it.
///
/// Borrows both the tree (through `node`) and the compiled query (through
/// `name`), so it cannot outlive either.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    pub node: Node<'a>,
    pub name: &'a str,
}

impl<'a> Capture<'a> {
    pub fn byte_range(&self) -> Range<usize> {
        self.node.byte_range()
    }

    /// The captured bytes of `src`, which must be the buffer the tree was parsed from.
    pub fn text<'s>(&self, src: &'s [u8]) -> &'s [u8] {
        crate::text::get_text(src, self.node.start_byte(), self.node.end_byte())
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }
}

/// One query match: every capture the pattern bound for a single occurrence.
#[derive(Debug, Clone)]
pub struct QueryMatch<'a> {
    pub pattern_index: usize,
    pub captures: Vec<Capture<'a>>,
}

impl<'a> QueryMatch<'a> {
    /// First capture bound to `name`, if any.
    pub fn capture(&self, name: &str) -> Option<&Capture<'a>> {
        self.captures.iter().find(|c| c.name == name)
    }
}

/// Engine for executing a compiled tree-sitter query against parsed C/C++.
pub struct QueryEngine {
    query: Query,
}

impl QueryEngine {
    /// Compile a query in tree-sitter's S-expression syntax.
    ///
    /// ```text
    /// (preproc_include
    ///   path: (string_literal) @path) @include
    /// ```
    pub fn new(query_str: &str) -> Result<Self, TreeSitterError> {
        let language = SupportLang::Cpp.get_ts_language();
        let query = Query::new(&language, query_str).map_err(|e| TreeSitterError::InvalidQuery {
            message: e.to_string(),
        })?;

        Ok(Self { query })
    }

    /// Execute the query and return all matches in the order tree-sitter
    /// reports them.
    pub fn find_all<'a>(&'a self, parsed: &'a ParsedSource<'_>) -> Vec<QueryMatch<'a>> {
        let names = self.query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, parsed.root_node(), parsed.source);

        let mut results = Vec::new();

        // tree-sitter 0.25+ uses StreamingIterator
        while let Some(m) = matches.next() {
            let captures: Vec<Capture<'a>> = m
                .captures
                .iter()
                .map(|c| Capture {
                    node: c.node,
                    name: names[c.index as usize],
                })
                .collect();

            if !captures.is_empty() {
                results.push(QueryMatch {
                    pattern_index: m.pattern_index,
                    captures,
                });
            }
        }

        results
    }

    pub fn capture_names(&self) -> &[&str] {
        self.query.capture_names()
    }

    pub fn has_capture(&self, name: &str) -> bool {
        self.capture_names().iter().any(|n| *n == name)
    }
}
