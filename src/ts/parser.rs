use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser wrapper for C/C++ sources.
///
/// The C++ grammar is a superset of what the translated backend sources use
/// (LLVM-style `.cpp`/`.h` plus generated `.inc` fragments), so one grammar
/// serves every file the engine sees.
pub struct CppParser {
    parser: Parser,
}

impl CppParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        let ts_lang = SupportLang::Cpp.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse a source buffer into a tree-sitter Tree.
    pub fn parse(&mut self, source: &[u8]) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse a buffer and keep it paired with its tree.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a [u8],
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed buffer with its tree-sitter tree.
///
/// Node spans in `tree` are byte offsets into `source` and nothing else.
pub struct ParsedSource<'a> {
    pub source: &'a [u8],
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Count ERROR/MISSING nodes, for diagnostics.
    pub fn error_count(&self) -> usize {
        count_error_nodes(self.tree.root_node())
    }

    /// Extract the bytes for a node's span.
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a [u8] {
        crate::text::get_text(self.source, node.start_byte(), node.end_byte())
    }
}

fn count_error_nodes(node: tree_sitter::Node<'_>) -> usize {
    let own = usize::from(node.is_error() || node.is_missing());
    if !node.has_error() {
        return own;
    }

    let mut cursor = node.walk();
    let children: usize = node
        .children(&mut cursor)
        .map(count_error_nodes)
        .sum();
    own + children
}
