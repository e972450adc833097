//! Byte-span helpers shared by patches and the engine.

/// Return `src[start..end]`, clamped to the buffer.
///
/// Node spans handed out by tree-sitter always lie inside the buffer they were
/// parsed from, so clamping only matters for spans carried across a rewrite.
pub fn get_text(src: &[u8], start: usize, end: usize) -> &[u8] {
    let end = end.min(src.len());
    let start = start.min(end);
    &src[start..end]
}

/// True if `needle` occurs anywhere in `haystack`.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
